//! Collected and classified video records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::stance::StanceDistribution;

/// Where a video was collected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourcePhase
{
    WatchHistory,
    HomeFeed,
    Search,
    Recommended,
    Subscriptions,
    /// Missing or unrecognised tag
    #[default]
    #[serde(other)]
    Unknown,
}

impl SourcePhase
{
    pub fn as_str(self) -> &'static str
    {
        match self
        {
            SourcePhase::WatchHistory => "watch_history",
            SourcePhase::HomeFeed => "home_feed",
            SourcePhase::Search => "search",
            SourcePhase::Recommended => "recommended",
            SourcePhase::Subscriptions => "subscriptions",
            SourcePhase::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for SourcePhase
{
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result
    {
        f.write_str(self.as_str())
    }
}

/// A scraped video as handed to ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord
{
    #[serde(alias = "videoId")]
    pub video_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "channelId")]
    pub channel_id: Option<String>,
    #[serde(default, alias = "channelName")]
    pub channel_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "sourcePhase")]
    pub source_phase: SourcePhase,
}

/// A channel the user is subscribed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord
{
    #[serde(alias = "channelId")]
    pub channel_id: String,
    #[serde(default, alias = "channelName")]
    pub channel_name: Option<String>,
}

/// A video with its validated stance. Superseded, never edited, on
/// re-classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedVideo
{
    pub video_id: String,
    pub title: String,
    #[serde(default)]
    pub channel_id: Option<String>,
    pub stance: StanceDistribution,
    pub source_phase: SourcePhase,
    pub significance_weight: u8,
    #[serde(default)]
    pub from_subscribed_channel: bool,
    pub classified_at: DateTime<Utc>,
}
