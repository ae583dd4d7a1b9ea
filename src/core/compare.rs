//! Watch history vs. home feed.
//!
//! The watch history reflects what the user picked; the home feed reflects
//! what the platform pushed. Scoring them separately shows where an
//! imbalance comes from.

use serde::{Deserialize, Serialize};

use crate::core::aggregate::{StanceBreakdown, aggregate_videos};
use crate::core::entropy::entropy_score;
use crate::core::video::{ClassifiedVideo, SourcePhase};

/// Metrics for one subset of videos.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceSlice {
    /// Number of videos in the subset
    pub count: usize,
    pub entropy_score: u8,
    pub breakdown: StanceBreakdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceComparison {
    pub watch_history: SourceSlice,
    pub home_feed: SourceSlice,
}

impl SourceComparison {
    /// Entropy gap, positive when the user's own picks are more diverse
    /// than what the feed serves.
    pub fn entropy_gap(&self) -> i16 {
        self.watch_history.entropy_score as i16 - self.home_feed.entropy_score as i16
    }
}

/// Score the watch-history and home-feed subsets independently. Videos from
/// any other phase are ignored here.
pub fn compare_sources(videos: &[ClassifiedVideo]) -> SourceComparison {
    SourceComparison {
        watch_history: slice(videos, SourcePhase::WatchHistory),
        home_feed: slice(videos, SourcePhase::HomeFeed),
    }
}

fn slice(videos: &[ClassifiedVideo], phase: SourcePhase) -> SourceSlice {
    let subset: Vec<&ClassifiedVideo> = videos.iter().filter(|v| v.source_phase == phase).collect();
    let breakdown = aggregate_videos(subset.iter().copied());
    SourceSlice { count: subset.len(), entropy_score: entropy_score(&breakdown), breakdown }
}
