//! Stance classifier seam.
//!
//! The real classifier is an external AI service; the engine only sees this
//! trait. Answers come back unvalidated ([`RawStance`]) and are checked at
//! ingestion.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::stance::RawStance;
use crate::core::video::VideoRecord;

/// What a classifier gets to look at for one video.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationRequest
{
    pub video: VideoRecord,
    /// The video's channel is one of the user's subscriptions
    pub subscribed: bool,
}

/// Why one video could not be classified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ClassificationFailure
{
    #[error("classifier error: {0}")]
    Adapter(String),

    #[error("classifier did not answer within {timeout_ms}ms")]
    Timeout
    {
        timeout_ms: u64,
    },

    #[error("classifier call aborted")]
    Panicked,
}

/// External stance classifier. Implementations may be slow and may fail;
/// ingestion bounds, retries and times out every call.
pub trait StanceClassifier: Send + Sync
{
    fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<RawStance, ClassificationFailure>;

    /// Identifier for logs
    fn name(&self) -> &'static str
    {
        "classifier"
    }
}

/// Classifier answering from stances produced earlier by the external
/// service, keyed by video id.
#[derive(Debug, Clone, Default)]
pub struct PrecomputedClassifier
{
    stances: HashMap<String, RawStance>,
}

impl PrecomputedClassifier
{
    pub fn new(stances: HashMap<String, RawStance>) -> Self
    {
        Self { stances }
    }

    /// Parse a JSON object of `video_id -> {progressive, conservative, centrist, non_political}`.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self>
    {
        Ok(Self::new(serde_json::from_str(s)?))
    }

    pub fn len(&self) -> usize
    {
        self.stances
            .len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.stances
            .is_empty()
    }
}

impl StanceClassifier for PrecomputedClassifier
{
    fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<RawStance, ClassificationFailure>
    {
        self.stances
            .get(&request.video.video_id)
            .copied()
            .ok_or_else(|| {
                ClassificationFailure::Adapter(format!(
                    "no stance for video {}",
                    request.video.video_id
                ))
            })
    }

    fn name(&self) -> &'static str
    {
        "precomputed"
    }
}
