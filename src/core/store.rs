//! Persistence seam for classified videos, analyses and recommendations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::analysis::AnalysisResult;
use crate::core::select::Recommendation;
use crate::core::video::ClassifiedVideo;

/// A recommendation once it has been handed an id by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecommendation
{
    pub id: u64,
    #[serde(flatten)]
    pub recommendation: Recommendation,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError
{
    #[error("I/O error on {path}: {source}")]
    Io
    {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt record in {path} at line {line}: {source}")]
    Corrupt
    {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("no recommendation with id {0}")]
    UnknownRecommendation(u64),
}

impl StoreError
{
    pub fn io(
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self
    {
        StoreError::Io { path: path.into(), source }
    }
}

/// Where analysis inputs and outputs live between runs.
///
/// Classified videos are never edited in place: storing a video again under
/// the same `(video_id, source_phase)` supersedes the earlier entry.
pub trait AnalysisStore
{
    /// Latest classification per `(video_id, source_phase)`, first-seen order.
    fn load_active_classified_videos(&self) -> Result<Vec<ClassifiedVideo>, StoreError>;

    fn store_classified_videos(
        &self,
        videos: &[ClassifiedVideo],
    ) -> Result<(), StoreError>;

    fn store_analysis_result(
        &self,
        result: &AnalysisResult,
    ) -> Result<(), StoreError>;

    /// Assign fresh ids and persist. Returns the stored rows in input order.
    fn store_recommendations(
        &self,
        recommendations: &[Recommendation],
    ) -> Result<Vec<StoredRecommendation>, StoreError>;

    fn mark_recommendation_watched(
        &self,
        id: u64,
    ) -> Result<StoredRecommendation, StoreError>;

    /// Every stored result, oldest first.
    fn load_analysis_history(&self) -> Result<Vec<AnalysisResult>, StoreError>;

    fn load_recommendations(&self) -> Result<Vec<StoredRecommendation>, StoreError>;
}
