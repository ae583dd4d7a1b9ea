//! Analysis assembly: the single entry point of the engine.
//!
//! Everything here is pure. The caller supplies the clock reading, so the same
//! input always yields an identical [`AnalysisResult`].

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::core::aggregate::{StanceBreakdown, aggregate_videos};
use crate::core::compare::{SourceComparison, compare_sources};
use crate::core::entropy::entropy_score;
use crate::core::leaning::leaning_score;
use crate::core::select::{Recommendation, Selector};
use crate::core::video::{ClassifiedVideo, SourcePhase};

/// How complete the ingestion batch behind an analysis was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchStatus {
    /// Ingestion was cancelled or stopped before every video was tried
    pub partial: bool,
    /// Videos rejected for a malformed stance distribution
    pub skipped: usize,
    /// Videos whose classification failed
    pub failed: usize,
}

/// Immutable snapshot of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Leaning, 0 conservative .. 50 balanced .. 100 progressive
    pub bias_score: u8,
    /// Viewpoint diversity, 0..=100
    pub entropy_score: u8,
    pub breakdown: StanceBreakdown,
    pub source_comparison: SourceComparison,
    pub political_video_count: usize,
    pub video_count: usize,
    #[serde(default)]
    pub batch: BatchStatus,
    pub generated_at: DateTime<Utc>,
}

/// Everything one analysis needs.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisInput<'a> {
    pub videos: &'a [ClassifiedVideo],
    pub candidates: &'a [ClassifiedVideo],
    pub limit: usize,
    pub batch: BatchStatus,
    pub generated_at: DateTime<Utc>,
}

impl<'a> AnalysisInput<'a> {
    pub fn new(
        videos: &'a [ClassifiedVideo],
        candidates: &'a [ClassifiedVideo],
        limit: usize,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self { videos, candidates, limit, batch: BatchStatus::default(), generated_at }
    }

    pub fn with_batch(mut self, batch: BatchStatus) -> Self {
        self.batch = batch;
        self
    }
}

/// Result plus the recommendations selected against it.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub result: AnalysisResult,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Assembler {
    selector: Selector,
}

impl Assembler {
    pub fn new(selector: Selector) -> Self {
        Self { selector }
    }

    /// Run weighting, aggregation, scoring, comparison and selection over one
    /// input snapshot. Never fails; empty input yields the zero result.
    #[instrument(skip_all, fields(videos = input.videos.len(), candidates = input.candidates.len()))]
    pub fn assemble(&self, input: AnalysisInput<'_>) -> Analysis {
        let breakdown = aggregate_videos(input.videos);
        let entropy = entropy_score(&breakdown);
        let bias = leaning_score(&breakdown);
        let source_comparison = compare_sources(input.videos);
        let political_video_count = input.videos.iter().filter(|v| v.stance.is_political()).count();

        debug!(
            entropy,
            bias,
            watch_history_entropy = source_comparison.watch_history.entropy_score,
            home_feed_entropy = source_comparison.home_feed.entropy_score,
            "scored breakdown"
        );

        // Never suggest something already watched
        let watched: HashSet<&str> = input
            .videos
            .iter()
            .filter(|v| v.source_phase == SourcePhase::WatchHistory)
            .map(|v| v.video_id.as_str())
            .collect();
        let pool: Vec<ClassifiedVideo> = input
            .candidates
            .iter()
            .filter(|c| !watched.contains(c.video_id.as_str()))
            .cloned()
            .collect();
        let recommendations = self.selector.select(&breakdown, &pool, input.limit);

        let result = AnalysisResult {
            bias_score: bias,
            entropy_score: entropy,
            breakdown,
            source_comparison,
            political_video_count,
            video_count: input.videos.len(),
            batch: input.batch,
            generated_at: input.generated_at,
        };

        info!(
            entropy,
            bias,
            recommendations = recommendations.len(),
            partial = input.batch.partial,
            "analysis assembled"
        );

        Analysis { result, recommendations }
    }
}

/// Analyse with the default selection policy.
pub fn analyze(
    videos: &[ClassifiedVideo],
    candidates: &[ClassifiedVideo],
    limit: usize,
    generated_at: DateTime<Utc>,
) -> (AnalysisResult, Vec<Recommendation>) {
    let Analysis { result, recommendations } =
        Assembler::default().assemble(AnalysisInput::new(videos, candidates, limit, generated_at));
    (result, recommendations)
}
