//! Read-only projection of stored analysis output.

use serde::{Deserialize, Serialize};

use crate::core::analysis::AnalysisResult;
use crate::core::store::{AnalysisStore, StoreError, StoredRecommendation};
use crate::core::video::ClassifiedVideo;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Most recent analysis, if any was stored
    pub latest: Option<AnalysisResult>,
    pub analyses: usize,
    pub active_videos: usize,
    pub recommendations: usize,
    pub watched: usize,
    /// Entropy change since the previous analysis
    pub entropy_change: Option<i16>,
}

impl StatsSnapshot {
    pub fn project(
        history: &[AnalysisResult],
        active: &[ClassifiedVideo],
        recommendations: &[StoredRecommendation],
    ) -> Self {
        let entropy_change = match history {
            [.., prev, last] => Some(last.entropy_score as i16 - prev.entropy_score as i16),
            _ => None,
        };
        Self {
            latest: history.last().cloned(),
            analyses: history.len(),
            active_videos: active.len(),
            recommendations: recommendations.len(),
            watched: recommendations.iter().filter(|r| r.recommendation.watched).count(),
            entropy_change,
        }
    }

    pub fn load(store: &dyn AnalysisStore) -> Result<Self, StoreError> {
        let history = store.load_analysis_history()?;
        let active = store.load_active_classified_videos()?;
        let recommendations = store.load_recommendations()?;
        Ok(Self::project(&history, &active, &recommendations))
    }

    /// Fraction of recommendations marked watched, 0 when none exist
    pub fn watch_rate(&self) -> f64 {
        if self.recommendations == 0 {
            0.0
        } else {
            self.watched as f64 / self.recommendations as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analysis::analyze;
    use crate::core::select::Recommendation;
    use crate::core::stance::{StanceBucket, StanceDistribution};
    use crate::core::video::SourcePhase;
    use chrono::{TimeZone, Utc};

    fn video(id: &str, p: [f64; 4]) -> ClassifiedVideo {
        ClassifiedVideo {
            video_id: id.to_string(),
            title: id.to_string(),
            channel_id: None,
            stance: StanceDistribution::from_parts(p[0], p[1], p[2], p[3]).unwrap(),
            source_phase: SourcePhase::WatchHistory,
            significance_weight: 100,
            from_subscribed_channel: false,
            classified_at: Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
        }
    }

    fn stored(id: u64, watched: bool) -> StoredRecommendation {
        StoredRecommendation {
            id,
            recommendation: Recommendation {
                video: video(&format!("r{id}"), [0.0, 1.0, 0.0, 0.0]),
                reason: String::new(),
                opposing_viewpoint: StanceBucket::Conservative,
                dominant_probability: 1.0,
                watched,
            },
        }
    }

    #[test]
    fn empty_store_projects_to_default() {
        let snap = StatsSnapshot::project(&[], &[], &[]);
        assert_eq!(snap, StatsSnapshot::default());
        assert_eq!(snap.watch_rate(), 0.0);
    }

    #[test]
    fn latest_result_and_counts() {
        let at = Utc.with_ymd_and_hms(2026, 2, 2, 0, 0, 0).unwrap();
        let one_sided = vec![video("a", [1.0, 0.0, 0.0, 0.0])];
        let mixed = vec![video("a", [1.0, 0.0, 0.0, 0.0]), video("b", [0.0, 1.0, 0.0, 0.0])];
        let first = analyze(&one_sided, &[], 5, at).0;
        let second = analyze(&mixed, &[], 5, at).0;

        let recs = vec![stored(1, true), stored(2, false), stored(3, false), stored(4, true)];
        let snap = StatsSnapshot::project(&[first, second.clone()], &mixed, &recs);

        assert_eq!(snap.latest, Some(second.clone()));
        assert_eq!(snap.analyses, 2);
        assert_eq!(snap.active_videos, 2);
        assert_eq!((snap.recommendations, snap.watched), (4, 2));
        assert_eq!(snap.entropy_change, Some(second.entropy_score as i16));
        assert_eq!(snap.watch_rate(), 0.5);
    }
}
