//! Counter-recommendation selection.
//!
//! Finds the political buckets that fall short of an even split and deals
//! confident candidates from those buckets round-robin, the most
//! underrepresented bucket first.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::aggregate::StanceBreakdown;
use crate::core::stance::StanceBucket;
use crate::core::video::ClassifiedVideo;

/// Even three-way share of political content, in percent
pub const BALANCED_SHARE: f64 = 100.0 / 3.0;

/// Percentages are whole points; a bucket within this distance of the even
/// share counts as balanced.
pub const ROUNDING_TOLERANCE: f64 = 0.5;

/// Default minimum dominant probability for a counter-view
pub const DEFAULT_CONFIDENCE_FLOOR: f64 = 0.5;

/// A suggested video with the reason it was picked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub video: ClassifiedVideo,
    pub reason: String,
    /// The bucket this video adds weight to
    pub opposing_viewpoint: StanceBucket,
    pub dominant_probability: f64,
    #[serde(default)]
    pub watched: bool,
}

impl Recommendation {
    /// The only mutation a recommendation allows.
    pub fn mark_watched(&mut self) {
        self.watched = true;
    }
}

/// Selection policy knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selector {
    pub confidence_floor: f64,
}

impl Default for Selector {
    fn default() -> Self {
        Self { confidence_floor: DEFAULT_CONFIDENCE_FLOOR }
    }
}

impl Selector {
    pub fn new(confidence_floor: f64) -> Self {
        Self { confidence_floor }
    }

    /// Pick at most `limit` candidates that pull the breakdown toward an even
    /// split. An empty result means the feed is already balanced or nothing
    /// qualifies.
    pub fn select(
        &self,
        breakdown: &StanceBreakdown,
        candidates: &[ClassifiedVideo],
        limit: usize,
    ) -> Vec<Recommendation> {
        let targets = underrepresented(breakdown);
        if targets.is_empty() || limit == 0 {
            debug!(limit, "no underrepresented bucket or zero limit");
            return Vec::new();
        }

        // One queue per target bucket, strongest signal first
        let mut seen = HashSet::new();
        let mut queues: Vec<Vec<(&ClassifiedVideo, f64)>> = vec![Vec::new(); targets.len()];
        for cand in candidates {
            if !seen.insert(cand.video_id.as_str()) {
                continue;
            }
            let (bucket, prob) = cand.stance.dominant();
            if prob < self.confidence_floor {
                continue;
            }
            if let Some(slot) = targets.iter().position(|(b, _)| *b == bucket) {
                queues[slot].push((cand, prob));
            }
        }
        for q in queues.iter_mut() {
            q.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.video_id.cmp(&b.0.video_id)));
            q.reverse(); // pop() from the back yields the strongest first
        }

        let mut out = Vec::with_capacity(limit);
        while out.len() < limit {
            let mut picked_any = false;
            for (slot, (bucket, pct)) in targets.iter().enumerate() {
                if out.len() >= limit {
                    break;
                }
                if let Some((video, prob)) = queues[slot].pop() {
                    out.push(Recommendation {
                        video: video.clone(),
                        reason: reason_for(*bucket, *pct),
                        opposing_viewpoint: *bucket,
                        dominant_probability: prob,
                        watched: false,
                    });
                    picked_any = true;
                }
            }
            if !picked_any {
                break;
            }
        }

        debug!(
            targets = targets.len(),
            candidates = candidates.len(),
            selected = out.len(),
            "recommendations selected"
        );
        out
    }
}

/// Political buckets below the even share, most underrepresented first.
/// Ties keep canonical bucket order.
pub fn underrepresented(breakdown: &StanceBreakdown) -> Vec<(StanceBucket, u8)> {
    if breakdown.is_empty() {
        return Vec::new();
    }
    let mut out: Vec<(StanceBucket, u8)> = StanceBucket::POLITICAL
        .iter()
        .map(|b| (*b, breakdown.percentage(*b)))
        .filter(|(_, pct)| (*pct as f64) < BALANCED_SHARE - ROUNDING_TOLERANCE)
        .collect();
    out.sort_by_key(|(_, pct)| *pct);
    out
}

fn reason_for(bucket: StanceBucket, pct: u8) -> String {
    format!(
        "{} viewpoints are {}% of your feed vs. a balanced {}%",
        bucket.label(),
        pct,
        BALANCED_SHARE.round() as u8
    )
}
