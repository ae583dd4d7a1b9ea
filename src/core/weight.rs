//! Significance weights by source phase.
//!
//! Watch history counts the most because the user chose it; subscription
//! derived items count the least. The table is plain configuration so new
//! phases only touch this file.

use serde::{Deserialize, Serialize};

use crate::core::video::SourcePhase;

/// Upper bound of any significance weight
pub const MAX_WEIGHT: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightTable {
    pub watch_history: u8,
    pub search: u8,
    pub recommended: u8,
    pub home_feed: u8,
    pub subscriptions: u8,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            watch_history: 100,
            search: 75,
            recommended: 60,
            home_feed: 50,
            subscriptions: 40,
        }
    }
}

impl WeightTable {
    /// Weight in `0..=100` for a phase. Unknown phases weigh like the home feed.
    pub fn weight(&self, phase: SourcePhase) -> u8 {
        let w = match phase {
            SourcePhase::WatchHistory => self.watch_history,
            SourcePhase::Search => self.search,
            SourcePhase::Recommended => self.recommended,
            SourcePhase::HomeFeed | SourcePhase::Unknown => self.home_feed,
            SourcePhase::Subscriptions => self.subscriptions,
        };
        w.min(MAX_WEIGHT)
    }
}
