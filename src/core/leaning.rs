//! Progressive/conservative leaning (the bias score).

use crate::core::aggregate::StanceBreakdown;
use crate::core::stance::StanceBucket;

/// Neutral point of the leaning axis
pub const BALANCED: u8 = 50;

/// `50 + (progressive% - conservative%) / 2`, rounded half-up into `0..=100`.
/// 0 is all conservative, 100 all progressive; centrist and non-political
/// shares pull toward 50.
pub fn leaning_score(breakdown: &StanceBreakdown) -> u8 {
    let l = breakdown.percentage(StanceBucket::Progressive) as f64;
    let r = breakdown.percentage(StanceBucket::Conservative) as f64;
    let score = BALANCED as f64 + (l - r) / 2.0;
    (score + 0.5).floor().clamp(0.0, 100.0) as u8
}

/// Short human label for a leaning score; within 5 points of 50 is balanced.
pub fn leaning_label(score: u8) -> &'static str {
    match score {
        0..=44 => "leans conservative",
        45..=55 => "balanced",
        _ => "leans progressive",
    }
}
