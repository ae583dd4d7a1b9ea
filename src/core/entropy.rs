//! Viewpoint diversity as normalized Shannon entropy.
//!
//! Only the three political buckets take part. Non-political mass is left
//! out of the denominator, so a feed full of cooking videos is neither more
//! nor less diverse than the political videos inside it.

use crate::core::aggregate::StanceBreakdown;
use crate::core::stance::StanceBucket;

/// Diversity score in `0..=100`: 100 for an even three-way split, 0 for a
/// single stance or no political signal at all.
pub fn entropy_score(breakdown: &StanceBreakdown) -> u8 {
    let political = breakdown.political_mass();
    if !(political > 0.0) {
        return 0;
    }

    let h: f64 = StanceBucket::POLITICAL
        .iter()
        .map(|b| breakdown.count(*b) / political)
        .filter(|p| *p > 0.0)
        .map(|p| -p * p.log2())
        .sum();

    let max = 3f64.log2();
    (100.0 * h / max).round().clamp(0.0, 100.0) as u8
}
