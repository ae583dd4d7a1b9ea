//! Weighted stance aggregation.
//!
//! Folds `(distribution, weight)` pairs into a [`StanceBreakdown`] whose
//! integer percentages sum to exactly 100 whenever any weight was seen.

use serde::{Deserialize, Serialize};

use crate::core::stance::{StanceBucket, StanceDistribution};
use crate::core::video::ClassifiedVideo;

/// Weighted mass and rounded share of one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BucketShare {
    /// Sum of weight × probability, not a video count
    pub count: f64,
    /// Share of the weighted total, 0..=100
    pub percentage: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StanceBreakdown {
    pub progressive: BucketShare,
    pub conservative: BucketShare,
    pub centrist: BucketShare,
    pub non_political: BucketShare,
    /// Σ weight over all inputs
    pub total_weight: f64,
}

impl StanceBreakdown {
    /// Build a breakdown from per-bucket weighted counts (canonical order).
    /// The total weight is the sum of the counts.
    pub fn from_counts(counts: [f64; 4]) -> Self {
        let total: f64 = counts.iter().sum();
        Self::with_total(counts, total)
    }

    fn with_total(counts: [f64; 4], total: f64) -> Self {
        let pcts = apportion(&counts, total);
        let share = |i: usize| BucketShare { count: counts[i], percentage: pcts[i] };
        Self {
            progressive: share(0),
            conservative: share(1),
            centrist: share(2),
            non_political: share(3),
            total_weight: if total > 0.0 { total } else { 0.0 },
        }
    }

    pub fn get(&self, bucket: StanceBucket) -> &BucketShare {
        match bucket {
            StanceBucket::Progressive => &self.progressive,
            StanceBucket::Conservative => &self.conservative,
            StanceBucket::Centrist => &self.centrist,
            StanceBucket::NonPolitical => &self.non_political,
        }
    }

    pub fn percentage(&self, bucket: StanceBucket) -> u8 {
        self.get(bucket).percentage
    }

    pub fn count(&self, bucket: StanceBucket) -> f64 {
        self.get(bucket).count
    }

    /// True when no weight contributed (the zero breakdown).
    pub fn is_empty(&self) -> bool {
        self.total_weight <= 0.0
    }

    /// Weighted mass in the three political buckets
    pub fn political_mass(&self) -> f64 {
        StanceBucket::POLITICAL.iter().map(|b| self.count(*b)).sum()
    }

    pub fn percentage_sum(&self) -> u32 {
        StanceBucket::ALL.iter().map(|b| self.percentage(*b) as u32).sum()
    }
}

/// Aggregate `(distribution, weight)` pairs. Empty input or all-zero weights
/// give the zero breakdown.
pub fn aggregate<'a, I>(items: I) -> StanceBreakdown
where
    I: IntoIterator<Item = (&'a StanceDistribution, u8)>,
{
    let mut counts = [0.0f64; 4];
    let mut total = 0.0f64;

    for (dist, weight) in items {
        let w = weight as f64;
        if w == 0.0 {
            continue;
        }
        total += w;
        for bucket in StanceBucket::ALL {
            counts[bucket.index()] += dist.get(bucket) * w;
        }
    }

    StanceBreakdown::with_total(counts, total)
}

/// Aggregate classified videos by their significance weight.
pub fn aggregate_videos<'a, I>(videos: I) -> StanceBreakdown
where
    I: IntoIterator<Item = &'a ClassifiedVideo>,
{
    aggregate(videos.into_iter().map(|v| (&v.stance, v.significance_weight)))
}

/// Round each share half-up, then hand the residual to the bucket with the
/// largest fractional remainder so the shares sum to exactly 100.
fn apportion(counts: &[f64; 4], total: f64) -> [u8; 4] {
    if !(total > 0.0) {
        return [0; 4];
    }

    let raw: Vec<f64> = counts.iter().map(|c| (c / total * 100.0).max(0.0)).collect();
    let mut rounded: [i32; 4] = [0; 4];
    for (i, r) in raw.iter().enumerate() {
        rounded[i] = r.round() as i32;
    }

    let residual = 100 - rounded.iter().sum::<i32>();
    if residual != 0 {
        // Stable sort keeps canonical order among equal remainders
        let mut order: Vec<usize> = (0..4).collect();
        order.sort_by_key(|&i| std::cmp::Reverse(remainder_key(raw[i])));

        let first = order[0];
        if rounded[first] + residual >= 0 {
            rounded[first] += residual;
        } else {
            let step = residual.signum();
            let mut left = residual.abs();
            for &i in order.iter().cycle().take(order.len() * 4) {
                if left == 0 {
                    break;
                }
                if step < 0 && rounded[i] == 0 {
                    continue;
                }
                rounded[i] += step;
                left -= 1;
            }
        }
    }

    let mut out = [0u8; 4];
    for (o, r) in out.iter_mut().zip(rounded.iter()) {
        *o = (*r).clamp(0, 100) as u8;
    }
    out
}

/// Fractional part quantized to 1e-9 so float noise cannot split ties
fn remainder_key(x: f64) -> i64 {
    ((x - x.floor()) * 1e9).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dist(p: f64, c: f64, ce: f64, np: f64) -> StanceDistribution {
        StanceDistribution::from_parts(p, c, ce, np).unwrap()
    }

    #[test]
    fn empty_input_is_zero_breakdown() {
        let b = aggregate(std::iter::empty());
        assert!(b.is_empty());
        assert_eq!(b.percentage_sum(), 0);
        assert_eq!(b, StanceBreakdown::default());
    }

    #[test]
    fn zero_weights_are_ignored() {
        let d = dist(1.0, 0.0, 0.0, 0.0);
        let b = aggregate([(&d, 0u8), (&d, 0u8)]);
        assert!(b.is_empty());
        assert_eq!(b.progressive.percentage, 0);
        assert_eq!(b.progressive.count, 0.0);
    }

    #[test]
    fn counts_are_weighted_mass() {
        let a = dist(1.0, 0.0, 0.0, 0.0);
        let b = dist(0.0, 0.5, 0.5, 0.0);
        let out = aggregate([(&a, 100u8), (&b, 50u8)]);

        assert_eq!(out.total_weight, 150.0);
        assert_eq!(out.progressive.count, 100.0);
        assert_eq!(out.conservative.count, 25.0);
        assert_eq!(out.centrist.count, 25.0);
        // 66.67 / 16.67 / 16.67 rounds to 101; the overshoot comes off the
        // first of the equal remainders
        assert_eq!(out.progressive.percentage, 66);
        assert_eq!(out.conservative.percentage, 17);
        assert_eq!(out.centrist.percentage, 17);
        assert_eq!(out.percentage_sum(), 100);
    }

    #[test]
    fn thirds_give_residual_to_first_bucket() {
        let b = StanceBreakdown::from_counts([1.0, 1.0, 1.0, 0.0]);
        assert_eq!(
            [b.progressive.percentage, b.conservative.percentage, b.centrist.percentage],
            [34, 33, 33]
        );
    }

    #[test]
    fn overshoot_never_goes_negative() {
        // 0.5 / 0.5 / 0.5 / 98.5 rounds to 102 before correction
        let b = StanceBreakdown::from_counts([0.5, 0.5, 0.5, 98.5]);
        assert_eq!(b.percentage_sum(), 100);
        for bucket in StanceBucket::ALL {
            assert!(b.percentage(bucket) <= 100);
        }
    }

    fn arb_dist() -> impl Strategy<Value = StanceDistribution> {
        (0.0f64..1.0, 0.0f64..1.0, 0.0f64..1.0, 0.0f64..1.0).prop_map(|(a, b, c, d)| {
            let (a, b, c, d) = (a + 1e-3, b + 1e-3, c + 1e-3, d + 1e-3);
            let s = a + b + c + d;
            StanceDistribution::from_parts(a / s, b / s, c / s, d / s).unwrap()
        })
    }

    proptest! {
        #[test]
        fn percentages_sum_to_hundred_when_mass_positive(
            items in prop::collection::vec((arb_dist(), 0u8..=100), 0..40)
        ) {
            let b = aggregate(items.iter().map(|(d, w)| (d, *w)));
            let mass: u32 = items.iter().map(|(_, w)| *w as u32).sum();
            if mass > 0 {
                prop_assert_eq!(b.percentage_sum(), 100);
                prop_assert!((b.total_weight - mass as f64).abs() < 1e-9);
            } else {
                prop_assert_eq!(b.percentage_sum(), 0);
            }
        }
    }
}
