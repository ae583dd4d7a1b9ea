//! Stance buckets and validated per-video stance distributions.
//!
//! A distribution is produced once per video by the external classifier and
//! is only ever constructed through [`StanceDistribution::new`], so every
//! value in the engine already satisfies the sum-to-one invariant.

use serde::{Deserialize, Serialize};

/// Allowed deviation of a distribution's sum from 1.0
pub const SUM_TOLERANCE: f64 = 1e-6;

/// One of the four stance buckets, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StanceBucket
{
    Progressive,
    Conservative,
    Centrist,
    NonPolitical,
}

impl StanceBucket
{
    /// All buckets in canonical (tie-break) order
    pub const ALL: [StanceBucket; 4] = [
        StanceBucket::Progressive,
        StanceBucket::Conservative,
        StanceBucket::Centrist,
        StanceBucket::NonPolitical,
    ];

    /// The buckets that carry a political viewpoint
    pub const POLITICAL: [StanceBucket; 3] =
        [StanceBucket::Progressive, StanceBucket::Conservative, StanceBucket::Centrist];

    pub fn is_political(self) -> bool
    {
        !matches!(self, StanceBucket::NonPolitical)
    }

    /// Position in [`StanceBucket::ALL`]
    pub fn index(self) -> usize
    {
        self as usize
    }

    pub fn label(self) -> &'static str
    {
        match self
        {
            StanceBucket::Progressive => "progressive",
            StanceBucket::Conservative => "conservative",
            StanceBucket::Centrist => "centrist",
            StanceBucket::NonPolitical => "non-political",
        }
    }
}

impl std::fmt::Display for StanceBucket
{
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result
    {
        f.write_str(self.label())
    }
}

/// Why a classifier answer was rejected at ingestion.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MalformedDistribution
{
    #[error("{bucket} probability is negative ({value})")]
    NegativeProbability
    {
        bucket: StanceBucket,
        value: f64,
    },

    #[error("{bucket} probability is not a finite number")]
    NonFinite
    {
        bucket: StanceBucket,
    },

    #[error("probabilities sum to {sum}, expected 1.0")]
    SumOutOfTolerance
    {
        sum: f64,
    },
}

/// Unvalidated four-way answer as it arrives from a classifier.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RawStance
{
    pub progressive: f64,
    pub conservative: f64,
    pub centrist: f64,
    #[serde(alias = "nonPolitical")]
    pub non_political: f64,
}

impl RawStance
{
    pub fn new(
        progressive: f64,
        conservative: f64,
        centrist: f64,
        non_political: f64,
    ) -> Self
    {
        Self { progressive, conservative, centrist, non_political }
    }

    fn values(&self) -> [f64; 4]
    {
        [self.progressive, self.conservative, self.centrist, self.non_political]
    }
}

/// Validated stance probabilities: non-negative, finite, summing to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStance", into = "RawStance")]
pub struct StanceDistribution
{
    probs: [f64; 4],
}

impl StanceDistribution
{
    /// Validate a raw classifier answer. Never renormalizes.
    pub fn new(raw: RawStance) -> Result<Self, MalformedDistribution>
    {
        let probs = raw.values();

        for (bucket, &value) in StanceBucket::ALL
            .iter()
            .zip(probs.iter())
        {
            if !value.is_finite()
            {
                return Err(MalformedDistribution::NonFinite { bucket: *bucket });
            }
            if value < 0.0
            {
                return Err(MalformedDistribution::NegativeProbability { bucket: *bucket, value });
            }
        }

        let sum: f64 = probs
            .iter()
            .sum();
        if (sum - 1.0).abs() > SUM_TOLERANCE
        {
            return Err(MalformedDistribution::SumOutOfTolerance { sum });
        }

        Ok(Self { probs })
    }

    /// Shorthand for `new(RawStance::new(..))`
    pub fn from_parts(
        progressive: f64,
        conservative: f64,
        centrist: f64,
        non_political: f64,
    ) -> Result<Self, MalformedDistribution>
    {
        Self::new(RawStance::new(progressive, conservative, centrist, non_political))
    }

    pub fn get(
        &self,
        bucket: StanceBucket,
    ) -> f64
    {
        self.probs[bucket.index()]
    }

    /// Bucket with the highest probability; ties go to the earlier bucket.
    pub fn dominant(&self) -> (StanceBucket, f64)
    {
        let mut best = (StanceBucket::Progressive, self.probs[0]);
        for bucket in &StanceBucket::ALL[1..]
        {
            let p = self.get(*bucket);
            if p > best.1
            {
                best = (*bucket, p);
            }
        }
        best
    }

    pub fn is_political(&self) -> bool
    {
        self.dominant()
            .0
            .is_political()
    }
}

impl TryFrom<RawStance> for StanceDistribution
{
    type Error = MalformedDistribution;

    fn try_from(raw: RawStance) -> Result<Self, Self::Error>
    {
        Self::new(raw)
    }
}

impl From<StanceDistribution> for RawStance
{
    fn from(d: StanceDistribution) -> Self
    {
        let [progressive, conservative, centrist, non_political] = d.probs;
        RawStance { progressive, conservative, centrist, non_political }
    }
}
