//! **feedbalance** - viewpoint diversity analysis for video feeds
//!
//! Classified videos are weighted by where they were collected, folded into a
//! four-bucket stance breakdown and scored for diversity and leaning. Buckets
//! that fall short of an even split drive counter-recommendations.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Analysis engine - pure scoring plus the ingestion pipeline
pub mod core {
    /// Stance buckets and validated distributions
    pub mod stance;
    pub use stance::{MalformedDistribution, RawStance, StanceBucket, StanceDistribution};

    /// Collected and classified video records
    pub mod video;
    pub use video::{ClassifiedVideo, SourcePhase, SubscriptionRecord, VideoRecord};

    /// Significance weight per source phase
    pub mod weight;
    pub use weight::WeightTable;

    /// Weighted aggregation with largest-remainder rounding
    pub mod aggregate;
    pub use aggregate::{BucketShare, StanceBreakdown, aggregate, aggregate_videos};

    /// Normalized Shannon entropy over political buckets
    pub mod entropy;
    pub use entropy::entropy_score;

    /// Progressive/conservative leaning
    pub mod leaning;
    pub use leaning::leaning_score;

    /// Watch history vs. home feed
    pub mod compare;
    pub use compare::{SourceComparison, SourceSlice, compare_sources};

    /// Counter-recommendation selection
    pub mod select;
    pub use select::{Recommendation, Selector};

    /// Analysis assembly
    pub mod analysis;
    pub use analysis::{Analysis, AnalysisInput, AnalysisResult, Assembler, BatchStatus, analyze};

    /// Classifier trait and adapters
    pub mod classify;
    pub use classify::{ClassificationFailure, PrecomputedClassifier, StanceClassifier};

    /// Bounded-parallel classification with retry, timeout and cancellation
    pub mod ingest;
    pub use ingest::{CancelToken, IngestBatch, IngestError, IngestOptions, Ingestor};

    /// Persistence seam
    pub mod store;
    pub use store::{AnalysisStore, StoreError, StoredRecommendation};

    /// Stats projection over stored output
    pub mod stats;
    pub use stats::StatsSnapshot;
}

/// Command handlers behind the CLI
pub mod cli_ext {
    pub mod analyze_cmd;
    pub mod common;
    pub mod ingest_cmd;
    pub mod report_cmd;
}

/// Infrastructure - configuration and the on-disk store
pub mod infra {
    /// Layered configuration (file, env) with TOML init
    pub mod config;
    pub use config::{Config, init as config_init, load_config};

    /// JSON-lines store with advisory locking
    pub mod store;
    pub use store::JsonStore;
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use infra::{Config, JsonStore, load_config};

// Core types for external consumers
pub use self::core::{AnalysisResult, ClassifiedVideo, Recommendation, StanceBreakdown, analyze};
