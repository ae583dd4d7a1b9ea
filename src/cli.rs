use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
}

#[derive(Parser)]
#[command(name = "fbal")]
#[command(about = "Measure viewpoint diversity in a video feed and suggest counter-views")]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress progress bars and non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Log pipeline progress to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file to use instead of ./feedbalance.toml
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify collected videos and store them
    Ingest(IngestArgs),

    /// Score the stored feed and pick counter-recommendations
    Analyze(AnalyzeArgs),

    /// Show the latest analysis and store counts
    Stats(StatsArgs),

    /// Show entropy and leaning across stored analyses
    History(HistoryArgs),

    /// Mark a recommendation as watched
    Watched(WatchedArgs),

    /// Initialize a feedbalance.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
pub struct IngestArgs {
    /// JSON array of collected video records
    #[arg(value_name = "VIDEOS")]
    pub videos: PathBuf,

    /// JSON object of classifier output keyed by video id
    #[arg(long, value_name = "FILE")]
    pub stances: PathBuf,

    /// JSON array of subscribed channels
    #[arg(long, value_name = "FILE")]
    pub subscriptions: Option<PathBuf>,

    /// Concurrent classifier calls (1-8)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=8))]
    pub workers: Option<u8>,
}

#[derive(Parser, Debug)]
pub struct AnalyzeArgs {
    /// JSON array of classified candidate videos
    #[arg(long, value_name = "FILE")]
    pub candidates: Option<PathBuf>,

    /// Maximum number of recommendations
    #[arg(long)]
    pub limit: Option<usize>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct OutputArgs {
    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct StatsArgs {
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct HistoryArgs {
    /// Only show the most recent N analyses
    #[arg(long)]
    pub last: Option<usize>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct WatchedArgs {
    /// Recommendation id as printed by `analyze`
    pub id: u64,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(value_name = "DIR", default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Directory to write the completion script into
    #[arg(long, value_name = "DIR", conflicts_with = "stdout", required_unless_present = "stdout")]
    pub out_dir: Option<PathBuf>,

    /// Print the completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
