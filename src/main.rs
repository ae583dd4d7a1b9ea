use anyhow::Result;
use clap::Parser;
use feedbalance::cli::{AppContext, Cli, Commands};
use feedbalance::cli_ext::{analyze_cmd, ingest_cmd, report_cmd};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Build a context once, pass everywhere
    let ctx = AppContext { quiet: cli.quiet, no_color: cli.no_color };

    // Config is only read by commands that touch the store
    let config = || feedbalance::load_config(cli.config.as_deref());

    match cli.command {
        Commands::Ingest(args) => ingest_cmd::run(args, &config()?, &ctx),
        Commands::Analyze(args) => analyze_cmd::run(args, &config()?, &ctx),
        Commands::Stats(args) => report_cmd::stats(args, &config()?, &ctx),
        Commands::History(args) => report_cmd::history(args, &config()?, &ctx),
        Commands::Watched(args) => report_cmd::watched(args, &config()?, &ctx),
        Commands::Init(args) => feedbalance::infra::config::init(args, &ctx),
        Commands::Completions(args) => feedbalance::completion::run(args, &ctx),
    }
}

/// Logs go to stderr so `--json` output stays clean. RUST_LOG wins over
/// `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
