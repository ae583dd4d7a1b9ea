use clap::Parser;
use feedbalance::cli::{AnalyzeArgs, Cli, Commands, IngestArgs, InitArgs};

#[test]
fn ingest_flag_parsing() {
    // Given
    let argv = vec![
        "fbal",
        "ingest",
        "videos.json",
        "--stances",
        "stances.json",
        "--subscriptions",
        "subs.json",
        "--workers",
        "2",
    ];

    // When
    let cmd = Cli::parse_from(argv);

    // Then
    match cmd.command {
        Commands::Ingest(IngestArgs { videos, stances, subscriptions, workers }) => {
            assert!(videos.ends_with("videos.json"));
            assert!(stances.ends_with("stances.json"));
            assert!(subscriptions.is_some());
            assert_eq!(workers, Some(2));
        }
        _ => panic!("expected Ingest command"),
    }
}

#[test]
fn analyze_defaults_come_from_config() {
    let cmd = Cli::parse_from(["fbal", "--verbose", "analyze"]);
    assert!(cmd.verbose);
    match cmd.command {
        Commands::Analyze(AnalyzeArgs { candidates, limit, output }) => {
            assert!(candidates.is_none());
            assert!(limit.is_none());
            assert!(!output.json);
        }
        _ => panic!("expected Analyze command"),
    }
}

#[test]
fn ingest_requires_stances() {
    assert!(Cli::try_parse_from(["fbal", "ingest", "videos.json"]).is_err());
}

#[test]
fn init_takes_a_positional_directory() {
    match Cli::parse_from(["fbal", "init", "conf", "--force"]).command {
        Commands::Init(InitArgs { path, force }) => {
            assert_eq!(path, std::path::PathBuf::from("conf"));
            assert!(force);
        }
        _ => panic!("expected Init command"),
    }
    match Cli::parse_from(["fbal", "init"]).command {
        Commands::Init(args) => assert_eq!(args.path, std::path::PathBuf::from(".")),
        _ => panic!("expected Init command"),
    }
    assert!(Cli::try_parse_from(["fbal", "init", "--path", "conf"]).is_err());
}

#[test]
fn completions_need_exactly_one_destination() {
    assert!(Cli::try_parse_from(["fbal", "completions", "zsh"]).is_err());
    assert!(Cli::try_parse_from(["fbal", "completions", "zsh", "--stdout", "--out-dir", "d"]).is_err());
    assert!(Cli::try_parse_from(["fbal", "completions", "zsh", "--out-dir", "d"]).is_ok());
}
