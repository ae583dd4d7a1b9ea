//! Shared test utilities for integration tests
//!
//! Builds a small collected feed that leans progressive, with one malformed
//! classifier answer and one video the classifier never answered for.

#![allow(dead_code)]

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use std::process::Command;

pub const VIDEOS: &str = r#"[
  {"videoId": "w1", "title": "Climate bill explained", "channelId": "UC-a", "sourcePhase": "watch_history"},
  {"videoId": "w2", "title": "Housing first", "channelId": "UC-b", "sourcePhase": "watch_history"},
  {"videoId": "h1", "title": "Union drive", "channelId": "UC-c", "sourcePhase": "home_feed"},
  {"videoId": "h2", "title": "Sourdough basics", "channelId": "UC-bake", "sourcePhase": "home_feed"},
  {"videoId": "s1", "title": "Tax plan debate", "channelId": "UC-d", "sourcePhase": "search"},
  {"videoId": "bad", "title": "Broken answer", "sourcePhase": "home_feed"},
  {"videoId": "missing", "title": "Never classified", "sourcePhase": "home_feed"}
]"#;

pub const STANCES: &str = r#"{
  "w1": {"progressive": 0.8, "conservative": 0.1, "centrist": 0.1, "nonPolitical": 0.0},
  "w2": {"progressive": 0.7, "conservative": 0.0, "centrist": 0.2, "nonPolitical": 0.1},
  "h1": {"progressive": 0.9, "conservative": 0.0, "centrist": 0.0, "nonPolitical": 0.1},
  "h2": {"progressive": 0.0, "conservative": 0.0, "centrist": 0.0, "nonPolitical": 1.0},
  "s1": {"progressive": 0.6, "conservative": 0.2, "centrist": 0.2, "nonPolitical": 0.0},
  "bad": {"progressive": 0.5, "conservative": 0.5, "centrist": 0.5, "nonPolitical": 0.0}
}"#;

pub const SUBSCRIPTIONS: &str = r#"[{"channelId": "UC-bake", "channelName": "Bake Club"}]"#;

pub const CANDIDATES: &str = r#"[
  {"videoId": "c1", "title": "Small government case", "sourcePhase": "recommended",
   "stance": {"progressive": 0.0, "conservative": 0.9, "centrist": 0.1, "nonPolitical": 0.0}},
  {"videoId": "c2", "title": "Border policy", "sourcePhase": "recommended",
   "stance": {"progressive": 0.1, "conservative": 0.6, "centrist": 0.3, "nonPolitical": 0.0}},
  {"videoId": "m1", "title": "Both sides of the budget", "sourcePhase": "recommended",
   "stance": {"progressive": 0.1, "conservative": 0.1, "centrist": 0.8, "nonPolitical": 0.0}},
  {"videoId": "p1", "title": "More of the same", "sourcePhase": "recommended",
   "stance": {"progressive": 0.9, "conservative": 0.0, "centrist": 0.1, "nonPolitical": 0.0}},
  {"videoId": "w1", "title": "Already watched", "sourcePhase": "recommended",
   "stance": {"progressive": 0.0, "conservative": 0.0, "centrist": 1.0, "nonPolitical": 0.0}}
]"#;

/// Temp workspace holding every input file.
pub fn make_feed_fixture() -> assert_fs::TempDir
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    tmp.child("videos.json")
        .write_str(VIDEOS)
        .expect("write videos");
    tmp.child("stances.json")
        .write_str(STANCES)
        .expect("write stances");
    tmp.child("subscriptions.json")
        .write_str(SUBSCRIPTIONS)
        .expect("write subscriptions");
    tmp.child("candidates.json")
        .write_str(CANDIDATES)
        .expect("write candidates");
    tmp
}

/// `fbal` inside `dir` with fast retries and no ambient log filter.
pub fn fbal(dir: &std::path::Path) -> Command
{
    let mut cmd = Command::cargo_bin("fbal").expect("bin");
    cmd.current_dir(dir)
        .env_remove("RUST_LOG")
        .env("FEEDBALANCE_INGEST__RETRY_BACKOFF_MS", "1")
        .env("FEEDBALANCE_INGEST__MAX_ATTEMPTS", "2");
    cmd
}
