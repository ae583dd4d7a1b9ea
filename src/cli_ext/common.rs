//! Helpers shared by the command handlers.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use serde::de::DeserializeOwned;

use crate::cli::AppContext;

/// Read and parse a JSON input file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Progress bar for `len` items, hidden with `--quiet`.
pub fn progress_bar(ctx: &AppContext, len: usize) -> ProgressBar {
    if ctx.quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb
}

/// Terminal styling that honours `--no-color`.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    color: bool,
}

impl Palette {
    pub fn new(ctx: &AppContext) -> Self {
        Self { color: !ctx.no_color }
    }

    pub fn good(&self, s: impl AsRef<str>) -> String {
        self.paint(s.as_ref(), |t| t.green().to_string())
    }

    pub fn warn(&self, s: impl AsRef<str>) -> String {
        self.paint(s.as_ref(), |t| t.yellow().to_string())
    }

    pub fn bad(&self, s: impl AsRef<str>) -> String {
        self.paint(s.as_ref(), |t| t.red().to_string())
    }

    pub fn bold(&self, s: impl AsRef<str>) -> String {
        self.paint(s.as_ref(), |t| t.bold().to_string())
    }

    pub fn dim(&self, s: impl AsRef<str>) -> String {
        self.paint(s.as_ref(), |t| t.dimmed().to_string())
    }

    /// Color an entropy score: green when diverse, red when narrow
    pub fn score(&self, entropy: u8) -> String {
        let text = format!("{entropy}/100");
        match entropy {
            70..=100 => self.good(text),
            40..=69 => self.warn(text),
            _ => self.bad(text),
        }
    }

    fn paint(&self, s: &str, f: impl Fn(&str) -> String) -> String {
        if self.color { f(s) } else { s.to_string() }
    }
}
