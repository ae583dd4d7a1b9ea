//! Shell completion scripts for `fbal`, generated from the clap definition.

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::{Shell as CompletionShell, generate, generate_to};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::cli::{AppContext, Cli, CompletionsArgs, Shell};
use crate::cli_ext::common::Palette;

const BIN_NAME: &str = "fbal";

impl From<Shell> for CompletionShell {
    fn from(shell: Shell) -> Self {
        match shell {
            Shell::Bash => CompletionShell::Bash,
            Shell::Zsh => CompletionShell::Zsh,
            Shell::Fish => CompletionShell::Fish,
            Shell::PowerShell => CompletionShell::PowerShell,
            Shell::Elvish => CompletionShell::Elvish,
        }
    }
}

/// Completion script for `shell` as bytes.
pub fn render(shell: Shell) -> Vec<u8> {
    let mut buf = Vec::new();
    generate(CompletionShell::from(shell), &mut Cli::command(), BIN_NAME, &mut buf);
    buf
}

/// Write the script for `shell` into `dir`, returning the file written.
pub fn write_to_dir(shell: Shell, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    generate_to(CompletionShell::from(shell), &mut Cli::command(), BIN_NAME, dir)
        .with_context(|| format!("write completion script into {}", dir.display()))
}

pub fn run(args: CompletionsArgs, ctx: &AppContext) -> Result<()> {
    match args.out_dir {
        Some(dir) if !args.stdout => {
            let path = write_to_dir(args.shell, &dir)?;
            if !ctx.quiet {
                let p = Palette::new(ctx);
                eprintln!("{} {}", p.good("Wrote completions to"), path.display());
            }
        }
        _ => {
            std::io::stdout()
                .write_all(&render(args.shell))
                .context("write completion script to stdout")?;
        }
    }
    Ok(())
}
