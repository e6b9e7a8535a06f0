//! CLI definition and the command entry point

use crate::config;
use crate::git;
use crate::pipeline;
use crate::reporters::OutputFormat;
use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;

/// Gitchurn - change churn below the file level
#[derive(Parser, Debug)]
#[command(name = "gitchurn")]
#[command(
    version,
    about = "Calculate change churn below the file level",
    long_about = "Gitchurn walks a repository's history and attributes every added and \
deleted line to the functions, methods, and classes enclosing it, using \
universal-ctags to recover symbol boundaries at each revision.\n\n\
Output is one tab-separated record per (commit, symbol) pair:\n  \
<commit-hash>\\t<churn>\\t<symbol>",
    after_help = "\
Examples:
  gitchurn .                                 Churn for the current repository
  gitchurn /path/to/repo --format json       Machine-readable symbol records
  gitchurn . --max-changes 20                Ignore mass-reformatting commits
  gitchurn . --git-log-arg=-n500             Only the 500 most recent commits

Requires the git and universal-ctags binaries on PATH (or --git-path / --ctags-path)."
)]
pub struct Cli {
    /// Path to the git repository (default: current directory)
    #[arg(default_value = ".")]
    pub repo: PathBuf,

    /// Path to the git binary [default: git]
    #[arg(long)]
    pub git_path: Option<String>,

    /// Path to the universal-ctags binary [default: ctags]
    #[arg(long)]
    pub ctags_path: Option<String>,

    /// Tag output format: human, json [default: human]
    #[arg(long, short = 'f')]
    pub format: Option<String>,

    /// Skip commits touching more than this many files
    #[arg(long)]
    pub max_changes: Option<usize>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Extra argument appended to the fixed `git log` invocation (repeatable)
    #[arg(long = "git-log-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub git_log_args: Vec<String>,
}

impl Cli {
    /// Merge flags with `gitchurn.toml`: flags win, config fills gaps,
    /// built-in defaults last.
    pub fn into_options(self) -> Result<pipeline::Options> {
        let config = config::load(&self.repo)?;
        let format = match self.format.or(config.defaults.format) {
            Some(s) => OutputFormat::from_str(&s)?,
            None => OutputFormat::default(),
        };
        Ok(pipeline::Options {
            repo: self.repo,
            git_bin: self
                .git_path
                .or(config.tools.git_bin)
                .unwrap_or_else(|| "git".to_string()),
            ctags_bin: self
                .ctags_path
                .or(config.tools.ctags_bin)
                .unwrap_or_else(|| "ctags".to_string()),
            format,
            max_changes: self.max_changes.or(config.defaults.max_changes),
            git_log_args: self.git_log_args,
        })
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let options = cli.into_options()?;
    if !git::is_git_repo(&options.git_bin, &options.repo) {
        bail!("{:?} is not inside a git repository", options.repo);
    }
    let stdout = std::io::stdout().lock();
    pipeline::run(&options, stdout)
}
