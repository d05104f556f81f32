//! format-diff - format only what your branch changed
//!
//! Finds a working clang-format-diff, diffs the working tree against the
//! merge-base with the base branch, and pipes that diff into the formatter.

mod adapters;
mod app;
mod config;
mod domain;
mod ports;

use adapters::{FsScriptLocator, Git2Repo, SystemProcessRunner};
use anyhow::{Context, Result};
use app::{App, RunOptions};
use clap::{ArgAction, Parser};
use config::{CliOverrides, Config};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "FORMAT_DIFF_LOG";

#[derive(Parser, Debug)]
#[command(name = "format-diff")]
#[command(about = "Run clang-format-diff over the changes since the merge-base")]
#[command(version)]
struct Args {
    /// Paths to restrict the diff to (default: from config)
    paths: Vec<String>,

    /// Base branch to compare against (default: auto-detect main/master)
    #[arg(short, long)]
    base: Option<String>,

    /// Path to git repository (default: current directory)
    #[arg(short = 'C', long = "repo")]
    repo: Option<PathBuf>,

    /// Formatter command, bypassing discovery (same as $CLANG_FORMAT_DIFF)
    #[arg(long)]
    tool: Option<String>,

    /// Python interpreter for script formatters (same as $PYTHON)
    #[arg(long)]
    python: Option<String>,

    /// Config file (default: <config dir>/format-diff/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only resolve the formatter and print its command line
    #[arg(long)]
    resolve_only: bool,

    /// With --resolve-only, print JSON
    #[arg(long, requires = "resolve_only")]
    json: bool,

    /// Print the diff and command instead of formatting
    #[arg(long)]
    dry_run: bool,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let cli = CliOverrides {
        config_path: args.config.clone(),
        tool: args.tool.clone(),
        python: args.python.clone(),
        base: args.base.clone(),
        paths: args.paths.clone(),
    };
    let config = Config::load(&cli).context("Failed to load configuration")?;

    let git = match &args.repo {
        Some(path) => Git2Repo::open(path),
        None => Git2Repo::open_current_dir(),
    }
    .context("Failed to open git repository. Are you in a git directory?")?;

    let runner = SystemProcessRunner::new(config.probe_timeout);
    let opts = RunOptions {
        resolve_only: args.resolve_only,
        json: args.json,
        dry_run: args.dry_run,
    };

    let mut stdout = io::stdout().lock();
    let code = App::new(&config, &git, &runner, &FsScriptLocator).run(
        opts,
        &mut stdout,
        &mut io::stderr().lock(),
    )?;
    stdout.flush()?;

    std::process::exit(code);
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        let level = match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        EnvFilter::new(format!("format_diff={}", level))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
