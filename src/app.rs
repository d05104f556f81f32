//! Application flow: resolve the formatter, collect the branch diff, hand
//! the diff to the formatter. Uses trait objects for every port.

use crate::config::Config;
use crate::domain::{ResolveContext, ResolvedCommand, Resolver};
use crate::ports::{GitRepo, ProcessRunner, ScriptLocator};
use anyhow::{Context, Result};
use std::io::Write;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Stop after resolution and print the command.
    pub resolve_only: bool,
    /// Print the resolved command as JSON.
    pub json: bool,
    /// Print the command and diff instead of running the formatter.
    pub dry_run: bool,
}

pub struct App<'a> {
    config: &'a Config,
    git: &'a dyn GitRepo,
    runner: &'a dyn ProcessRunner,
    locator: &'a dyn ScriptLocator,
}

impl<'a> App<'a> {
    pub fn new(
        config: &'a Config,
        git: &'a dyn GitRepo,
        runner: &'a dyn ProcessRunner,
        locator: &'a dyn ScriptLocator,
    ) -> Self {
        Self {
            config,
            git,
            runner,
            locator,
        }
    }

    /// Returns the process exit code.
    pub fn run(&self, opts: RunOptions, out: &mut dyn Write, err: &mut dyn Write) -> Result<i32> {
        let repo_root = self.git.workdir()?;
        let ctx = ResolveContext {
            repo_root: repo_root.clone(),
            interpreter: self.config.interpreter.clone(),
            override_command: self.config.override_command.clone(),
        };
        let spec = self.config.tool_spec();
        let catalog = self.config.catalog();

        let resolver = Resolver::new(self.runner, self.locator, &catalog);
        let command = match resolver.resolve(&spec, &ctx) {
            Ok(command) => command,
            Err(failure) => {
                debug!(kind = failure.kind.name(), "could not resolve {}", spec.name);
                writeln!(err, "{}", failure.message)?;
                return Ok(failure.exit_code());
            }
        };

        if opts.resolve_only {
            print_resolved(&command, opts.json, out)?;
            return Ok(0);
        }

        let base = match &self.config.base {
            Some(base) => base.clone(),
            None => self.git.detect_base_branch().unwrap_or_else(|e| {
                warn!(error = %e, "falling back to main");
                "main".to_string()
            }),
        };
        let merge_base = self.git.merge_base(&base)?;
        let branch = self
            .git
            .current_branch()
            .unwrap_or_else(|_| "HEAD".to_string());
        info!(%branch, %base, %merge_base, paths = ?self.config.paths, "collecting diff");

        let diff = self
            .git
            .diff_since(&merge_base, &self.config.paths)
            .with_context(|| format!("Failed to diff {} against {}", branch, base))?;
        if diff.trim().is_empty() {
            info!("no changes to format");
            return Ok(0);
        }

        let extra = self.config.formatter_args();
        if opts.dry_run {
            writeln!(out, "# {}", command.argv(&extra).join(" "))?;
            out.write_all(diff.as_bytes())?;
            return Ok(0);
        }

        let mut args = command.args.clone();
        args.extend(extra);
        self.runner
            .delegate(&command.program, &args, diff.as_bytes(), &repo_root)
    }
}

fn print_resolved(command: &ResolvedCommand, json: bool, out: &mut dyn Write) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, command)?;
        writeln!(out)?;
    } else {
        writeln!(out, "{}", command)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CliOverrides, FileConfig};
    use crate::ports::fakes::{FakeGitRepo, FakeLocator, FakeRunner};
    use crate::ports::ProbeStatus;
    use pretty_assertions::assert_eq;

    const DIFF: &str = "diff --git a/librocksdb_sys/crocksdb/c.cc b/librocksdb_sys/crocksdb/c.cc\n\
                        --- a/librocksdb_sys/crocksdb/c.cc\n\
                        +++ b/librocksdb_sys/crocksdb/c.cc\n\
                        @@ -2 +2 @@\n\
                        -int  x;\n\
                        +int x;\n";

    fn config() -> Config {
        Config::merge(FileConfig::default(), &CliOverrides::default(), |_: &str| None)
    }

    fn live_runner() -> FakeRunner {
        FakeRunner::new()
            .with_probe("clang-format-diff --help", ProbeStatus::Success)
            .with_probe("python3 -c import argparse", ProbeStatus::Success)
    }

    fn run(
        config: &Config,
        git: &FakeGitRepo,
        runner: &FakeRunner,
        opts: RunOptions,
    ) -> (i32, String, String) {
        let locator = FakeLocator::new();
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = App::new(config, git, runner, &locator)
            .run(opts, &mut out, &mut err)
            .unwrap();
        (
            code,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn pipes_diff_into_resolved_formatter() {
        let git = FakeGitRepo::new("/repo").with_diff(DIFF);
        let runner = live_runner();

        let (code, _, _) = run(&config(), &git, &runner, RunOptions::default());

        assert_eq!(code, 0);
        let delegated = runner.delegated.borrow();
        assert_eq!(delegated.len(), 1);
        assert_eq!(delegated[0].0, vec!["clang-format-diff", "-p1", "-i"]);
        assert_eq!(delegated[0].1, DIFF.as_bytes());
        assert_eq!(
            *git.diff_requests.borrow(),
            vec![(
                "abc123".to_string(),
                vec!["librocksdb_sys/crocksdb".to_string()]
            )]
        );
    }

    #[test]
    fn formatter_exit_code_passes_through() {
        let git = FakeGitRepo::new("/repo").with_diff(DIFF);
        let runner = live_runner().with_delegate_code(3);

        let (code, _, _) = run(&config(), &git, &runner, RunOptions::default());

        assert_eq!(code, 3);
    }

    #[test]
    fn resolution_failure_reports_and_exits_with_kind_code() {
        let git = FakeGitRepo::new("/repo").with_diff(DIFF);
        let runner = FakeRunner::new();

        let (code, out, err) = run(&config(), &git, &runner, RunOptions::default());

        assert_eq!(code, 128);
        assert!(out.is_empty());
        assert!(err.starts_with("You didn't have clang-format-diff.py"));
        assert_eq!(err.matches("apt install clang-format").count(), 1);
        assert!(git.diff_requests.borrow().is_empty());
        assert!(runner.delegated.borrow().is_empty());
    }

    #[test]
    fn empty_diff_skips_formatter() {
        let git = FakeGitRepo::new("/repo");
        let runner = live_runner();

        let (code, _, _) = run(&config(), &git, &runner, RunOptions::default());

        assert_eq!(code, 0);
        assert!(runner.delegated.borrow().is_empty());
    }

    #[test]
    fn dry_run_prints_command_and_diff() {
        let git = FakeGitRepo::new("/repo").with_diff(DIFF);
        let runner = live_runner();
        let opts = RunOptions {
            dry_run: true,
            ..RunOptions::default()
        };

        let (code, out, _) = run(&config(), &git, &runner, opts);

        assert_eq!(code, 0);
        assert_eq!(out, format!("# clang-format-diff -p1 -i\n{}", DIFF));
        assert!(runner.delegated.borrow().is_empty());
    }

    #[test]
    fn resolve_only_prints_json() {
        let git = FakeGitRepo::new("/repo").with_diff(DIFF);
        let runner = live_runner();
        let opts = RunOptions {
            resolve_only: true,
            json: true,
            ..RunOptions::default()
        };

        let (code, out, _) = run(&config(), &git, &runner, opts);

        assert_eq!(code, 0);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["program"], "clang-format-diff");
        assert_eq!(value["strategy"], "on_path");
        assert!(git.diff_requests.borrow().is_empty());
    }

    #[test]
    fn configured_base_and_override_are_used() {
        let git = FakeGitRepo::new("/repo").with_diff(DIFF);
        let runner = FakeRunner::new()
            .with_probe("python3 -c import argparse", ProbeStatus::Success);
        let cli = CliOverrides {
            tool: Some("/opt/llvm/bin/clang-format-diff".to_string()),
            base: Some("origin/master".to_string()),
            ..CliOverrides::default()
        };
        let config = Config::merge(FileConfig::default(), &cli, |_: &str| None);

        let (code, _, _) = run(&config, &git, &runner, RunOptions::default());

        assert_eq!(code, 0);
        assert_eq!(
            runner.delegated.borrow()[0].0,
            vec!["/opt/llvm/bin/clang-format-diff", "-p1", "-i"]
        );
        assert!(!runner.calls().iter().any(|c| c.ends_with("--help")));
    }
}
