//! Process runner port (trait).
//! Every external process the tool starts goes through here, so tests can
//! swap in a fake.

use anyhow::Result;
use std::path::Path;
use thiserror::Error;

/// How a probe process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    Success,
    /// Non-zero exit; `None` when killed by a signal.
    Failed(Option<i32>),
    TimedOut,
}

impl ProbeStatus {
    pub fn success(self) -> bool {
        self == ProbeStatus::Success
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    pub status: ProbeStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CapturedOutput {
    /// Stdout followed by stderr. Python 2 prints `--version` to stderr.
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

pub trait ProcessRunner {
    /// Run a side-effect-free probe: stdin empty, output discarded, bounded
    /// by the runner's timeout.
    fn probe(&self, program: &str, args: &[String]) -> Result<ProbeStatus, ProbeError>;

    /// Like `probe`, but keep stdout and stderr.
    fn capture(&self, program: &str, args: &[String]) -> Result<CapturedOutput, ProbeError>;

    /// Run the real command to completion with `input` on stdin and the
    /// caller's stdout/stderr. Returns its exit code.
    fn delegate(&self, program: &str, args: &[String], input: &[u8], cwd: &Path) -> Result<i32>;
}
