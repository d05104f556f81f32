//! std::process implementation of the ProcessRunner port.

use crate::ports::{CapturedOutput, ProbeError, ProbeStatus, ProcessRunner};
use anyhow::{Context, Result};
use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};
use wait_timeout::ChildExt;

/// How long to wait for pipe output once the child has exited.
/// Grandchildren can keep a pipe open long after the probe exits.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

pub struct SystemProcessRunner {
    timeout: Duration,
}

impl SystemProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn spawn(&self, program: &str, args: &[String], capture: bool) -> Result<Child, ProbeError> {
        let output = || if capture { Stdio::piped() } else { Stdio::null() };
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(output())
            .stderr(output())
            .spawn()
            .map_err(|source| ProbeError::Spawn {
                program: program.to_string(),
                source,
            })
    }

    fn wait(&self, program: &str, child: &mut Child) -> Result<ProbeStatus, ProbeError> {
        let wait_error = |source| ProbeError::Wait {
            program: program.to_string(),
            source,
        };
        match child.wait_timeout(self.timeout) {
            Ok(Some(status)) if status.success() => Ok(ProbeStatus::Success),
            Ok(Some(status)) => Ok(ProbeStatus::Failed(status.code())),
            Ok(None) => {
                let _ = child.kill();
                child.wait().map_err(wait_error)?;
                warn!(program, timeout = ?self.timeout, "probe timed out, killed");
                Ok(ProbeStatus::TimedOut)
            }
            Err(source) => {
                let _ = child.kill();
                Err(wait_error(source))
            }
        }
    }
}

impl ProcessRunner for SystemProcessRunner {
    fn probe(&self, program: &str, args: &[String]) -> Result<ProbeStatus, ProbeError> {
        debug!(program, ?args, "probe");
        let mut child = self.spawn(program, args, false)?;
        self.wait(program, &mut child)
    }

    fn capture(&self, program: &str, args: &[String]) -> Result<CapturedOutput, ProbeError> {
        debug!(program, ?args, "capture");
        let mut child = self.spawn(program, args, true)?;
        // Drain pipes on threads so a chatty child can't block on a full pipe.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);
        let status = self.wait(program, &mut child)?;
        // Never block past the grace period; a reader stuck on a pipe held by
        // a surviving grandchild is abandoned.
        let collect = |rx: Option<Receiver<String>>| {
            rx.and_then(|rx| rx.recv_timeout(DRAIN_GRACE).ok())
                .unwrap_or_default()
        };
        Ok(CapturedOutput {
            status,
            stdout: collect(stdout),
            stderr: collect(stderr),
        })
    }

    fn delegate(&self, program: &str, args: &[String], input: &[u8], cwd: &Path) -> Result<i32> {
        info!(program, ?args, cwd = %cwd.display(), "running formatter");
        let mut child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to execute {}", program))?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(input) {
                // The formatter may exit without reading everything.
                if e.kind() != io::ErrorKind::BrokenPipe {
                    return Err(e).context("Failed to write diff to formatter");
                }
            }
        }

        let status = child
            .wait()
            .with_context(|| format!("Failed waiting for {}", program))?;
        debug!(?status, "formatter exited");
        Ok(status.code().unwrap_or(1))
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}
