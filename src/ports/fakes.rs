//! In-memory port implementations for tests.

use super::{CapturedOutput, GitRepo, ProbeError, ProbeStatus, ProcessRunner, ScriptLocator};
use anyhow::{anyhow, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Records every call. Commands are keyed by their space-joined argv.
#[derive(Default)]
pub struct FakeRunner {
    probes: HashMap<String, ProbeStatus>,
    captures: HashMap<String, CapturedOutput>,
    delegate_code: i32,
    pub calls: RefCell<Vec<String>>,
    pub delegated: RefCell<Vec<(Vec<String>, Vec<u8>)>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_probe(mut self, cmdline: &str, status: ProbeStatus) -> Self {
        self.probes.insert(cmdline.to_string(), status);
        self
    }

    pub fn with_version(mut self, cmdline: &str, stdout: &str, stderr: &str) -> Self {
        self.captures.insert(
            cmdline.to_string(),
            CapturedOutput {
                status: ProbeStatus::Success,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
        );
        self
    }

    pub fn with_delegate_code(mut self, code: i32) -> Self {
        self.delegate_code = code;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn key(program: &str, args: &[String]) -> String {
        std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn not_found(program: &str) -> ProbeError {
        ProbeError::Spawn {
            program: program.to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        }
    }
}

impl ProcessRunner for FakeRunner {
    fn probe(&self, program: &str, args: &[String]) -> Result<ProbeStatus, ProbeError> {
        let key = Self::key(program, args);
        self.calls.borrow_mut().push(key.clone());
        self.probes
            .get(&key)
            .copied()
            .ok_or_else(|| Self::not_found(program))
    }

    fn capture(&self, program: &str, args: &[String]) -> Result<CapturedOutput, ProbeError> {
        let key = Self::key(program, args);
        self.calls.borrow_mut().push(key.clone());
        self.captures
            .get(&key)
            .cloned()
            .ok_or_else(|| Self::not_found(program))
    }

    fn delegate(&self, program: &str, args: &[String], input: &[u8], _cwd: &Path) -> Result<i32> {
        let mut argv = vec![program.to_string()];
        argv.extend(args.iter().cloned());
        self.delegated.borrow_mut().push((argv, input.to_vec()));
        Ok(self.delegate_code)
    }
}

#[derive(Default)]
pub struct FakeLocator {
    files: HashMap<PathBuf, String>,
    on_path: HashMap<String, PathBuf>,
    pub lookups: RefCell<Vec<String>>,
}

impl FakeLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: &str) -> Self {
        self.files.insert(path.into(), contents.to_string());
        self
    }

    pub fn with_on_path(mut self, name: &str, path: impl Into<PathBuf>) -> Self {
        self.on_path.insert(name.to_string(), path.into());
        self
    }
}

impl ScriptLocator for FakeLocator {
    fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn lookup(&self, name: &str) -> Option<PathBuf> {
        self.lookups.borrow_mut().push(name.to_string());
        self.on_path.get(name).cloned()
    }

    fn read_script(&self, path: &Path) -> Option<String> {
        self.files.get(path).cloned()
    }
}

pub struct FakeGitRepo {
    pub workdir: PathBuf,
    pub branch: String,
    pub base: Option<String>,
    pub merge_base: String,
    pub diff: String,
    pub diff_requests: RefCell<Vec<(String, Vec<String>)>>,
}

impl FakeGitRepo {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            branch: "feature".to_string(),
            base: Some("main".to_string()),
            merge_base: "abc123".to_string(),
            diff: String::new(),
            diff_requests: RefCell::new(Vec::new()),
        }
    }

    pub fn with_diff(mut self, diff: &str) -> Self {
        self.diff = diff.to_string();
        self
    }
}

impl GitRepo for FakeGitRepo {
    fn workdir(&self) -> Result<PathBuf> {
        Ok(self.workdir.clone())
    }

    fn current_branch(&self) -> Result<String> {
        Ok(self.branch.clone())
    }

    fn detect_base_branch(&self) -> Result<String> {
        self.base
            .clone()
            .ok_or_else(|| anyhow!("Could not detect base branch"))
    }

    fn merge_base(&self, _base: &str) -> Result<String> {
        Ok(self.merge_base.clone())
    }

    fn diff_since(&self, merge_base_hash: &str, paths: &[String]) -> Result<String> {
        self.diff_requests
            .borrow_mut()
            .push((merge_base_hash.to_string(), paths.to_vec()));
        Ok(self.diff.clone())
    }
}
