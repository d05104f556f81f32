//! Configuration record.
//!
//! Built once at startup from defaults, the TOML config file, environment
//! variables and CLI flags (later sources win). Nothing downstream reads the
//! environment.

use crate::domain::{
    python_script_preconditions, FailureKind, RemediationCatalog, Strategy, ToolSpec,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const TOOL_NAME: &str = "clang-format-diff";
pub const DEFAULT_OVERRIDE_VAR: &str = "CLANG_FORMAT_DIFF";
pub const INTERPRETER_VAR: &str = "PYTHON";
pub const DEFAULT_INTERPRETER: &str = "python3";
pub const DEFAULT_FALLBACK_SCRIPT: &str = "clang-format-diff.py";
pub const DEFAULT_PATHS: &[&str] = &["librocksdb_sys/crocksdb"];
pub const DEFAULT_MODULE: &str = "argparse";
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_STRIP: u32 = 1;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// A candidate as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CandidateConfig {
    OnPath {
        command: String,
    },
    RepoRelativePath {
        path: PathBuf,
    },
    InterpretedScript {
        script: PathBuf,
        #[serde(default)]
        interpreter: Option<String>,
    },
}

impl CandidateConfig {
    fn to_strategy(&self, default_interpreter: &str) -> Strategy {
        match self {
            CandidateConfig::OnPath { command } => Strategy::OnPath {
                command: command.clone(),
            },
            CandidateConfig::RepoRelativePath { path } => Strategy::RepoRelativePath {
                path: path.clone(),
            },
            CandidateConfig::InterpretedScript {
                script,
                interpreter,
            } => Strategy::InterpretedScript {
                script: script.clone(),
                interpreter: interpreter
                    .clone()
                    .unwrap_or_else(|| default_interpreter.to_string()),
            },
        }
    }
}

/// Per-kind replacements for the built-in remediation text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemediationOverrides {
    pub not_found: Option<String>,
    pub missing_dependency: Option<String>,
    pub version_mismatch: Option<String>,
}

/// On-disk shape of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub interpreter: Option<String>,
    pub override_var: Option<String>,
    pub candidates: Option<Vec<CandidateConfig>>,
    pub fallback_script: Option<String>,
    pub paths: Option<Vec<String>>,
    pub base: Option<String>,
    pub strip: Option<u32>,
    pub probe_timeout_secs: Option<u64>,
    pub required_module: Option<String>,
    pub remediation: RemediationOverrides,
}

impl FileConfig {
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub tool: Option<String>,
    pub python: Option<String>,
    pub base: Option<String>,
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub interpreter: String,
    pub override_var: String,
    pub override_command: Option<String>,
    pub candidates: Vec<CandidateConfig>,
    pub fallback_script: String,
    pub paths: Vec<String>,
    pub base: Option<String>,
    pub strip: u32,
    pub probe_timeout: Duration,
    pub required_module: String,
    pub remediation: RemediationOverrides,
}

impl Config {
    /// Load from the process environment and the default config location.
    pub fn load(cli: &CliOverrides) -> Result<Self, ConfigError> {
        Self::load_with(cli, |key| std::env::var(key).ok())
    }

    pub fn load_with(
        cli: &CliOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let file = match &cli.config_path {
            Some(path) => FileConfig::read(path)?,
            None => match default_config_path() {
                Some(path) if path.is_file() => FileConfig::read(&path)?,
                _ => FileConfig::default(),
            },
        };
        Ok(Self::merge(file, cli, env))
    }

    pub fn merge(
        file: FileConfig,
        cli: &CliOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let lookup = |key: &str| env(key).and_then(non_empty);

        let override_var = file
            .override_var
            .unwrap_or_else(|| DEFAULT_OVERRIDE_VAR.to_string());
        let override_command = cli
            .tool
            .clone()
            .and_then(non_empty)
            .or_else(|| lookup(&override_var));
        let interpreter = cli
            .python
            .clone()
            .and_then(non_empty)
            .or_else(|| lookup(INTERPRETER_VAR))
            .or(file.interpreter)
            .unwrap_or_else(|| DEFAULT_INTERPRETER.to_string());
        let paths = if cli.paths.is_empty() {
            file.paths
                .unwrap_or_else(|| DEFAULT_PATHS.iter().map(|p| p.to_string()).collect())
        } else {
            cli.paths.clone()
        };

        let config = Self {
            interpreter,
            override_var,
            override_command,
            candidates: file.candidates.unwrap_or_else(default_candidates),
            fallback_script: file
                .fallback_script
                .unwrap_or_else(|| DEFAULT_FALLBACK_SCRIPT.to_string()),
            paths,
            base: cli.base.clone().or(file.base),
            strip: file.strip.unwrap_or(DEFAULT_STRIP),
            probe_timeout: file
                .probe_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_PROBE_TIMEOUT),
            required_module: file
                .required_module
                .unwrap_or_else(|| DEFAULT_MODULE.to_string()),
            remediation: file.remediation,
        };
        debug!(?config, "loaded configuration");
        config
    }

    pub fn tool_spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_NAME.to_string(),
            override_var: self.override_var.clone(),
            candidates: self
                .candidates
                .iter()
                .map(|c| c.to_strategy(&self.interpreter))
                .collect(),
            fallback_script: Some(self.fallback_script.clone()),
            preconditions: python_script_preconditions(&self.required_module),
        }
    }

    pub fn catalog(&self) -> RemediationCatalog {
        let overrides = [
            (FailureKind::NotFound, &self.remediation.not_found),
            (FailureKind::MissingDependency, &self.remediation.missing_dependency),
            (FailureKind::VersionMismatch, &self.remediation.version_mismatch),
        ];
        overrides
            .into_iter()
            .fold(RemediationCatalog::default(), |catalog, (kind, text)| match text {
                Some(text) => catalog.with_template(kind, text.clone()),
                None => catalog,
            })
    }

    /// Arguments appended to the resolved formatter command.
    pub fn formatter_args(&self) -> Vec<String> {
        vec![format!("-p{}", self.strip), "-i".to_string()]
    }
}

fn default_candidates() -> Vec<CandidateConfig> {
    ["clang-format-diff.py", "clang-format-diff"]
        .iter()
        .map(|command| CandidateConfig::OnPath {
            command: command.to_string(),
        })
        .collect()
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("format-diff").join("config.toml"))
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
