//! Pure data types for the tool resolution domain.
//! No I/O, no process execution.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// One way of obtaining a runnable command for a logical tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Command supplied explicitly through the override variable or `--tool`.
    EnvOverride { var: String, command: String },
    /// Bare command name looked up on `$PATH` by the OS.
    OnPath { command: String },
    /// Executable at a path relative to the repository root.
    RepoRelativePath { path: PathBuf },
    /// Script file run through an interpreter.
    InterpretedScript { script: PathBuf, interpreter: String },
}

impl Strategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::EnvOverride { .. } => StrategyKind::EnvOverride,
            Strategy::OnPath { .. } => StrategyKind::OnPath,
            Strategy::RepoRelativePath { .. } => StrategyKind::RepoRelativePath,
            Strategy::InterpretedScript { .. } => StrategyKind::InterpretedScript,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::EnvOverride { var, command } => write!(f, "${} ({})", var, command),
            Strategy::OnPath { command } => write!(f, "{} on $PATH", command),
            Strategy::RepoRelativePath { path } => write!(f, "<repo>/{}", path.display()),
            Strategy::InterpretedScript {
                script,
                interpreter,
            } => write!(f, "{} {}", interpreter, script.display()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    EnvOverride,
    OnPath,
    RepoRelativePath,
    InterpretedScript,
}

/// Resolution failure kinds. Each maps to a fixed process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    MissingDependency,
    VersionMismatch,
}

impl FailureKind {
    pub const ALL: [FailureKind; 3] = [
        FailureKind::NotFound,
        FailureKind::MissingDependency,
        FailureKind::VersionMismatch,
    ];

    pub fn exit_code(self) -> i32 {
        match self {
            FailureKind::NotFound => 128,
            FailureKind::MissingDependency => 129,
            FailureKind::VersionMismatch => 130,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FailureKind::NotFound => "not_found",
            FailureKind::MissingDependency => "missing_dependency",
            FailureKind::VersionMismatch => "version_mismatch",
        }
    }
}

/// What a precondition actually verifies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    /// `<interpreter> -c "import <module>"` must succeed.
    InterpreterImports { module: String },
    /// The script must not carry legacy-syntax markers while the interpreter
    /// reports a version containing `incompatible_version_marker`.
    ScriptMatchesInterpreter {
        legacy_markers: Vec<String>,
        incompatible_version_marker: String,
    },
}

/// A named check run against an already-selected candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Precondition {
    pub name: String,
    pub check: Check,
    pub failure: FailureKind,
}

/// Declarative description of how to find one external tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSpec {
    pub name: String,
    pub override_var: String,
    pub candidates: Vec<Strategy>,
    /// Script file searched for when no candidate is live.
    pub fallback_script: Option<String>,
    pub preconditions: Vec<Precondition>,
}

/// A validated, ready-to-invoke command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedCommand {
    pub tool: String,
    pub strategy: StrategyKind,
    pub program: String,
    pub args: Vec<String>,
    /// Script file run by `program`, when known.
    pub script: Option<PathBuf>,
}

impl ResolvedCommand {
    /// Full argv with `extra` appended.
    pub fn argv(&self, extra: &[String]) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .chain(extra.iter().cloned())
            .collect()
    }
}

impl fmt::Display for ResolvedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv(&[]).join(" "))
    }
}

/// Terminal failure of a resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn exit_code(&self) -> i32 {
        self.kind.exit_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn exit_codes_are_distinct() {
        let codes: Vec<i32> = FailureKind::ALL.iter().map(|k| k.exit_code()).collect();
        assert_eq!(codes, vec![128, 129, 130]);
    }

    #[test]
    fn argv_appends_extra_args() {
        let cmd = ResolvedCommand {
            tool: "clang-format-diff".to_string(),
            strategy: StrategyKind::InterpretedScript,
            program: "python3".to_string(),
            args: vec!["./clang-format-diff.py".to_string()],
            script: Some(PathBuf::from("./clang-format-diff.py")),
        };
        assert_eq!(
            cmd.argv(&["-p1".to_string(), "-i".to_string()]),
            vec!["python3", "./clang-format-diff.py", "-p1", "-i"]
        );
        assert_eq!(cmd.to_string(), "python3 ./clang-format-diff.py");
    }

    #[test]
    fn strategy_display_names_the_source() {
        let s = Strategy::EnvOverride {
            var: "CLANG_FORMAT_DIFF".to_string(),
            command: "cfd".to_string(),
        };
        assert_eq!(s.to_string(), "$CLANG_FORMAT_DIFF (cfd)");
        assert_eq!(s.kind(), StrategyKind::EnvOverride);
    }
}
