//! Tool resolution.
//!
//! Given a declarative [`ToolSpec`], pick the first live candidate (or the
//! explicit override), then run the tool's preconditions against it. The
//! outcome is terminal: one [`ResolvedCommand`] or one [`Failure`].
//!
//! State machine:
//! `Start -> (override? CheckPreconditions : SearchCandidates)`,
//! `SearchCandidates -> Found | Fallback -> Found | NotFound`,
//! `CheckPreconditions -> Resolved | Failed`.

use super::remediation::{MessageVars, RemediationCatalog};
use super::types::{
    Check, Failure, FailureKind, Precondition, ResolvedCommand, Strategy, StrategyKind, ToolSpec,
};
use crate::ports::{ProcessRunner, ScriptLocator};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Harmless flag used for liveness probes.
const LIVENESS_FLAG: &str = "--help";

/// Inputs that vary per invocation. Built once from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveContext {
    pub repo_root: PathBuf,
    pub interpreter: String,
    pub override_command: Option<String>,
}

/// The preconditions a Python formatter script needs: the interpreter can
/// import `module`, and the script is not Python 2 code facing Python 3.
pub fn python_script_preconditions(module: &str) -> Vec<Precondition> {
    vec![
        Precondition {
            name: "interpreter-has-library".to_string(),
            check: Check::InterpreterImports {
                module: module.to_string(),
            },
            failure: FailureKind::MissingDependency,
        },
        Precondition {
            name: "script-matches-interpreter".to_string(),
            check: Check::ScriptMatchesInterpreter {
                legacy_markers: vec!["print '".to_string(), "print \"".to_string()],
                incompatible_version_marker: "ython 3".to_string(),
            },
            failure: FailureKind::VersionMismatch,
        },
    ]
}

pub struct Resolver<'a> {
    runner: &'a dyn ProcessRunner,
    locator: &'a dyn ScriptLocator,
    catalog: &'a RemediationCatalog,
}

impl<'a> Resolver<'a> {
    pub fn new(
        runner: &'a dyn ProcessRunner,
        locator: &'a dyn ScriptLocator,
        catalog: &'a RemediationCatalog,
    ) -> Self {
        Self {
            runner,
            locator,
            catalog,
        }
    }

    pub fn resolve(
        &self,
        spec: &ToolSpec,
        ctx: &ResolveContext,
    ) -> Result<ResolvedCommand, Failure> {
        let selected = match &ctx.override_command {
            Some(command) => {
                info!(var = %spec.override_var, %command, "using explicit override");
                Strategy::EnvOverride {
                    var: spec.override_var.clone(),
                    command: command.clone(),
                }
            }
            None => self
                .search(spec, ctx)
                .or_else(|| self.fallback(spec, ctx))
                .ok_or_else(|| self.not_found(spec, ctx))?,
        };

        let command =
            build_command(spec, &selected, ctx).ok_or_else(|| self.not_found(spec, ctx))?;
        let interpreter = match &selected {
            Strategy::InterpretedScript { interpreter, .. } => interpreter.as_str(),
            Strategy::EnvOverride { .. } if runs_under(&command.program, &ctx.interpreter) => {
                command.program.as_str()
            }
            _ => ctx.interpreter.as_str(),
        };

        self.check_preconditions(spec, ctx, interpreter, &command)?;

        info!(command = %command, strategy = ?command.strategy, "resolved {}", spec.name);
        Ok(command)
    }

    /// First live candidate in declared order. Later candidates are not probed.
    fn search(&self, spec: &ToolSpec, ctx: &ResolveContext) -> Option<Strategy> {
        spec.candidates
            .iter()
            .find(|candidate| self.is_live(candidate, ctx))
            .cloned()
    }

    fn is_live(&self, candidate: &Strategy, ctx: &ResolveContext) -> bool {
        let live = match candidate {
            Strategy::EnvOverride { command, .. } | Strategy::OnPath { command } => {
                match split_command(command) {
                    Some((program, mut args)) => {
                        args.push(LIVENESS_FLAG.to_string());
                        self.probe_ok(&program, &args)
                    }
                    None => false,
                }
            }
            Strategy::RepoRelativePath { path } => self.probe_ok(
                &path_string(&ctx.repo_root.join(path)),
                &[LIVENESS_FLAG.to_string()],
            ),
            Strategy::InterpretedScript { script, .. } => {
                self.locator.is_file(&ctx.repo_root.join(script))
            }
        };
        debug!(candidate = %candidate, live, "probed candidate");
        live
    }

    /// Look for the fallback script next to the repo, then system-wide.
    fn fallback(&self, spec: &ToolSpec, ctx: &ResolveContext) -> Option<Strategy> {
        let file = spec.fallback_script.as_deref()?;
        let local = ctx.repo_root.join(file);
        let script = if self.locator.is_file(&local) {
            local
        } else {
            self.locator.lookup(file)?
        };
        debug!(script = %script.display(), "found fallback script");
        Some(Strategy::InterpretedScript {
            script,
            interpreter: ctx.interpreter.clone(),
        })
    }

    fn check_preconditions(
        &self,
        spec: &ToolSpec,
        ctx: &ResolveContext,
        interpreter: &str,
        command: &ResolvedCommand,
    ) -> Result<(), Failure> {
        for precondition in &spec.preconditions {
            let passed = self.evaluate(&precondition.check, interpreter, command, ctx);
            debug!(precondition = %precondition.name, passed, "checked precondition");
            if !passed {
                let mut vars = self.vars(spec, ctx, interpreter);
                if let Some(script) = self.interpreted_script(command, ctx) {
                    vars.set("script", path_string(&script));
                }
                if let Check::InterpreterImports { module } = &precondition.check {
                    vars.set("module", module.clone());
                }
                return Err(Failure {
                    kind: precondition.failure,
                    message: self.catalog.render(precondition.failure, &vars),
                });
            }
        }
        Ok(())
    }

    fn evaluate(
        &self,
        check: &Check,
        interpreter: &str,
        command: &ResolvedCommand,
        ctx: &ResolveContext,
    ) -> bool {
        match check {
            Check::InterpreterImports { module } => {
                let Some((program, mut args)) = split_command(interpreter) else {
                    return false;
                };
                args.push("-c".to_string());
                args.push(format!("import {}", module));
                self.probe_ok(&program, &args)
            }
            Check::ScriptMatchesInterpreter {
                legacy_markers,
                incompatible_version_marker,
            } => {
                let Some(text) = self
                    .interpreted_script(command, ctx)
                    .and_then(|script| self.locator.read_script(&script))
                else {
                    return true;
                };
                if !legacy_markers.iter().any(|m| text.contains(m.as_str())) {
                    return true;
                }
                let Some((program, mut args)) = split_command(interpreter) else {
                    return true;
                };
                args.push("--version".to_string());
                match self.runner.capture(&program, &args) {
                    Ok(output) => !output.combined().contains(incompatible_version_marker.as_str()),
                    Err(e) => {
                        debug!(error = %e, "could not query interpreter version");
                        true
                    }
                }
            }
        }
    }

    /// The script the command hands to an interpreter, if it does. Commands
    /// that run on their own (shebang scripts, binaries) have none, so the
    /// version check does not apply to them.
    fn interpreted_script(
        &self,
        command: &ResolvedCommand,
        ctx: &ResolveContext,
    ) -> Option<PathBuf> {
        if let Some(script) = &command.script {
            return Some(script.clone());
        }
        if command.strategy != StrategyKind::EnvOverride
            || !runs_under(&command.program, &ctx.interpreter)
        {
            return None;
        }
        command
            .args
            .iter()
            .map(|arg| ctx.repo_root.join(arg))
            .find(|path| self.locator.is_file(path))
    }

    fn probe_ok(&self, program: &str, args: &[String]) -> bool {
        match self.runner.probe(program, args) {
            Ok(status) => status.success(),
            Err(e) => {
                debug!(error = %e, "probe failed to run");
                false
            }
        }
    }

    fn vars(&self, spec: &ToolSpec, ctx: &ResolveContext, interpreter: &str) -> MessageVars {
        let mut vars = MessageVars::new();
        vars.set("tool", spec.name.clone())
            .set("interpreter", interpreter)
            .set("repo_root", path_string(&ctx.repo_root))
            .set(
                "fallback_script",
                spec.fallback_script.clone().unwrap_or_else(|| spec.name.clone()),
            );
        vars
    }

    fn not_found(&self, spec: &ToolSpec, ctx: &ResolveContext) -> Failure {
        let vars = self.vars(spec, ctx, &ctx.interpreter);
        Failure {
            kind: FailureKind::NotFound,
            message: self.catalog.render(FailureKind::NotFound, &vars),
        }
    }
}

fn build_command(
    spec: &ToolSpec,
    strategy: &Strategy,
    ctx: &ResolveContext,
) -> Option<ResolvedCommand> {
    let (program, args, script) = match strategy {
        Strategy::EnvOverride { command, .. } | Strategy::OnPath { command } => {
            let (program, args) = split_command(command)?;
            (program, args, None)
        }
        Strategy::RepoRelativePath { path } => {
            (path_string(&ctx.repo_root.join(path)), Vec::new(), None)
        }
        Strategy::InterpretedScript {
            script,
            interpreter,
        } => {
            let script = ctx.repo_root.join(script);
            let (program, mut args) = split_command(interpreter)?;
            args.push(path_string(&script));
            (program, args, Some(script))
        }
    };
    Some(ResolvedCommand {
        tool: spec.name.clone(),
        strategy: strategy.kind(),
        program,
        args,
        script,
    })
}

/// Whether `program` is a Python interpreter: the configured one, or any
/// `python*` executable.
fn runs_under(program: &str, interpreter: &str) -> bool {
    let name = |command: &str| {
        Path::new(command)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    };
    let Some(program) = name(program) else {
        return false;
    };
    program.starts_with("python")
        || split_command(interpreter).and_then(|(configured, _)| name(&configured))
            == Some(program)
}

/// Split a command string on whitespace into program and arguments.
fn split_command(command: &str) -> Option<(String, Vec<String>)> {
    let mut parts = command.split_whitespace().map(String::from);
    let program = parts.next()?;
    Some((program, parts.collect()))
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
