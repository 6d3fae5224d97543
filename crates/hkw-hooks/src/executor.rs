//! Sequential hook execution with timeouts and fail-mode handling.

use crate::definition::{HookAction, HookDefinition};
use crate::env::HookVariables;
use crate::path_guard::PathValidator;
use crate::process::{OutputCapture, isolate_process_group, terminate_process_tree};
use crate::summary::ExecutionSummary;
use chrono::{DateTime, Utc};
use hkw_audit::LoggerError;
use hkw_core::{Event, ExecutionFailure, ExecutionResult, FailMode, HookOutcome};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(20);
/// How long to keep draining pipes after the process is gone.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Receives each result as soon as its hook finishes.
///
/// An `Err` stops the sequence: an execution that cannot be recorded must
/// not be reported as having happened.
pub trait ResultSink {
    fn record(
        &self,
        hook: &HookDefinition,
        event: &Event,
        result: &ExecutionResult,
    ) -> Result<(), LoggerError>;
}

impl<F> ResultSink for F
where
    F: Fn(&HookDefinition, &Event, &ExecutionResult) -> Result<(), LoggerError>,
{
    fn record(
        &self,
        hook: &HookDefinition,
        event: &Event,
        result: &ExecutionResult,
    ) -> Result<(), LoggerError> {
        self(hook, event, result)
    }
}

/// Runs hook actions as child processes rooted at the project directory.
#[derive(Debug, Clone)]
pub struct HookExecutor {
    project_root: PathBuf,
    validator: PathValidator,
}

impl HookExecutor {
    pub fn new(project_root: impl Into<PathBuf>, validator: PathValidator) -> Self {
        Self {
            project_root: project_root.into(),
            validator,
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn validator(&self) -> &PathValidator {
        &self.validator
    }

    /// Run `hooks` for `event` in order.
    ///
    /// In a dry run nothing is spawned and `sink` is never called. Otherwise
    /// every attempted hook is handed to `sink` before the next one starts,
    /// and a failing `stop` hook ends the sequence; the hooks after it are
    /// neither run nor recorded.
    pub fn execute(
        &self,
        event: &Event,
        hooks: &[&HookDefinition],
        dry_run: bool,
        sink: &dyn ResultSink,
    ) -> Result<ExecutionSummary, LoggerError> {
        let matched = hooks.iter().map(|h| h.name.clone()).collect();
        let mut summary = ExecutionSummary::new(event.clone(), matched, dry_run);

        for (index, hook) in hooks.iter().enumerate() {
            if dry_run {
                debug!(hook = %hook.name, action = %hook.action, "Dry run, not executing");
                summary.results.push(ExecutionResult::would_execute(
                    &hook.name,
                    event,
                    &hook.action.to_string(),
                ));
                continue;
            }

            let result = self.run(hook, event);
            sink.record(hook, event, &result)?;
            let failed = result.outcome.is_failure();
            summary.results.push(result);

            if failed && hook.fail_mode == FailMode::Stop {
                summary.aborted_by = Some(hook.name.clone());
                summary.skipped = hooks[index + 1..].iter().map(|h| h.name.clone()).collect();
                warn!(
                    hook = %hook.name,
                    event_type = %event.event_type,
                    skipped = summary.skipped.len(),
                    "Stop-mode hook failed, aborting remaining hooks"
                );
                break;
            }
        }
        Ok(summary)
    }

    /// Run one hook to completion or timeout. Never fails: every problem is
    /// folded into the returned result.
    pub fn run(&self, hook: &HookDefinition, event: &Event) -> ExecutionResult {
        let timestamp = Utc::now();
        let start = Instant::now();

        let mut cmd = match self.command_for(hook, event) {
            Ok(cmd) => cmd,
            Err(failure) => {
                return finish(hook, event, timestamp, start, Err(failure), None, String::new(), String::new());
            }
        };
        cmd.current_dir(&self.project_root)
            .envs(HookVariables::new(event, hook, &self.project_root).environment())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        isolate_process_group(&mut cmd);

        debug!(hook = %hook.name, event_type = %event.event_type, action = %hook.action, "Executing hook");
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let failure = ExecutionFailure::Spawn {
                    hook: hook.name.clone(),
                    message: e.to_string(),
                };
                return finish(hook, event, timestamp, start, Err(failure), None, String::new(), String::new());
            }
        };
        let stdout = OutputCapture::spawn(child.stdout.take(), "stdout");
        let stderr = OutputCapture::spawn(child.stderr.take(), "stderr");

        let outcome = loop {
            match child.try_wait() {
                Ok(Some(status)) => break exit_outcome(hook, status),
                Ok(None) => {
                    let elapsed = start.elapsed();
                    if elapsed >= hook.timeout {
                        terminate_process_tree(&mut child);
                        break Err(ExecutionFailure::TimedOut {
                            hook: hook.name.clone(),
                            timeout: hook.timeout,
                        });
                    }
                    std::thread::sleep(POLL_INTERVAL.min(hook.timeout - elapsed));
                }
                Err(e) => {
                    terminate_process_tree(&mut child);
                    break Err(ExecutionFailure::Spawn {
                        hook: hook.name.clone(),
                        message: format!("failed to wait for process: {e}"),
                    });
                }
            }
        };

        let deadline = Instant::now() + DRAIN_GRACE;
        let (stdout, stdout_complete) = stdout.finish(deadline);
        let (stderr, stderr_complete) = stderr.finish(deadline);
        if !(stdout_complete && stderr_complete) {
            warn!(hook = %hook.name, "Output pipes still held open by a detached process; stopped reading, output may be incomplete");
        }

        let exit_code = match &outcome {
            Ok(code) => Some(*code),
            Err(ExecutionFailure::NonZeroExit { code, .. }) => Some(*code),
            Err(_) => None,
        };
        finish(hook, event, timestamp, start, outcome.map(|_| ()), exit_code, stdout, stderr)
    }

    fn command_for(&self, hook: &HookDefinition, event: &Event) -> Result<Command, ExecutionFailure> {
        match &hook.action {
            HookAction::Command(template) => {
                let vars = HookVariables::new(event, hook, &self.project_root);
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(vars.render_command(template));
                Ok(cmd)
            }
            HookAction::Script(relative) => {
                let path = self
                    .validator
                    .validate(relative)
                    .map_err(|source| ExecutionFailure::Rejected {
                        hook: hook.name.clone(),
                        source,
                    })?;
                Ok(script_command(&path))
            }
        }
    }
}

/// Executable scripts run directly (honouring their shebang); others
/// through `sh`.
fn script_command(path: &Path) -> Command {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let executable = std::fs::metadata(path)
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false);
        if executable {
            return Command::new(path);
        }
    }
    let mut cmd = Command::new("sh");
    cmd.arg(path);
    cmd
}

fn exit_outcome(hook: &HookDefinition, status: ExitStatus) -> Result<i32, ExecutionFailure> {
    match status.code() {
        Some(0) => Ok(0),
        Some(code) => Err(ExecutionFailure::NonZeroExit {
            hook: hook.name.clone(),
            code,
        }),
        None => Err(ExecutionFailure::Signaled {
            hook: hook.name.clone(),
        }),
    }
}

#[allow(clippy::too_many_arguments)]
fn finish(
    hook: &HookDefinition,
    event: &Event,
    timestamp: DateTime<Utc>,
    start: Instant,
    outcome: Result<(), ExecutionFailure>,
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
) -> ExecutionResult {
    let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    let (status, error) = match outcome {
        Ok(()) => (HookOutcome::Succeeded, None),
        Err(failure) => (failure.outcome(), Some(failure.to_string())),
    };

    match &error {
        None => info!(hook = %hook.name, event_type = %event.event_type, duration_ms, "Hook succeeded"),
        Some(error) => warn!(
            hook = %hook.name,
            event_type = %event.event_type,
            fail_mode = %hook.fail_mode,
            duration_ms,
            error = %error,
            "Hook failed"
        ),
    }

    ExecutionResult {
        hook_name: hook.name.clone(),
        event_type: event.event_type.clone(),
        event_id: event.id,
        outcome: status,
        success: status == HookOutcome::Succeeded,
        exit_code,
        duration_ms,
        stdout,
        stderr,
        error,
        timestamp,
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
