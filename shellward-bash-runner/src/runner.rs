use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use shellward_commons::{is_contained, resolve};
use tracing::{debug, warn};

use crate::config::SandboxConfig;
use crate::executor::{
    CommandExecutor, CommandInvocation, ProcessCommandExecutor, ProcessOutcome, ShellKind,
};
use crate::policy::{BlockReason, CommandGuard, GuardDecision};

/// Longest output handed back to the caller, in characters.
pub const MAX_OUTPUT_CHARS: usize = 10_000;

pub const NO_OUTPUT: &str = "(no output)";

/// A single command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub command: String,
    pub working_dir: Option<PathBuf>,
}

impl CommandRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(working_dir.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecStatus {
    Success,
    NonZeroExit(i32),
    TimedOut(Duration),
    Blocked(BlockReason),
    SpawnFailed,
}

/// Text returned to the agent plus how the invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub output: String,
    pub truncated: bool,
    pub status: ExecStatus,
}

impl ExecutionResult {
    fn blocked(reason: BlockReason) -> Self {
        Self {
            output: format!("Error: {reason}"),
            truncated: false,
            status: ExecStatus::Blocked(reason),
        }
    }

    fn timed_out(timeout: Duration) -> Self {
        Self {
            output: format!("Error: Command timed out after {timeout:?}"),
            truncated: false,
            status: ExecStatus::TimedOut(timeout),
        }
    }

    fn spawn_failed(error: &anyhow::Error) -> Self {
        Self {
            output: format!("Error: {error:#}"),
            truncated: false,
            status: ExecStatus::SpawnFailed,
        }
    }

    fn exited(exit_code: i32, stdout: &str, stderr: &str, omitted: usize) -> Self {
        let (output, truncated) =
            truncate_output(render_output(exit_code, stdout, stderr), omitted);
        let status = if exit_code == 0 {
            ExecStatus::Success
        } else {
            ExecStatus::NonZeroExit(exit_code)
        };
        Self {
            output,
            truncated,
            status,
        }
    }
}

/// Guarded, time-bounded command execution.
#[derive(Clone)]
pub struct BoundedExecutor {
    config: Arc<SandboxConfig>,
    executor: Arc<dyn CommandExecutor>,
    shell: ShellKind,
}

impl BoundedExecutor {
    pub fn new(config: Arc<SandboxConfig>) -> Self {
        Self {
            config,
            executor: Arc::new(ProcessCommandExecutor::new()),
            shell: ShellKind::current(),
        }
    }

    /// Swap the process strategy, e.g. for a recording executor in tests.
    pub fn with_executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn config(&self) -> &Arc<SandboxConfig> {
        &self.config
    }

    /// Run `request` to completion. Every failure mode is folded into the
    /// returned text; this never errors.
    pub async fn run(&self, request: &CommandRequest) -> ExecutionResult {
        let working_dir = match self.admit(request) {
            Ok(dir) => dir,
            Err(reason) => return ExecutionResult::blocked(reason),
        };

        let timeout = self.config.timeout();
        let invocation = CommandInvocation::new(self.shell, request.command.as_str(), working_dir)
            .with_timeout(timeout);

        match self.executor.execute(&invocation).await {
            Ok(ProcessOutcome::Exited {
                exit_code,
                stdout,
                stderr,
                omitted,
            }) => ExecutionResult::exited(exit_code, &stdout, &stderr, omitted),
            Ok(ProcessOutcome::TimedOut) => ExecutionResult::timed_out(timeout),
            Err(error) => {
                warn!(
                    command = %request.command,
                    error = %format!("{error:#}"),
                    "Command failed to start"
                );
                ExecutionResult::spawn_failed(&error)
            }
        }
    }

    /// Guard decision for `request` without running it.
    pub fn check(&self, request: &CommandRequest) -> GuardDecision {
        match self.admit(request) {
            Ok(_) => GuardDecision::allow(),
            Err(reason) => GuardDecision::block(reason),
        }
    }

    /// Resolve the working directory and run the guard. Returns the
    /// directory to spawn in.
    fn admit(&self, request: &CommandRequest) -> Result<PathBuf, BlockReason> {
        let working_dir = self
            .working_dir(request.working_dir.as_deref())
            .inspect_err(|reason| {
                warn!(working_dir = ?request.working_dir, %reason, "Rejected working directory");
            })?;

        let decision = CommandGuard::evaluate(&request.command, &working_dir, &self.config);
        match decision.reason {
            Some(reason) => Err(reason),
            None => Ok(working_dir),
        }
    }

    /// Directory the command runs in.
    ///
    /// Explicit directories are resolved against the workspace root (or the
    /// process directory without one) and must stay inside the root when
    /// restriction is on.
    fn working_dir(&self, requested: Option<&Path>) -> Result<PathBuf, BlockReason> {
        let root = self.config.workspace_root();

        let Some(requested) = requested.filter(|dir| !dir.as_os_str().is_empty()) else {
            return match root {
                Some(root) => Ok(root.to_path_buf()),
                None => std::env::current_dir().map_err(|_| BlockReason::InvalidWorkingDir),
            };
        };

        let base = root.unwrap_or_else(|| Path::new(""));
        let resolved = resolve(requested, base).map_err(|_| BlockReason::InvalidWorkingDir)?;

        if self.config.restrict_to_workspace()
            && let Some(root) = root
            && !is_contained(&resolved, root)
        {
            return Err(BlockReason::WorkingDirOutsideWorkspace);
        }

        debug!(working_dir = %resolved.display(), "Resolved working directory");
        Ok(resolved)
    }
}

/// Combine the streams the way the agent sees them.
pub fn render_output(exit_code: i32, stdout: &str, stderr: &str) -> String {
    let mut output = String::from(stdout);
    if !stderr.is_empty() {
        output.push_str("\nSTDERR:\n");
        output.push_str(stderr);
    }
    if exit_code != 0 {
        output.push_str(&format!("\nExit code: {exit_code}"));
    }
    if output.is_empty() {
        output.push_str(NO_OUTPUT);
    }
    output
}

/// Keep the first [`MAX_OUTPUT_CHARS`] characters and note how many were
/// dropped, including `already_omitted` characters discarded while the
/// output was captured.
pub fn truncate_output(output: String, already_omitted: usize) -> (String, bool) {
    let cut = output.char_indices().nth(MAX_OUTPUT_CHARS).map(|(index, _)| index);
    if cut.is_none() && already_omitted == 0 {
        return (output, false);
    }
    let cut = cut.unwrap_or(output.len());
    let omitted = output[cut..].chars().count() + already_omitted;
    let mut kept = output[..cut].to_string();
    kept.push_str(&format!("\n... (truncated, {omitted} more chars)"));
    (kept, true)
}
