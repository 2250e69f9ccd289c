use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use shellward_bash_runner::{
    BoundedExecutor, CommandRequest, ExecutionResult, GuardDecision, SandboxConfig,
};
use tracing::debug;

use super::traits::{Tool, ToolError};

const TOOL_NAME: &str = "exec";
const TOOL_DESCRIPTION: &str = "Execute a shell command and return its output. Use with caution.";

/// Arguments accepted by [`ExecTool`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExecArgs {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
}

impl ExecArgs {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, working_dir: impl Into<String>) -> Self {
        self.working_dir = Some(working_dir.into());
        self
    }

    /// Parse raw tool arguments. A missing, non-string or blank `command` is
    /// rejected.
    pub fn from_value(value: Value) -> Result<Self, ToolError> {
        let args: Self = serde_json::from_value(value)
            .map_err(|error| ToolError::MalformedInvocation(error.to_string()))?;
        if args.command.trim().is_empty() {
            return Err(ToolError::MalformedInvocation(
                "command must not be empty".to_string(),
            ));
        }
        Ok(args)
    }

    pub fn to_request(&self) -> CommandRequest {
        let request = CommandRequest::new(self.command.as_str());
        match self.working_dir.as_deref().map(str::trim) {
            Some(dir) if !dir.is_empty() => request.with_working_dir(PathBuf::from(dir)),
            _ => request,
        }
    }
}

/// The `exec` tool: guarded shell execution confined to a workspace.
#[derive(Clone)]
pub struct ExecTool {
    executor: BoundedExecutor,
}

impl ExecTool {
    pub fn new(config: Arc<SandboxConfig>) -> Self {
        Self::with_executor(BoundedExecutor::new(config))
    }

    pub fn with_executor(executor: BoundedExecutor) -> Self {
        Self { executor }
    }

    pub fn config(&self) -> &Arc<SandboxConfig> {
        self.executor.config()
    }

    /// Replace the allowlist. On error the previous allowlist stays active.
    pub fn set_allow_patterns<I, S>(&self, patterns: I) -> Result<(), ToolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config().set_allow_patterns(patterns)?;
        Ok(())
    }

    pub async fn run(&self, args: &ExecArgs) -> ExecutionResult {
        self.executor.run(&args.to_request()).await
    }

    pub fn check(&self, args: &ExecArgs) -> GuardDecision {
        self.executor.check(&args.to_request())
    }
}

#[async_trait]
impl Tool for ExecTool {
    fn name(&self) -> &'static str {
        TOOL_NAME
    }

    fn description(&self) -> &'static str {
        TOOL_DESCRIPTION
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                },
                "working_dir": {
                    "type": "string",
                    "description": "Optional working directory for the command"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let args = ExecArgs::from_value(args)?;
        let result = self.run(&args).await;
        debug!(status = ?result.status, truncated = result.truncated, "exec finished");
        Ok(result.output)
    }
}
