use async_trait::async_trait;
use serde_json::Value;
use shellward_commons::SandboxError;
use thiserror::Error;

/// Hard failures at the tool boundary. Anything the agent should read
/// (guard rejections, exit codes, timeouts) is returned as `Ok` text instead.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("malformed invocation: {0}")]
    MalformedInvocation(String),

    #[error(transparent)]
    Sandbox(#[from] SandboxError),
}

/// A capability exposed to the agent.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON schema of the accepted arguments.
    fn parameters(&self) -> Value;

    async fn execute(&self, args: Value) -> Result<String, ToolError>;

    /// Function declaration in the shape LLM providers expect.
    fn declaration(&self) -> Value {
        serde_json::json!({
            "name": self.name(),
            "description": self.description(),
            "parameters": self.parameters(),
        })
    }
}
