use std::sync::Arc;
use std::time::Duration;

use assert_fs::TempDir;
use assert_fs::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use shellward::{ExecTool, Tool, ToolError};
use shellward_bash_runner::SandboxConfig;

/// Workspaces live under the target dir, away from the `/tmp` exemption.
fn workspace() -> TempDir {
    TempDir::new_in(env!("CARGO_TARGET_TMPDIR")).unwrap()
}

fn tool_in(temp: &TempDir) -> ExecTool {
    let config = SandboxConfig::new(temp.path())
        .unwrap()
        .with_timeout(Duration::from_secs(10));
    ExecTool::new(Arc::new(config))
}

#[test]
fn declares_exec_contract() {
    let temp = workspace();
    let tool = tool_in(&temp);

    assert_eq!(tool.name(), "exec");
    assert_eq!(
        tool.description(),
        "Execute a shell command and return its output. Use with caution."
    );
    let parameters = tool.parameters();
    assert_eq!(parameters["required"], json!(["command"]));
    assert_eq!(parameters["properties"]["working_dir"]["type"], "string");
    assert_eq!(tool.declaration()["name"], "exec");
}

#[tokio::test]
async fn malformed_arguments_are_the_only_hard_error() {
    let temp = workspace();
    let tool = tool_in(&temp);

    let error = tool.execute(json!({"working_dir": "."})).await.unwrap_err();
    assert!(matches!(error, ToolError::MalformedInvocation(_)));

    let error = tool.execute(json!({"command": ""})).await.unwrap_err();
    assert!(matches!(error, ToolError::MalformedInvocation(_)));

    let output = tool.execute(json!({"command": "rm -rf /"})).await.unwrap();
    assert_eq!(
        output,
        "Error: Command blocked by safety guard (dangerous pattern detected)"
    );
}

#[tokio::test]
async fn working_dir_outside_workspace_is_refused() {
    let temp = workspace();
    let tool = tool_in(&temp);

    let output = tool
        .execute(json!({"command": "ls", "working_dir": "/"}))
        .await
        .unwrap();
    assert_eq!(output, "Error: working_dir must be within the workspace");
}

#[cfg(unix)]
#[tokio::test]
async fn executes_in_requested_working_dir() {
    let temp = workspace();
    temp.child("pkg/Cargo.toml").write_str("[package]\n").unwrap();
    let tool = tool_in(&temp);

    let output = tool
        .execute(json!({"command": "cat Cargo.toml", "working_dir": "pkg"}))
        .await
        .unwrap();
    assert_eq!(output, "[package]\n");
}

#[cfg(unix)]
#[tokio::test]
async fn absolute_paths_are_checked_against_the_workspace() {
    let temp = workspace();
    temp.child("notes.txt").write_str("kept\n").unwrap();
    let tool = tool_in(&temp);
    let root = tool.config().workspace_root().unwrap().to_path_buf();

    let command = format!("cat {}", root.join("notes.txt").display());
    let output = tool.execute(json!({ "command": command })).await.unwrap();
    assert_eq!(output, "kept\n");

    let outside = root.parent().unwrap().join("neighbour.txt");
    let command = format!("cat {}", outside.display());
    let output = tool.execute(json!({ "command": command })).await.unwrap();
    assert_eq!(output, "Error: Command blocked by safety guard (path outside workspace)");
}

#[cfg(unix)]
#[tokio::test]
async fn allowlist_reconfiguration_is_atomic() {
    let temp = workspace();
    let tool = tool_in(&temp);

    tool.set_allow_patterns(["^echo "]).unwrap();
    let error = tool.set_allow_patterns(["^ls", "(broken"]).unwrap_err();
    assert!(matches!(error, ToolError::Sandbox(_)));

    let output = tool.execute(json!({"command": "echo still"})).await.unwrap();
    assert_eq!(output, "still\n");
    let output = tool.execute(json!({"command": "ls"})).await.unwrap();
    assert_eq!(output, "Error: Command blocked by safety guard (not in allowlist)");
}
