//! Subcommand handlers for the `shellward` binary.

mod args;

pub use args::{Cli, Commands};

use anyhow::{Context, Result};

use crate::tools::{ExecArgs, ExecTool, Tool};

pub fn exec_args(command: &[String], working_dir: Option<String>) -> ExecArgs {
    ExecArgs {
        command: command.join(" "),
        working_dir,
    }
}

/// Execute through the tool boundary and print the text the agent would see.
pub async fn handle_run(tool: &ExecTool, args: &ExecArgs) -> Result<()> {
    let value = serde_json::to_value(args).context("Failed to encode exec arguments")?;
    let output = tool.execute(value).await?;
    println!("{output}");
    Ok(())
}

/// Print the guard decision. Returns `false` when the command is blocked.
pub fn handle_check(tool: &ExecTool, args: &ExecArgs) -> bool {
    let decision = tool.check(args);
    match decision.reason {
        Some(reason) => {
            println!("blocked: {reason}");
            false
        }
        None => {
            println!("allowed");
            true
        }
    }
}

pub fn handle_schema(tool: &ExecTool) -> Result<()> {
    let schema = serde_json::to_string_pretty(&tool.declaration())
        .context("Failed to render tool declaration")?;
    println!("{schema}");
    Ok(())
}
