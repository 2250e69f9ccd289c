//! shellward - guarded shell execution for agents
//!
//! Thin binary entry point that delegates to the CLI handlers.

use anyhow::Result;
use clap::Parser;
use shellward::ExecTool;
use shellward::cli::{self, Cli, Commands};
use shellward::startup::StartupContext;

mod main_helpers;

use main_helpers::{initialize_tracing, initialize_tracing_from_config};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let env_tracing = initialize_tracing();

    let startup = StartupContext::from_cli_args(&args)?;
    if !env_tracing && startup.config.debug.enable_tracing {
        initialize_tracing_from_config(&startup.config.debug);
    }

    let tool = ExecTool::new(startup.sandbox);

    match args.command {
        Commands::Run {
            command,
            working_dir,
        } => cli::handle_run(&tool, &cli::exec_args(&command, working_dir)).await?,
        Commands::Check {
            command,
            working_dir,
        } => {
            if !cli::handle_check(&tool, &cli::exec_args(&command, working_dir)) {
                std::process::exit(1);
            }
        }
        Commands::Schema => cli::handle_schema(&tool)?,
    }

    Ok(())
}
