use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "shellward")]
#[command(about = "Run shell commands inside a guarded workspace sandbox")]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to shellward.toml in the workspace)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Workspace directory commands are confined to
    #[arg(short, long, global = true, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Execute a command through the sandbox and print its output
    Run {
        /// Command line, passed to the shell as a single string
        #[arg(
            required = true,
            num_args = 1..,
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        command: Vec<String>,

        /// Working directory, relative to the workspace
        #[arg(long, value_name = "DIR")]
        working_dir: Option<String>,
    },

    /// Report whether a command would be allowed, without running it
    Check {
        #[arg(
            required = true,
            num_args = 1..,
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        command: Vec<String>,

        #[arg(long, value_name = "DIR")]
        working_dir: Option<String>,
    },

    /// Print the tool declaration as JSON
    Schema,
}
