mod config;
mod manager;

pub use config::ShellwardConfig;
pub use manager::ConfigManager;
