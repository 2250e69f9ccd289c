/// Default values used when a field is absent from `shellward.toml`.
pub mod defaults {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
    pub const DEFAULT_RESTRICT_TO_WORKSPACE: bool = true;
}

/// Config file discovery.
pub mod files {
    pub const CONFIG_FILE_NAME: &str = "shellward.toml";
    pub const CONFIG_DIR_NAME: &str = ".shellward";
}

/// Environment variables consulted by the loader.
pub mod env {
    pub const CONFIG_PATH: &str = "SHELLWARD_CONFIG_PATH";
    pub const WORKSPACE: &str = "SHELLWARD_WORKSPACE";
    pub const ALLOW_PATTERNS: &str = "SHELLWARD_ALLOW_PATTERNS";
    pub const DENY_PATTERNS: &str = "SHELLWARD_DENY_PATTERNS";
}
