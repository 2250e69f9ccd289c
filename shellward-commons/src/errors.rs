use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Category of a compiled command pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    Deny,
    Allow,
}

impl PatternKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deny => "deny",
            Self::Allow => "allow",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures that cross the sandbox boundary as real errors.
///
/// Guard rejections and execution problems (non-zero exit, timeout, spawn
/// failure) are reported as text and never show up here.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("invalid path `{path}`: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("access denied: path `{}` is outside workspace `{}`", path.display(), root.display())]
    OutsideWorkspace { path: PathBuf, root: PathBuf },

    #[error("invalid {kind} pattern `{pattern}`: {source}")]
    InvalidPattern {
        kind: PatternKind,
        pattern: String,
        #[source]
        source: Box<regex::Error>,
    },
}

impl SandboxError {
    pub fn invalid_path(path: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_pattern(kind: PatternKind, pattern: &str, source: regex::Error) -> Self {
        Self::InvalidPattern {
            kind,
            pattern: pattern.to_string(),
            source: Box::new(source),
        }
    }
}
