//! Shared helpers reused by the shellward crates: lexical and canonical path
//! resolution, workspace containment checks, and the error type surfaced at
//! configuration and invocation boundaries.

pub mod errors;
pub mod paths;

pub use errors::{PatternKind, SandboxError};
pub use paths::{
    canonicalize_workspace, expand_home, is_contained, normalize_path, resolve, validate_path,
};
