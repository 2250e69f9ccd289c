//! Sandbox configuration shared by the guard and the executor.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use regex::{Regex, RegexBuilder};
use shellward_commons::{PatternKind, SandboxError, canonicalize_workspace};
use tracing::debug;

use crate::patterns::DEFAULT_DENY_PATTERNS;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A compiled allow or deny rule.
#[derive(Debug, Clone)]
pub struct PatternRule {
    kind: PatternKind,
    source: String,
    regex: Regex,
}

impl PatternRule {
    pub fn compile(kind: PatternKind, source: &str) -> Result<Self, SandboxError> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(true)
            .build()
            .map_err(|error| SandboxError::invalid_pattern(kind, source, error))?;
        Ok(Self {
            kind,
            source: source.to_string(),
            regex,
        })
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, command: &str) -> bool {
        self.regex.is_match(command)
    }
}

/// Ordered rules of a single kind.
#[derive(Debug, Clone)]
pub struct PatternSet {
    kind: PatternKind,
    rules: Vec<PatternRule>,
}

impl PatternSet {
    pub fn empty(kind: PatternKind) -> Self {
        Self {
            kind,
            rules: Vec::new(),
        }
    }

    /// Compile every source; the first invalid one fails the whole set.
    pub fn compile<I, S>(kind: PatternKind, sources: I) -> Result<Self, SandboxError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = sources
            .into_iter()
            .map(|source| PatternRule::compile(kind, source.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { kind, rules })
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// First rule matching `command`, if any.
    pub fn find_match(&self, command: &str) -> Option<&PatternRule> {
        self.rules.iter().find(|rule| rule.is_match(command))
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(PatternRule::source)
    }

    fn extend(&mut self, other: Self) {
        self.rules.extend(other.rules);
    }
}

/// Immutable sandbox settings. Only the allowlist can change after
/// construction, and only by swapping in a fully compiled replacement.
#[derive(Debug)]
pub struct SandboxConfig {
    workspace_root: Option<PathBuf>,
    timeout: Duration,
    restrict_to_workspace: bool,
    deny: PatternSet,
    allow: RwLock<Arc<PatternSet>>,
}

impl SandboxConfig {
    /// Build a configuration confined to `workspace_root`.
    ///
    /// The root is canonicalized once here. An empty path configures no
    /// root, in which case containment falls back to each invocation's
    /// working directory.
    pub fn new(workspace_root: impl AsRef<Path>) -> Result<Self, SandboxError> {
        let workspace_root = workspace_root.as_ref();
        let workspace_root = (!workspace_root.as_os_str().is_empty())
            .then(|| canonicalize_workspace(workspace_root));

        Ok(Self {
            workspace_root,
            timeout: DEFAULT_TIMEOUT,
            restrict_to_workspace: true,
            deny: PatternSet::compile(PatternKind::Deny, DEFAULT_DENY_PATTERNS)?,
            allow: RwLock::new(Arc::new(PatternSet::empty(PatternKind::Allow))),
        })
    }

    /// Configuration without a workspace root.
    pub fn unrestricted() -> Result<Self, SandboxError> {
        Ok(Self::new("")?.with_restrict_to_workspace(false))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_restrict_to_workspace(mut self, restrict: bool) -> Self {
        self.restrict_to_workspace = restrict;
        self
    }

    /// Append rules to the built-in blocklist.
    pub fn with_extra_deny_patterns<I, S>(mut self, patterns: I) -> Result<Self, SandboxError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extra = PatternSet::compile(PatternKind::Deny, patterns)?;
        self.deny.extend(extra);
        Ok(self)
    }

    pub fn with_allow_patterns<I, S>(self, patterns: I) -> Result<Self, SandboxError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set_allow_patterns(patterns)?;
        Ok(self)
    }

    /// Replace the allowlist. The new set is compiled before the swap, so a
    /// bad pattern leaves the current allowlist untouched.
    pub fn set_allow_patterns<I, S>(&self, patterns: I) -> Result<(), SandboxError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let compiled = Arc::new(PatternSet::compile(PatternKind::Allow, patterns)?);
        debug!(rules = compiled.len(), "Replacing command allowlist");
        *self.allow.write() = compiled;
        Ok(())
    }

    /// Snapshot of the current allowlist.
    pub fn allow_patterns(&self) -> Arc<PatternSet> {
        self.allow.read().clone()
    }

    pub fn deny_patterns(&self) -> &PatternSet {
        &self.deny
    }

    pub fn workspace_root(&self) -> Option<&Path> {
        self.workspace_root.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn restrict_to_workspace(&self) -> bool {
        self.restrict_to_workspace
    }
}
