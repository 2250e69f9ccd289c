use std::fmt;
use std::path::{Path, PathBuf};

use shellward_commons::{expand_home, is_contained, resolve};
use tracing::{debug, warn};

use crate::config::SandboxConfig;

/// Why a command was refused before execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockReason {
    DangerousPattern,
    NotInAllowlist,
    PathTraversal,
    PathOutsideWorkspace,
    WorkspaceUnresolvable,
    WorkingDirOutsideWorkspace,
    InvalidWorkingDir,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::DangerousPattern => {
                "Command blocked by safety guard (dangerous pattern detected)"
            }
            Self::NotInAllowlist => "Command blocked by safety guard (not in allowlist)",
            Self::PathTraversal => "Command blocked by safety guard (path traversal detected)",
            Self::PathOutsideWorkspace => {
                "Command blocked by safety guard (path outside workspace)"
            }
            Self::WorkspaceUnresolvable => {
                "Command blocked by safety guard (cannot resolve workspace path)"
            }
            Self::WorkingDirOutsideWorkspace => "working_dir must be within the workspace",
            Self::InvalidWorkingDir => "invalid working directory path",
        };
        f.write_str(message)
    }
}

/// Outcome of a guard evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardDecision {
    pub allowed: bool,
    pub reason: Option<BlockReason>,
}

impl GuardDecision {
    pub const fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub const fn block(reason: BlockReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }
}

/// Paths that commands may always reference.
const EXEMPT_PATHS: &[&str] = &["/dev/null", "/dev/stdin", "/dev/stdout", "/dev/stderr", "/tmp"];

/// Stateless gatekeeper deciding whether a command may run.
pub struct CommandGuard;

impl CommandGuard {
    /// Evaluate `command` for an invocation running in `cwd`.
    ///
    /// Checks run in order and the first rejection wins: deny rules, the
    /// allowlist, then workspace containment when restriction is enabled.
    pub fn evaluate(command: &str, cwd: &Path, config: &SandboxConfig) -> GuardDecision {
        let trimmed = command.trim();
        let normalized = trimmed.to_lowercase();

        if let Some(rule) = config.deny_patterns().find_match(&normalized) {
            warn!(command = %trimmed, pattern = rule.source(), "Command matched deny rule");
            return GuardDecision::block(BlockReason::DangerousPattern);
        }

        let allow = config.allow_patterns();
        if !allow.is_empty() && allow.find_match(&normalized).is_none() {
            warn!(command = %trimmed, "Command not in allowlist");
            return GuardDecision::block(BlockReason::NotInAllowlist);
        }

        if config.restrict_to_workspace()
            && let Err(reason) = check_workspace(trimmed, cwd, config)
        {
            warn!(command = %trimmed, cwd = %cwd.display(), %reason, "Command blocked");
            return GuardDecision::block(reason);
        }

        debug!(command = %trimmed, "Command allowed");
        GuardDecision::allow()
    }
}

fn check_workspace(command: &str, cwd: &Path, config: &SandboxConfig) -> Result<(), BlockReason> {
    if command.contains("../") || command.contains("..\\") {
        return Err(BlockReason::PathTraversal);
    }

    let boundary = workspace_boundary(cwd, config)?;

    for token in path_tokens(command) {
        if is_exempt(token) {
            continue;
        }
        let Some(candidate) = token_path(token)? else {
            continue;
        };
        let resolved =
            resolve(&candidate, &boundary).map_err(|_| BlockReason::PathOutsideWorkspace)?;
        if !is_contained(&resolved, &boundary) {
            debug!(
                token,
                resolved = %resolved.display(),
                boundary = %boundary.display(),
                "Path token escapes workspace"
            );
            return Err(BlockReason::PathOutsideWorkspace);
        }
    }

    Ok(())
}

fn workspace_boundary(cwd: &Path, config: &SandboxConfig) -> Result<PathBuf, BlockReason> {
    if let Some(root) = config.workspace_root() {
        return Ok(root.to_path_buf());
    }
    if cwd.as_os_str().is_empty() {
        return Err(BlockReason::WorkspaceUnresolvable);
    }
    resolve(cwd, Path::new("")).map_err(|_| BlockReason::WorkspaceUnresolvable)
}

fn is_exempt(token: &str) -> bool {
    EXEMPT_PATHS.contains(&token) || token.starts_with("/tmp/")
}

/// Filesystem path for a token, `None` when the token should be ignored.
fn token_path(token: &str) -> Result<Option<PathBuf>, BlockReason> {
    if token.starts_with('~') {
        return Ok(expand_home(token));
    }
    if is_drive_path(token) && !cfg!(windows) {
        return Err(BlockReason::PathOutsideWorkspace);
    }
    Ok(Some(PathBuf::from(token)))
}

fn is_drive_path(token: &str) -> bool {
    let bytes = token.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && matches!(bytes[2], b'\\' | b'/')
}

/// What the scanner saw just before the current character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Preceding {
    /// Start of input or a character that cannot continue a relative path.
    Separator,
    /// Part of a relative path segment such as `src` in `src/main.rs`.
    Segment,
    /// A `$NAME` expansion, whose value is unknown.
    Variable,
}

impl Preceding {
    fn after(self, c: char) -> Self {
        if c == '$' || (self == Self::Variable && (c.is_alphanumeric() || c == '_')) {
            Self::Variable
        } else if is_segment_char(c) {
            Self::Segment
        } else {
            Self::Separator
        }
    }
}

fn is_segment_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '.' | '_' | '-' | '+' | '@' | '%')
}

/// Ends a shell word.
fn is_word_end(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            '"' | '\'' | '`' | '<' | '>' | '|' | ';' | '&' | '(' | ')' | ',' | '{' | '}'
        )
}

/// Ends a path token. `:` separates `PATH`-style lists.
fn is_path_end(c: char) -> bool {
    is_word_end(c) || c == ':'
}

/// `-o/etc/out`: a one-letter option with its argument attached.
fn follows_short_option(command: &str, start: usize) -> bool {
    command[..start].rsplit(is_word_end).next().is_some_and(|word| {
        let mut chars = word.chars();
        chars.next() == Some('-')
            && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.next().is_none()
    })
}

/// `scheme://host/...`; a third slash (`file:///etc`) is a local path.
fn is_url_remainder(command: &str, start: usize) -> bool {
    let rest = &command[start..];
    command[..start].ends_with(':') && rest.starts_with("//") && !rest.starts_with("///")
}

/// Path-like tokens in `command`: absolute Unix paths, Windows drive paths
/// and home-relative paths.
///
/// A `/` opens a token unless it continues a relative segment, so escapes,
/// braces and variable expansions in front of an absolute path do not hide
/// it. URL authorities and paths are skipped.
fn path_tokens(command: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut preceding = Preceding::Separator;
    let mut chars = command.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        let opens_token = match c {
            '/' => preceding != Preceding::Segment || follows_short_option(command, start),
            '~' => preceding == Preceding::Separator,
            _ => preceding == Preceding::Separator && is_drive_path(&command[start..]),
        };
        if !opens_token {
            preceding = preceding.after(c);
            continue;
        }

        let url = c == '/' && is_url_remainder(command, start);
        if !url && c != '/' && c != '~' {
            // Step over `:\` of the drive prefix.
            chars.next();
            chars.next();
        }

        let mut end = command.len();
        while let Some(&(index, next)) = chars.peek() {
            let stop = if url { is_word_end(next) } else { is_path_end(next) };
            if stop {
                end = index;
                break;
            }
            chars.next();
        }
        if !url {
            tokens.push(&command[start..end]);
        }
        preceding = Preceding::Segment;
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::workspace_dir;
    use assert_fs::TempDir;
    use pretty_assertions::assert_eq;
    use shellward_commons::canonicalize_workspace;

    fn workspace() -> (TempDir, SandboxConfig) {
        let temp = workspace_dir();
        let config = SandboxConfig::new(temp.path()).unwrap();
        (temp, config)
    }

    fn root_of(config: &SandboxConfig) -> PathBuf {
        config.workspace_root().unwrap().to_path_buf()
    }

    fn decide(command: &str, config: &SandboxConfig) -> GuardDecision {
        let cwd = config.workspace_root().map(Path::to_path_buf).unwrap_or_default();
        CommandGuard::evaluate(command, &cwd, config)
    }

    #[test]
    fn extracts_absolute_home_and_drive_tokens() {
        assert_eq!(
            path_tokens("cat /etc/passwd src/main.rs --out=/var/log/x 'C:\\Users\\me' ~/notes"),
            vec!["/etc/passwd", "/var/log/x", "C:\\Users\\me", "~/notes"]
        );
        assert_eq!(path_tokens("ls>/etc/out;cat</etc/in"), vec!["/etc/out", "/etc/in"]);
        assert_eq!(path_tokens("PATH=/opt/bin:/usr/bin make"), vec!["/opt/bin", "/usr/bin"]);
        assert_eq!(path_tokens("gcc -o/etc/out -Isrc/include x.c"), vec!["/etc/out"]);
    }

    #[test]
    fn extracts_paths_behind_escapes_braces_and_variables() {
        for command in [
            "cat \\/etc/hostname",
            "cat {/etc/hostname,}",
            "cat $NOPE/etc/hostname",
            "cat x${NOPE}/etc/hostname",
        ] {
            assert_eq!(path_tokens(command), vec!["/etc/hostname"], "{command}");
        }
        assert_eq!(path_tokens("cat {/srv/a,/etc/b}"), vec!["/srv/a", "/etc/b"]);
    }

    #[test]
    fn skips_urls_but_not_file_urls() {
        assert_eq!(path_tokens("curl https://example.com/a/b"), Vec::<&str>::new());
        assert_eq!(
            path_tokens("git clone https://github.com/org/repo.git ./repo"),
            Vec::<&str>::new()
        );
        assert_eq!(path_tokens("curl file:///etc/passwd"), vec!["///etc/passwd"]);
        assert_eq!(path_tokens("sed -i 's/foo/bar/' notes.txt"), Vec::<&str>::new());
    }

    #[test]
    fn denied_commands_are_blocked_regardless_of_case_or_padding() {
        let (_temp, config) = workspace();
        for command in ["rm -rf /", "  RM -RF /  ", "Shutdown now"] {
            assert_eq!(
                decide(command, &config),
                GuardDecision::block(BlockReason::DangerousPattern)
            );
        }
    }

    #[test]
    fn deny_wins_over_allowlist() {
        let (_temp, config) = workspace();
        config.set_allow_patterns(["^rm "]).unwrap();
        assert_eq!(
            decide("rm -rf build", &config).reason,
            Some(BlockReason::DangerousPattern)
        );
    }

    #[test]
    fn allowlist_restricts_when_configured() {
        let (_temp, config) = workspace();
        assert!(decide("cargo test", &config).is_allowed());

        config.set_allow_patterns(["^git ", "^ls\\b"]).unwrap();
        assert!(decide("git status", &config).is_allowed());
        assert!(decide("LS -la", &config).is_allowed());
        assert_eq!(
            decide("cargo test", &config),
            GuardDecision::block(BlockReason::NotInAllowlist)
        );
    }

    #[test]
    fn paths_inside_workspace_are_allowed() {
        let (_temp, config) = workspace();
        let root = root_of(&config);
        std::fs::write(root.join("notes.txt"), "hi").unwrap();

        let allowed = [
            format!("cat {}", root.join("notes.txt").display()),
            format!("touch {}", root.join("missing/new.txt").display()),
            format!("cat {{{},}}", root.join("notes.txt").display()),
            format!("chmod +x {}", root.join("run.sh").display()),
            "cat notes.txt".to_string(),
            "echo hi > /dev/null".to_string(),
            "ls /tmp/scratch".to_string(),
        ];
        for command in allowed {
            assert!(decide(&command, &config).is_allowed(), "{command}");
        }
    }

    #[test]
    fn paths_outside_workspace_are_blocked() {
        let (_temp, config) = workspace();
        let root = root_of(&config);
        let neighbour = root.parent().unwrap().join("neighbour.txt");

        let blocked = [
            "cat /etc/passwd".to_string(),
            "ls /".to_string(),
            "curl file:///etc/passwd".to_string(),
            "gcc -o/etc/out x.c".to_string(),
            format!("cat {}", neighbour.display()),
            format!("cat {{{},/etc/hostname}}", root.join("notes.txt").display()),
        ];
        for command in blocked {
            assert_eq!(
                decide(&command, &config),
                GuardDecision::block(BlockReason::PathOutsideWorkspace),
                "{command}"
            );
        }
    }

    #[test]
    fn escaped_and_expanded_paths_cannot_leave_the_workspace() {
        let (_temp, config) = workspace();
        for command in [
            "cat \\/etc/hostname",
            "cat {/etc/hostname,}",
            "cat $NOPE/etc/hostname",
            "cat x${NOPE}/etc/hostname",
        ] {
            assert_eq!(
                decide(command, &config).reason,
                Some(BlockReason::PathOutsideWorkspace),
                "{command}"
            );
        }
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_inside_workspace_cannot_escape_it() {
        let (_temp, config) = workspace();
        let root = root_of(&config);
        std::os::unix::fs::symlink("/etc", root.join("link")).unwrap();
        std::fs::create_dir(root.join("src")).unwrap();
        std::os::unix::fs::symlink(root.join("src"), root.join("src-alias")).unwrap();

        for command in [
            format!("cat {}", root.join("link/hostname").display()),
            format!("ls {}/link/..", root.display()),
        ] {
            assert_eq!(
                decide(&command, &config).reason,
                Some(BlockReason::PathOutsideWorkspace),
                "{command}"
            );
        }
        let inside = format!("ls {}", root.join("src-alias/lib.rs").display());
        assert!(decide(&inside, &config).is_allowed());
    }

    #[cfg(unix)]
    #[test]
    fn sibling_directory_with_shared_prefix_is_blocked() {
        let config = SandboxConfig::new("/workspace").unwrap();
        assert!(decide("cat /workspace/notes.txt", &config).is_allowed());
        assert_eq!(
            decide("cat /workspace-extra/file", &config).reason,
            Some(BlockReason::PathOutsideWorkspace)
        );
    }

    #[test]
    fn parent_references_trip_the_traversal_heuristic() {
        let (_temp, config) = workspace();
        assert_eq!(
            decide("cat ../secrets", &config),
            GuardDecision::block(BlockReason::PathTraversal)
        );
        assert_eq!(
            decide("type ..\\secrets", &config).reason,
            Some(BlockReason::PathTraversal)
        );
    }

    #[cfg(not(windows))]
    #[test]
    fn drive_paths_are_never_inside_a_unix_workspace() {
        let (_temp, config) = workspace();
        assert_eq!(
            decide("type C:\\Windows\\win.ini", &config).reason,
            Some(BlockReason::PathOutsideWorkspace)
        );
    }

    #[test]
    fn home_paths_are_resolved() {
        let (_temp, config) = workspace();
        if dirs_home_is_outside(&config) {
            assert_eq!(
                decide("cat ~/.ssh/id_rsa", &config).reason,
                Some(BlockReason::PathOutsideWorkspace)
            );
        }
    }

    fn dirs_home_is_outside(config: &SandboxConfig) -> bool {
        match (expand_home("~"), config.workspace_root()) {
            (Some(home), Some(root)) => !is_contained(&canonicalize_workspace(&home), root),
            _ => false,
        }
    }

    #[test]
    fn unrestricted_config_skips_containment() {
        let config = SandboxConfig::unrestricted().unwrap();
        assert!(CommandGuard::evaluate("cat /etc/hosts", Path::new("/"), &config).is_allowed());
        assert!(CommandGuard::evaluate("cat ../x", Path::new("/"), &config).is_allowed());
    }

    #[test]
    fn missing_root_falls_back_to_cwd() {
        let temp = workspace_dir();
        let cwd = canonicalize_workspace(temp.path());
        let config = SandboxConfig::new("").unwrap();

        let inside = format!("ls {}", cwd.join("src").display());
        assert!(CommandGuard::evaluate(&inside, &cwd, &config).is_allowed());
        assert_eq!(
            CommandGuard::evaluate("cat /etc/hosts", &cwd, &config).reason,
            Some(BlockReason::PathOutsideWorkspace)
        );
        assert_eq!(
            CommandGuard::evaluate("ls", Path::new(""), &config).reason,
            Some(BlockReason::WorkspaceUnresolvable)
        );
    }

    #[test]
    fn evaluation_is_repeatable() {
        let (_temp, config) = workspace();
        for command in ["git status", "cat /etc/passwd", "rm -rf /"] {
            assert_eq!(decide(command, &config), decide(command, &config));
        }
    }

    #[test]
    fn block_reasons_render_guard_messages() {
        assert_eq!(
            BlockReason::PathOutsideWorkspace.to_string(),
            "Command blocked by safety guard (path outside workspace)"
        );
        assert_eq!(
            BlockReason::WorkingDirOutsideWorkspace.to_string(),
            "working_dir must be within the workspace"
        );
    }
}
