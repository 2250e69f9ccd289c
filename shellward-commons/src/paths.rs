use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use tracing::warn;

use crate::errors::SandboxError;

/// Normalize a path by resolving `.` and `..` components lexically.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(component.as_os_str()),
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

/// Canonicalize a workspace root, falling back to the lexically normalized
/// absolute path when the directory cannot be canonicalized (for example
/// because it does not exist yet).
pub fn canonicalize_workspace(workspace_root: &Path) -> PathBuf {
    let absolute = if workspace_root.is_absolute() {
        workspace_root.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(workspace_root),
            Err(_) => workspace_root.to_path_buf(),
        }
    };
    let normalized = normalize_path(&absolute);

    std::fs::canonicalize(&normalized).unwrap_or_else(|error| {
        warn!(
            path = %normalized.display(),
            %error,
            "Failed to canonicalize workspace root; falling back to normalized path"
        );
        normalized
    })
}

/// Expand a leading `~` to the current user's home directory.
///
/// Returns `None` for anything that is not `~` or `~/...`, and when the home
/// directory is unknown.
pub fn expand_home(path: &str) -> Option<PathBuf> {
    let rest = path.strip_prefix('~')?;
    if !(rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\')) {
        return None;
    }
    let home = dirs::home_dir()?;
    let rest = rest.trim_start_matches(['/', '\\']);
    Some(if rest.is_empty() { home } else { home.join(rest) })
}

/// Symlinks followed while resolving one path before giving up.
const MAX_SYMLINK_HOPS: usize = 40;

/// Resolve `path` to a canonical absolute form.
///
/// Relative paths are joined to `base`; an empty `base` means the process
/// current directory. Components are walked in order and every symlink is
/// replaced by its target before the next component applies, so `link/..`
/// lands where the shell would land. A tail that does not exist yet is kept
/// as written.
pub fn resolve(path: &Path, base: &Path) -> Result<PathBuf, SandboxError> {
    if path.as_os_str().is_empty() {
        return Err(SandboxError::invalid_path("", "path is empty"));
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else if base.is_absolute() {
        base.join(path)
    } else {
        let cwd = std::env::current_dir().map_err(|error| {
            SandboxError::invalid_path(
                path.display().to_string(),
                format!("cannot determine current directory: {error}"),
            )
        })?;
        cwd.join(base).join(path)
    };

    if !absolute.is_absolute() {
        return Err(SandboxError::invalid_path(
            path.display().to_string(),
            "path cannot be made absolute",
        ));
    }

    let mut hops = 0;
    let physical = walk_components(&absolute, &mut hops)
        .map_err(|reason| SandboxError::invalid_path(path.display().to_string(), reason))?;
    Ok(canonicalize_existing_prefix(&physical))
}

/// Apply components left to right against the real filesystem.
fn walk_components(path: &Path, hops: &mut usize) -> Result<PathBuf, String> {
    let mut current = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => current.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                current.pop();
            }
            Component::Normal(part) => {
                let next = current.join(part);
                current = match std::fs::symlink_metadata(&next) {
                    Ok(metadata) if metadata.file_type().is_symlink() => {
                        follow_symlink(&next, &current, hops)?
                    }
                    _ => next,
                };
            }
        }
    }
    Ok(current)
}

fn follow_symlink(link: &Path, parent: &Path, hops: &mut usize) -> Result<PathBuf, String> {
    *hops += 1;
    if *hops > MAX_SYMLINK_HOPS {
        return Err("too many levels of symbolic links".to_string());
    }
    let target = std::fs::read_link(link)
        .map_err(|error| format!("cannot read symlink {}: {error}", link.display()))?;
    walk_components(&parent.join(target), hops)
}

fn canonicalize_existing_prefix(path: &Path) -> PathBuf {
    let mut existing = path;
    let mut tail: Vec<OsString> = Vec::new();

    loop {
        if let Ok(mut canonical) = std::fs::canonicalize(existing) {
            for part in tail.iter().rev() {
                canonical.push(part);
            }
            return canonical;
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                existing = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}

/// True when `candidate` is `root` itself or lies beneath it.
///
/// Comparison is per component, so `/workspace` does not contain
/// `/workspace-extra`. An empty root means no restriction is configured.
pub fn is_contained(candidate: &Path, root: &Path) -> bool {
    if root.as_os_str().is_empty() {
        return true;
    }
    candidate == root || candidate.starts_with(root)
}

/// Resolve `path` and verify it stays inside `allowed_dir`.
///
/// Relative paths are resolved against `allowed_dir`. With an empty
/// `allowed_dir` the path is only resolved.
pub fn validate_path(path: &Path, allowed_dir: &Path) -> Result<PathBuf, SandboxError> {
    if allowed_dir.as_os_str().is_empty() {
        return resolve(path, Path::new(""));
    }

    let root = canonicalize_workspace(allowed_dir);
    let resolved = resolve(path, &root)?;
    if !is_contained(&resolved, &root) {
        return Err(SandboxError::OutsideWorkspace {
            path: resolved,
            root,
        });
    }
    Ok(resolved)
}
