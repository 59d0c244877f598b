//! Path resolution inside a [`VirtualRoot`].
//!
//! Resolution runs in two stages on every call:
//!
//! 1. Lexical: the request is reduced to a plain relative path without
//!    touching the filesystem. `.` is dropped; any `..` is denied outright;
//!    absolute requests must already sit under the root and are re-expressed
//!    relative to it.
//! 2. Canonical: the candidate `real_dir/relative` is canonicalized (or, for a
//!    path that does not exist yet, its deepest existing ancestor is) and must
//!    land inside the freshly canonicalized root. This catches symlink escapes,
//!    including dangling links that a later write would follow.
//!
//! Every dangling symlink is denied, even one whose missing target would lie
//! inside the root. Its target is not followed lexically.
//!
//! Nothing is cached between calls.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use super::error::SandboxError;
use super::root::VirtualRoot;

/// Resolve `requested` inside `root`, returning a real path guaranteed to be
/// equal to or below the root's directory.
pub async fn resolve(root: &VirtualRoot, requested: &Path) -> Result<PathBuf, SandboxError> {
    let relative = normalize_requested(root, requested)?;

    let root_canonical = match fs::canonicalize(root.real_dir()).await {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!(root = root.id(), error = %e, "virtual root vanished");
            return Err(SandboxError::RootUnavailable {
                root_id: root.id().to_string(),
            });
        }
    };
    if root_canonical != root.real_dir() {
        tracing::warn!(root = root.id(), "virtual root no longer resolves to its bound directory");
        return Err(SandboxError::RootUnavailable {
            root_id: root.id().to_string(),
        });
    }

    let candidate = root_canonical.join(&relative);
    let resolved = canonicalize_existing_prefix(root, requested, &root_canonical, &candidate).await?;

    if resolved.starts_with(&root_canonical) {
        Ok(resolved)
    } else {
        tracing::debug!(root = root.id(), requested = %requested.display(), "canonical form escapes root");
        Err(SandboxError::violation(root.id(), requested))
    }
}

/// Lexically reduce a request to a path relative to `root`.
///
/// An empty result means the root itself.
pub fn normalize_requested(root: &VirtualRoot, requested: &Path) -> Result<PathBuf, SandboxError> {
    let deny = || SandboxError::violation(root.id(), requested);

    if requested
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(deny());
    }

    let relative_source = if requested.has_root() {
        let lexical = normalize_path_lexically(requested);
        let stripped = lexical
            .strip_prefix(root.real_dir())
            .or_else(|_| lexical.strip_prefix(normalize_path_lexically(root.configured_dir())));
        match stripped {
            Ok(rest) => rest.to_path_buf(),
            Err(_) => return Err(deny()),
        }
    } else {
        requested.to_path_buf()
    };

    let mut relative = PathBuf::new();
    for component in relative_source.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(segment) => relative.push(segment),
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return Err(deny()),
        }
    }
    Ok(relative)
}

/// Normalize a path lexically (without filesystem access).
///
/// `.` segments are dropped and `..` pops the previous segment, never the root.
pub fn normalize_path_lexically(path: &Path) -> PathBuf {
    let mut stack = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if stack
                    .last()
                    .is_some_and(|c| matches!(c, Component::Normal(_)))
                {
                    stack.pop();
                }
            }
            c => stack.push(c),
        }
    }

    stack.iter().collect()
}

/// Canonicalize `candidate`, or its deepest existing ancestor plus the missing
/// suffix when the full path does not exist yet.
async fn canonicalize_existing_prefix(
    root: &VirtualRoot,
    requested: &Path,
    root_canonical: &Path,
    candidate: &Path,
) -> Result<PathBuf, SandboxError> {
    let mut ancestor = candidate;
    loop {
        match fs::symlink_metadata(ancestor).await {
            Ok(_) => {
                let canonical = match fs::canonicalize(ancestor).await {
                    Ok(path) => path,
                    // Entry exists but cannot be followed: a dangling symlink.
                    // A write through it would create its target wherever it
                    // points, so it is treated as an escape.
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        return Err(SandboxError::violation(root.id(), requested));
                    }
                    Err(source) => {
                        return Err(SandboxError::Io {
                            root_id: root.id().to_string(),
                            requested: requested.display().to_string(),
                            source,
                        });
                    }
                };
                let suffix = candidate.strip_prefix(ancestor).unwrap_or(Path::new(""));
                return Ok(if suffix.as_os_str().is_empty() {
                    canonical
                } else {
                    canonical.join(suffix)
                });
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                return Err(SandboxError::Io {
                    root_id: root.id().to_string(),
                    requested: requested.display().to_string(),
                    source,
                });
            }
        }

        match ancestor.parent() {
            Some(parent) if parent.starts_with(root_canonical) => ancestor = parent,
            _ => return Err(SandboxError::violation(root.id(), requested)),
        }
    }
}
