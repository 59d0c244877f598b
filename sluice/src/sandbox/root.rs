use std::path::{Path, PathBuf};

use super::error::SandboxError;

/// A symbolic root id bound to one real directory for the process lifetime.
///
/// The directory is canonicalized when bound. [`super::resolve`] re-checks it
/// on every access, so swapping the directory for a symlink later is caught.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualRoot {
    id: String,
    configured_dir: PathBuf,
    real_dir: PathBuf,
}

impl VirtualRoot {
    /// Bind `id` to `dir`.
    ///
    /// Rejects empty ids, the empty path, the filesystem root (`/`) and
    /// anything that is not an existing directory.
    pub fn bind(id: impl Into<String>, dir: impl AsRef<Path>) -> Result<Self, SandboxError> {
        let id = id.into();
        let dir = dir.as_ref();

        if id.is_empty()
            || !id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(SandboxError::InvalidRoot {
                id,
                reason: "ids must be non-empty and use only [A-Za-z0-9_-]".to_string(),
            });
        }

        if dir.as_os_str().is_empty() || dir == Path::new("/") {
            return Err(SandboxError::InvalidRoot {
                id,
                reason: "root '/' or an empty path is not a valid virtual root".to_string(),
            });
        }

        let real_dir = std::fs::canonicalize(dir).map_err(|e| SandboxError::InvalidRoot {
            id: id.clone(),
            reason: format!("failed to canonicalize '{}': {}", dir.display(), e),
        })?;

        if real_dir == Path::new("/") {
            return Err(SandboxError::InvalidRoot {
                id,
                reason: format!("'{}' resolves to '/'", dir.display()),
            });
        }

        if !real_dir.is_dir() {
            return Err(SandboxError::InvalidRoot {
                id,
                reason: format!("'{}' is not a directory", dir.display()),
            });
        }

        Ok(Self {
            id,
            configured_dir: dir.to_path_buf(),
            real_dir,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Canonical directory captured at bind time.
    pub fn real_dir(&self) -> &Path {
        &self.real_dir
    }

    /// The directory as written in configuration (may contain symlinks).
    pub fn configured_dir(&self) -> &Path {
        &self.configured_dir
    }
}

/// Startup check: ids are unique and no two roots share or nest directories.
pub fn ensure_disjoint(roots: &[VirtualRoot]) -> Result<(), SandboxError> {
    for (i, first) in roots.iter().enumerate() {
        for second in &roots[i + 1..] {
            if first.id == second.id {
                return Err(SandboxError::DuplicateRootId(first.id.clone()));
            }
            if first.real_dir.starts_with(&second.real_dir)
                || second.real_dir.starts_with(&first.real_dir)
            {
                return Err(SandboxError::OverlappingRoots {
                    first: first.id.clone(),
                    first_dir: first.real_dir.clone(),
                    second: second.id.clone(),
                    second_dir: second.real_dir.clone(),
                });
            }
        }
    }
    Ok(())
}
