//! # Scoped Filesystem Worker
//!
//! [`ScopedFsWorker`] is the only component that performs file I/O on behalf
//! of a pipeline. It is bound to one [`VirtualRoot`] when constructed and has
//! no way to be rebound; a different root needs a different worker.
//!
//! Every operation resolves its path through [`sandbox::resolve`] first. A
//! denied path fails with [`WorkerError::SandboxViolation`] before any I/O is
//! attempted. Filesystem failures on an allowed path surface as
//! [`WorkerError::Io`], keyed by the virtual request so the real root stays
//! private.

use std::path::Path;
use tokio::fs;

use crate::sandbox::{self, SandboxError, VirtualRoot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOp {
    Read,
    Write,
    List,
}

impl std::fmt::Display for WorkerOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkerOp::Read => "read",
            WorkerOp::Write => "write",
            WorkerOp::List => "list",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("blocked {op}: {source}")]
    SandboxViolation {
        op: WorkerOp,
        #[source]
        source: SandboxError,
    },

    #[error("{op} '{requested}' failed: {source}")]
    Io {
        op: WorkerOp,
        requested: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{op} '{requested}' failed: {source}")]
    Unavailable {
        op: WorkerOp,
        requested: String,
        #[source]
        source: SandboxError,
    },
}

impl WorkerError {
    pub fn is_sandbox_violation(&self) -> bool {
        matches!(self, WorkerError::SandboxViolation { .. })
    }
}

/// A directory entry as seen from inside the virtual root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Tool-execution unit confined to one virtual root.
#[derive(Debug)]
pub struct ScopedFsWorker {
    root: VirtualRoot,
}

impl ScopedFsWorker {
    pub fn new(root: VirtualRoot) -> Self {
        Self { root }
    }

    pub fn root_id(&self) -> &str {
        self.root.id()
    }

    /// Read a file as UTF-8 text (invalid sequences are replaced).
    pub async fn read(&self, requested: impl AsRef<Path>) -> Result<String, WorkerError> {
        let requested = requested.as_ref();
        let real = self.resolve(WorkerOp::Read, requested).await?;
        let bytes = fs::read(&real)
            .await
            .map_err(|source| self.io_error(WorkerOp::Read, requested, source))?;
        tracing::debug!(root = self.root.id(), path = %requested.display(), bytes = bytes.len(), "read");
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Write `data`, creating missing parent directories inside the root.
    pub async fn write(
        &self,
        requested: impl AsRef<Path>,
        data: impl AsRef<[u8]>,
    ) -> Result<(), WorkerError> {
        let requested = requested.as_ref();
        let real = self.resolve(WorkerOp::Write, requested).await?;
        if let Some(parent) = real.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(WorkerOp::Write, requested, source))?;
        }
        let data = data.as_ref();
        fs::write(&real, data)
            .await
            .map_err(|source| self.io_error(WorkerOp::Write, requested, source))?;
        tracing::debug!(root = self.root.id(), path = %requested.display(), bytes = data.len(), "write");
        Ok(())
    }

    /// List a directory, sorted by name.
    pub async fn list(&self, requested: impl AsRef<Path>) -> Result<Vec<ListedEntry>, WorkerError> {
        let requested = requested.as_ref();
        let real = self.resolve(WorkerOp::List, requested).await?;
        let mut reader = fs::read_dir(&real)
            .await
            .map_err(|source| self.io_error(WorkerOp::List, requested, source))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|source| self.io_error(WorkerOp::List, requested, source))?
        {
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            entries.push(ListedEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn resolve(
        &self,
        op: WorkerOp,
        requested: &Path,
    ) -> Result<std::path::PathBuf, WorkerError> {
        sandbox::resolve(&self.root, requested)
            .await
            .map_err(|source| {
                if source.is_violation() {
                    tracing::warn!(
                        target: "sluice::audit",
                        root = self.root.id(),
                        %op,
                        requested = %requested.display(),
                        "sandbox violation blocked"
                    );
                    WorkerError::SandboxViolation { op, source }
                } else {
                    WorkerError::Unavailable {
                        op,
                        requested: requested.display().to_string(),
                        source,
                    }
                }
            })
    }

    fn io_error(&self, op: WorkerOp, requested: &Path, source: std::io::Error) -> WorkerError {
        WorkerError::Io {
            op,
            requested: requested.display().to_string(),
            source: std::io::Error::new(source.kind(), source.kind().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn worker(temp: &TempDir) -> ScopedFsWorker {
        ScopedFsWorker::new(VirtualRoot::bind("public", temp.path()).unwrap())
    }

    #[tokio::test]
    async fn write_then_read_inside_root() {
        let temp = TempDir::new().unwrap();
        let worker = worker(&temp);
        worker.write("notes/today.md", "pricing v2").await.unwrap();
        assert_eq!(worker.read("notes/today.md").await.unwrap(), "pricing v2");
        assert!(temp.path().join("notes/today.md").exists());
    }

    #[tokio::test]
    async fn list_is_sorted_and_marks_directories() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("b.txt"), "b").unwrap();
        std::fs::create_dir(temp.path().join("a")).unwrap();
        let entries = worker(&temp).list(".").await.unwrap();
        assert_eq!(
            entries,
            vec![
                ListedEntry {
                    name: "a".into(),
                    is_dir: true
                },
                ListedEntry {
                    name: "b.txt".into(),
                    is_dir: false
                },
            ]
        );
    }

    #[tokio::test]
    async fn traversal_write_creates_nothing() {
        let parent = TempDir::new().unwrap();
        let inner = parent.path().join("public");
        std::fs::create_dir(&inner).unwrap();
        let worker = ScopedFsWorker::new(VirtualRoot::bind("public", &inner).unwrap());

        let err = worker.write("../escaped.txt", "x").await.unwrap_err();
        assert!(err.is_sandbox_violation());
        assert!(!parent.path().join("escaped.txt").exists());
    }

    #[tokio::test]
    async fn missing_file_is_io_failure_not_violation() {
        let temp = TempDir::new().unwrap();
        let err = worker(&temp).read("absent.txt").await.unwrap_err();
        assert!(matches!(err, WorkerError::Io { op: WorkerOp::Read, .. }));
        assert!(!err.to_string().contains(&temp.path().display().to_string()));
    }
}
