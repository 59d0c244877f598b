use std::path::PathBuf;

/// Errors raised while binding virtual roots or resolving paths inside them.
///
/// Variants that can reach a request's caller (`Violation`, `RootUnavailable`,
/// `Io`) only carry the symbolic root id and the caller's own request string.
/// The real directory behind a root is never part of their message.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("access to '{requested}' denied: outside virtual root '{root_id}'")]
    Violation { root_id: String, requested: String },

    #[error("virtual root '{root_id}' is no longer available")]
    RootUnavailable { root_id: String },

    #[error("cannot resolve '{requested}' in virtual root '{root_id}': {source}")]
    Io {
        root_id: String,
        requested: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid virtual root '{id}': {reason}")]
    InvalidRoot { id: String, reason: String },

    #[error("virtual root id '{0}' is configured more than once")]
    DuplicateRootId(String),

    #[error(
        "virtual roots '{first}' ({first_dir:?}) and '{second}' ({second_dir:?}) overlap; \
         roots must be disjoint directories, neither inside the other"
    )]
    OverlappingRoots {
        first: String,
        first_dir: PathBuf,
        second: String,
        second_dir: PathBuf,
    },

    #[error("kernel sandbox unavailable: {0}")]
    KernelSandboxUnavailable(String),
}

impl SandboxError {
    pub(crate) fn violation(root_id: &str, requested: &std::path::Path) -> Self {
        SandboxError::Violation {
            root_id: root_id.to_string(),
            requested: requested.display().to_string(),
        }
    }

    /// True for denials that indicate an attempted boundary breach.
    pub fn is_violation(&self) -> bool {
        matches!(self, SandboxError::Violation { .. })
    }
}
