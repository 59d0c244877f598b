//! # Virtual Roots and Sandboxed Path Resolution
//!
//! A [`VirtualRoot`] binds a symbolic id (`"admin"`, `"public"`) to a real
//! directory at startup. [`resolve`] maps a requested path to a real path that
//! is guaranteed to be inside that directory, or denies it with
//! [`SandboxError::Violation`].
//!
//! The containment check runs on every access and is independent of what the
//! caller does with the result; see [`crate::worker::ScopedFsWorker`] for the
//! only consumer that performs I/O.
//!
//! On Linux, [`enforce_kernel_sandbox`] can additionally confine the process
//! with Landlock.

mod error;
mod landlock;
mod resolver;
mod root;

pub use error::SandboxError;
pub use landlock::enforce_kernel_sandbox;
pub use resolver::{normalize_path_lexically, normalize_requested, resolve};
pub use root::{VirtualRoot, ensure_disjoint};
