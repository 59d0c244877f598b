//! # Sluice
//!
//! Two agent pipelines with different privilege levels, joined by one narrow
//! projection boundary.
//!
//! ## Core Guarantees
//!
//! - **Separate state shapes**: operator requests travel as
//!   [`state::PrivilegedState`], customer requests as [`state::SanitizedState`].
//!   The sanitized type has no field that could hold a secret.
//! - **One crossing**: the [`bridge::Bridge`] copies `admin_input` into fresh
//!   sanitized state and nothing else. State of forged provenance is refused
//!   with an error rather than answered.
//! - **Contained file access**: every pipeline touches the filesystem through a
//!   [`worker::ScopedFsWorker`] bound to one [`sandbox::VirtualRoot`]. Paths that
//!   escape the root (`..`, foreign absolute paths, symlinks) are denied.
//! - **Fail closed routing**: when classification fails the supervisor answers
//!   directly instead of delegating.
//!
//! ## Request Flow
//!
//! ```text
//! admin mode: PrivilegedState -> Router -> respond directly (admin root)
//!                                       -> Bridge -> CustomerPipeline (public root)
//! user mode:  SanitizedState  -> CustomerPipeline (public root)
//! ```
//!
//! ## Modules
//!
//! - **`state`**: the two request state types.
//! - **`sandbox`**: virtual roots, the path resolver and the optional Landlock layer.
//! - **`worker`**: read/write/list confined to one virtual root.
//! - **`agent`**: directive extraction and tool execution for one pipeline.
//! - **`classifier`** / **`router`**: routing decision.
//! - **`bridge`**: the projection boundary.
//! - **`pipeline`**: supervisor and customer state machines.
//! - **`model`** / **`retry`**: chat-model collaborators and backoff.
//! - **`config`** / **`runtime`**: startup wiring.
//! - **`shell`**: the `sluice` binary's CLI.

pub mod agent;
pub mod bridge;
pub mod classifier;
pub mod config;
pub mod model;
pub mod pipeline;
pub mod retry;
pub mod router;
pub mod runtime;
pub mod sandbox;
pub mod shell;
pub mod state;
pub mod utils;
pub mod worker;

// Test utilities
pub mod test_utils;

pub use bridge::{Bridge, BridgeError};
pub use config::AppConfig;
pub use runtime::{Runtime, TurnOutcome, TurnPath};
pub use state::{PrivilegedState, SanitizedState};
