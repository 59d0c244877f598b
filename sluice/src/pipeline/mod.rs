//! # Pipelines
//!
//! Two pipelines with non-overlapping state types:
//!
//! - [`SupervisorPipeline`] runs on [`PrivilegedState`](crate::state::PrivilegedState):
//!   `start → deciding → executing → done`. It owns the router, the admin
//!   agent and the only [`Bridge`](crate::bridge::Bridge).
//! - [`CustomerPipeline`] runs on [`SanitizedState`]: `start → executing → done`.
//!   It owns the public agent and nothing that can see privileged data.
//!
//! Each `run` call drives a fresh [`PhaseMachine`](sluice_common::PhaseMachine),
//! so no per-request mutable state is shared between concurrent runs.

mod customer;
mod supervisor;

pub use customer::CustomerPipeline;
pub use supervisor::SupervisorPipeline;

use sluice_common::PhaseError;

use crate::bridge::BridgeError;
use crate::model::ModelError;
use crate::state::{Route, SanitizedState, StateError};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("response collaborator failed: {0}")]
    Model(#[from] ModelError),

    #[error(transparent)]
    Phase(#[from] PhaseError),

    #[error(transparent)]
    State(#[from] StateError),
}

/// Result of a customer pipeline run. `state.response()` is always set.
#[derive(Debug)]
pub struct CustomerOutcome {
    pub state: SanitizedState,
    pub blocked_actions: usize,
}

impl CustomerOutcome {
    pub fn response(&self) -> &str {
        self.state.response().unwrap_or_default()
    }
}

/// Result of a supervisor pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorOutcome {
    pub route: Route,
    pub response: String,
    pub blocked_actions: usize,
    /// The classifier failed and the request was answered directly.
    pub classification_failed: bool,
}
