//! Shared building blocks for the sluice workspace.
//!
//! - [`state_machine`]: a lock-guarded state cell with closure-based transitions.
//! - [`phase`]: the per-request pipeline lifecycle built on top of it.

pub mod phase;
pub mod state_machine;

pub use phase::{PhaseError, PhaseMachine, PipelineKind, PipelinePhase};
pub use state_machine::StateMachine;
