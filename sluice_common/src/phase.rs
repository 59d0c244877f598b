//! Per-request pipeline lifecycle.
//!
//! Both pipelines are small state machines that run exactly once per request:
//!
//! ```text
//! Supervisor: Start -> Deciding -> Executing -> Done
//! Customer:   Start -> Executing -> Done
//! ```
//!
//! `Done` is terminal. Any other edge (skipping `Deciding` in the supervisor,
//! deciding in the customer pipeline, re-entering a finished pipeline) is a
//! [`PhaseError`].

use crate::state_machine::StateMachine;
use std::fmt;

/// Which pipeline a [`PhaseMachine`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    Supervisor,
    Customer,
}

impl PipelineKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineKind::Supervisor => "supervisor",
            PipelineKind::Customer => "customer",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelinePhase {
    Start,
    /// Router is running. Supervisor only.
    Deciding,
    Executing,
    Done,
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelinePhase::Start => "start",
            PipelinePhase::Deciding => "deciding",
            PipelinePhase::Executing => "executing",
            PipelinePhase::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhaseError {
    #[error("{kind} pipeline cannot move from '{from}' to '{to}'")]
    IllegalTransition {
        kind: PipelineKind,
        from: PipelinePhase,
        to: PipelinePhase,
    },

    #[error("{kind} pipeline already finished")]
    AlreadyDone { kind: PipelineKind },
}

impl PipelineKind {
    fn allows(self, from: PipelinePhase, to: PipelinePhase) -> bool {
        use PipelinePhase::*;
        match self {
            PipelineKind::Supervisor => matches!(
                (from, to),
                (Start, Deciding) | (Deciding, Executing) | (Executing, Done)
            ),
            PipelineKind::Customer => matches!((from, to), (Start, Executing) | (Executing, Done)),
        }
    }
}

/// Lifecycle tracker for a single pipeline run.
#[derive(Debug)]
pub struct PhaseMachine {
    kind: PipelineKind,
    phase: StateMachine<PipelinePhase>,
}

impl PhaseMachine {
    pub fn new(kind: PipelineKind) -> Self {
        Self {
            kind,
            phase: StateMachine::new(PipelinePhase::Start),
        }
    }

    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    pub fn current(&self) -> PipelinePhase {
        *self.phase.lock()
    }

    pub fn is_done(&self) -> bool {
        self.current() == PipelinePhase::Done
    }

    /// Move to `to`, or report why the edge is not part of this pipeline.
    pub fn advance(&self, to: PipelinePhase) -> Result<(), PhaseError> {
        let kind = self.kind;
        self.phase.transition(|phase| {
            if *phase == PipelinePhase::Done {
                return Err(PhaseError::AlreadyDone { kind });
            }
            if !kind.allows(*phase, to) {
                return Err(PhaseError::IllegalTransition {
                    kind,
                    from: *phase,
                    to,
                });
            }
            *phase = to;
            Ok(())
        })
    }
}
