use sluice_common::{PhaseMachine, PipelineKind, PipelinePhase};

use super::{PipelineError, SupervisorOutcome};
use crate::agent::ScopedAgent;
use crate::bridge::Bridge;
use crate::router::Router;
use crate::state::{PrivilegedState, Route, StateError};

const EMPTY_INPUT_RESPONSE: &str = "Empty admin input.";

/// Operator-facing pipeline.
///
/// The only component that holds a [`Bridge`]; the customer side can never
/// reach back into this one.
#[derive(Debug)]
pub struct SupervisorPipeline {
    router: Router,
    agent: ScopedAgent,
    bridge: Bridge,
}

impl SupervisorPipeline {
    pub fn new(router: Router, agent: ScopedAgent, bridge: Bridge) -> Self {
        Self {
            router,
            agent,
            bridge,
        }
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn root_id(&self) -> &str {
        self.agent.root_id()
    }

    /// Decide, then either answer on the admin root or cross the bridge.
    ///
    /// The route is written once into `state`, so a second run on the same
    /// state fails with [`StateError::RouteAlreadySet`].
    pub async fn run(&self, state: &mut PrivilegedState) -> Result<SupervisorOutcome, PipelineError> {
        let phases = PhaseMachine::new(PipelineKind::Supervisor);

        phases.advance(PipelinePhase::Deciding)?;
        let decision = self.router.decide(state).await;
        let route = decision.route;
        state.set_route(route)?;
        tracing::info!(
            %route,
            origin = %state.origin(),
            classification_failed = decision.classification_failed,
            "supervisor routed request"
        );

        phases.advance(PipelinePhase::Executing)?;
        let outcome = match route {
            Route::RespondDirectly => {
                let instruction = state.admin_input().trim();
                let (response, blocked_actions) = if instruction.is_empty() {
                    (EMPTY_INPUT_RESPONSE.to_string(), 0)
                } else {
                    let reply = self.agent.respond(instruction).await?;
                    let blocked = reply.blocked_actions();
                    (reply.text, blocked)
                };
                state.set_response(response.clone())?;
                SupervisorOutcome {
                    route,
                    response,
                    blocked_actions,
                    classification_failed: decision.classification_failed,
                }
            }
            Route::Delegate => {
                let customer = self.bridge.invoke(state).await?;
                SupervisorOutcome {
                    route,
                    response: customer.response().to_string(),
                    blocked_actions: customer.blocked_actions,
                    classification_failed: decision.classification_failed,
                }
            }
            Route::Unset => return Err(StateError::UnsetRoute.into()),
        };

        phases.advance(PipelinePhase::Done)?;
        Ok(outcome)
    }
}
