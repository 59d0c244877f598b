//! # Bridge (Projection Boundary)
//!
//! The single place where privileged state turns into sanitized state.
//!
//! [`Bridge::project`] reads exactly one field of [`PrivilegedState`]
//! (`admin_input`), copies it into a freshly allocated [`SanitizedState`] and
//! touches nothing else. The secret fields are never read here, and the
//! sanitized type has nowhere to put them anyway.
//!
//! Projection requires `origin == AdminEntry`. Anything else is treated as
//! forged and fails with [`BridgeError::IntegrityViolation`]; the caller must
//! end the request with that error rather than fall back to a direct answer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::pipeline::{CustomerOutcome, CustomerPipeline, PipelineError};
use crate::state::{PrivilegedOrigin, PrivilegedState, Route, SanitizedState};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error("bridge integrity violation: refusing to project state with origin '{origin}'")]
    IntegrityViolation { origin: PrivilegedOrigin },
}

#[derive(Debug)]
pub struct Bridge {
    customer: Arc<CustomerPipeline>,
    invocations: AtomicU64,
}

impl Bridge {
    pub fn new(customer: Arc<CustomerPipeline>) -> Self {
        Self {
            customer,
            invocations: AtomicU64::new(0),
        }
    }

    /// Number of successful projections since construction.
    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }

    /// Project privileged state into new sanitized state. Pure and synchronous.
    pub fn project(&self, state: &PrivilegedState) -> Result<SanitizedState, BridgeError> {
        if state.origin() != PrivilegedOrigin::AdminEntry {
            tracing::error!(
                target: "sluice::audit",
                origin = %state.origin(),
                "bridge refused state of invalid provenance"
            );
            return Err(BridgeError::IntegrityViolation {
                origin: state.origin(),
            });
        }

        let projected = SanitizedState::projected(state.admin_input().to_owned());
        let invocation = self.invocations.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(
            target: "sluice::audit",
            origin = %state.origin(),
            route = %state.route(),
            bytes = projected.input_text().len(),
            invocation,
            "privileged state projected across bridge"
        );
        Ok(projected)
    }

    /// Project `state` and run the customer pipeline on the result.
    pub async fn invoke(&self, state: &PrivilegedState) -> Result<CustomerOutcome, PipelineError> {
        if state.route() != Route::Delegate {
            tracing::warn!(route = %state.route(), "bridge invoked without a delegate route");
        }
        let sanitized = self.project(state)?;
        self.customer.run(sanitized).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{SanitizedOrigin, SecretContext, SecretKeyRef};
    use crate::test_utils::{RootFixture, offline_customer};

    #[test]
    fn projection_copies_only_admin_input() {
        let fixture = RootFixture::new();
        let bridge = Bridge::new(Arc::new(offline_customer(&fixture)));
        let state = PrivilegedState::admin_entry("read_file /public/guide.txt")
            .with_secret_context(SecretContext::new("never-forward-this"))
            .with_secret_key_ref(SecretKeyRef::new("key-1"));

        let projected = bridge.project(&state).unwrap();
        assert_eq!(projected.origin(), SanitizedOrigin::BridgeProjection);
        assert_eq!(projected.input_text(), "read_file /public/guide.txt");
        assert_eq!(projected.response(), None);
        assert_eq!(bridge.invocations(), 1);
    }

    #[test]
    fn forged_origins_are_refused() {
        let fixture = RootFixture::new();
        let bridge = Bridge::new(Arc::new(offline_customer(&fixture)));
        for origin in [PrivilegedOrigin::Unset, PrivilegedOrigin::Bridge] {
            let state = PrivilegedState::with_origin(origin, "update docs");
            assert_eq!(
                bridge.project(&state),
                Err(BridgeError::IntegrityViolation { origin })
            );
        }
        assert_eq!(bridge.invocations(), 0);
    }

    #[tokio::test]
    async fn invoke_runs_customer_pipeline() {
        let fixture = RootFixture::new();
        let bridge = Bridge::new(Arc::new(offline_customer(&fixture)));
        let mut state = PrivilegedState::admin_entry("update the docs");
        state.set_route(Route::Delegate).unwrap();

        let outcome = bridge.invoke(&state).await.unwrap();
        assert_eq!(
            outcome.state.response(),
            Some("customer-service handled: update the docs")
        );
    }
}
