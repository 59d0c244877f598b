//! # Router
//!
//! Decides whether an operator request is answered by the supervisor or
//! delegated across the bridge. The decision is a heuristic, not a security
//! boundary: a wrong `Delegate` still only moves `admin_input`, because the
//! bridge cannot carry anything else.
//!
//! Classification failures never guess `Delegate`; they fall back to
//! [`Route::RespondDirectly`] and are reported in [`Decision::classification_failed`]
//! so the caller can still surface them.

use std::sync::Arc;

use crate::classifier::{ClassificationRequest, Classifier, Intent};
use crate::state::{PrivilegedState, Route};

/// Route chosen for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub route: Route,
    pub classification_failed: bool,
}

impl Decision {
    fn classified(route: Route) -> Self {
        Self {
            route,
            classification_failed: false,
        }
    }
}

#[derive(Clone)]
pub struct Router {
    classifier: Arc<dyn Classifier>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router").finish_non_exhaustive()
    }
}

impl Router {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }

    /// Classify `state.admin_input` (with its secret context as background).
    ///
    /// Never returns [`Route::Unset`].
    pub async fn decide(&self, state: &PrivilegedState) -> Decision {
        let instruction = state.admin_input().trim();
        if instruction.is_empty() {
            return Decision::classified(Route::RespondDirectly);
        }

        let request = ClassificationRequest {
            instruction,
            secret_context: state.secret_context().map(|s| s.expose()),
        };
        match self.classifier.classify(request).await {
            Ok(Intent::Delegate) => Decision::classified(Route::Delegate),
            Ok(Intent::RespondDirectly) => Decision::classified(Route::RespondDirectly),
            Err(e) => {
                tracing::warn!(error = %e, "classification failed; responding directly");
                Decision {
                    route: Route::RespondDirectly,
                    classification_failed: true,
                }
            }
        }
    }
}
