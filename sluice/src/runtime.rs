//! # Runtime
//!
//! Wires one [`AppConfig`] into the two pipelines and exposes the two entry
//! points: [`Runtime::run_admin_turn`] and [`Runtime::run_user_turn`].
//!
//! Startup validation happens in [`Runtime::create`]: both roots are bound
//! (existing directories, not `/`) and must not overlap. Nothing is served if
//! that fails.
//!
//! The user entry point builds only [`SanitizedState`] and calls only the
//! customer pipeline; it has no code path that constructs privileged state.

use std::sync::Arc;

use crate::agent::ScopedAgent;
use crate::bridge::Bridge;
use crate::classifier::{Classifier, KeywordClassifier, LlmClassifier};
use crate::config::{AppConfig, Collaborators};
use crate::model::{AgentRole, ChatClient, ChatResponder, ModelError, OfflineResponder, Responder};
use crate::pipeline::{CustomerPipeline, PipelineError, SupervisorPipeline};
use crate::router::Router;
use crate::sandbox::{SandboxError, VirtualRoot, ensure_disjoint};
use crate::state::{PrivilegedState, Route, SanitizedState, SecretContext, SecretKeyRef};
use crate::worker::ScopedFsWorker;

pub const ADMIN_ROOT_ID: &str = "admin";
pub const PUBLIC_ROOT_ID: &str = "public";

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("invalid virtual root configuration: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("cannot set up model client: {0}")]
    Model(#[from] ModelError),
}

/// How a turn's response was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPath {
    /// Answered by the supervisor on the admin root.
    Direct,
    /// Projected across the bridge and answered by the customer pipeline.
    Bridged,
    /// User-mode request answered by the customer pipeline.
    CustomerDirect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub response: String,
    pub path: TurnPath,
    /// Operations denied by the sandbox during this turn.
    pub blocked_actions: usize,
    /// Routing fell back to a direct answer because the classifier failed.
    pub classification_failed: bool,
}

/// The three external collaborators a runtime needs.
#[derive(Clone)]
pub struct CollaboratorSet {
    pub classifier: Arc<dyn Classifier>,
    pub supervisor: Arc<dyn Responder>,
    pub customer: Arc<dyn Responder>,
}

impl CollaboratorSet {
    pub fn offline() -> Self {
        Self {
            classifier: Arc::new(KeywordClassifier),
            supervisor: Arc::new(OfflineResponder),
            customer: Arc::new(OfflineResponder),
        }
    }

    /// Collaborators selected by the configured model mode.
    pub fn from_config(config: &AppConfig) -> Result<Self, ModelError> {
        let settings = match (config.collaborators(), &config.model) {
            (Collaborators::Remote, Some(settings)) => settings,
            _ => return Ok(Self::offline()),
        };

        let client = Arc::new(ChatClient::new(&settings.base_url, settings.api_key.clone())?);
        tracing::info!(
            endpoint = %client.endpoint(),
            supervisor_model = %settings.supervisor_model,
            customer_model = %settings.customer_model,
            classifier_model = %settings.classifier_model,
            "using remote model collaborators"
        );
        Ok(Self {
            classifier: Arc::new(LlmClassifier::new(
                client.clone(),
                settings.classifier_model.clone(),
            )),
            supervisor: Arc::new(ChatResponder::new(
                client.clone(),
                settings.supervisor_model.clone(),
                settings.temperature,
            )),
            customer: Arc::new(ChatResponder::new(
                client,
                settings.customer_model.clone(),
                settings.temperature,
            )),
        })
    }
}

#[derive(Debug)]
pub struct Runtime {
    config: Arc<AppConfig>,
    roots: Vec<VirtualRoot>,
    supervisor: SupervisorPipeline,
    customer: Arc<CustomerPipeline>,
}

impl Runtime {
    /// Validate roots and build collaborators from `config`.
    pub fn create(config: Arc<AppConfig>) -> Result<Self, RuntimeError> {
        let collaborators = CollaboratorSet::from_config(&config)?;
        Self::with_collaborators(config, collaborators)
    }

    pub fn with_collaborators(
        config: Arc<AppConfig>,
        collaborators: CollaboratorSet,
    ) -> Result<Self, RuntimeError> {
        let admin = VirtualRoot::bind(ADMIN_ROOT_ID, &config.admin_root)?;
        let public = VirtualRoot::bind(PUBLIC_ROOT_ID, &config.public_root)?;
        let roots = vec![admin.clone(), public.clone()];
        ensure_disjoint(&roots)?;

        let customer = Arc::new(CustomerPipeline::new(ScopedAgent::new(
            AgentRole::CustomerService,
            ScopedFsWorker::new(public),
            collaborators.customer,
        )));
        let supervisor = SupervisorPipeline::new(
            Router::new(collaborators.classifier),
            ScopedAgent::new(
                AgentRole::Supervisor,
                ScopedFsWorker::new(admin),
                collaborators.supervisor,
            ),
            Bridge::new(customer.clone()),
        );

        tracing::info!(
            admin_root = %config.admin_root.display(),
            public_root = %config.public_root.display(),
            "virtual roots bound"
        );
        Ok(Self {
            config,
            roots,
            supervisor,
            customer,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Bound roots, admin first.
    pub fn roots(&self) -> &[VirtualRoot] {
        &self.roots
    }

    pub fn bridge_invocations(&self) -> u64 {
        self.supervisor.bridge().invocations()
    }

    /// Admin mode: build privileged state and run the supervisor pipeline.
    pub async fn run_admin_turn(&self, input: &str) -> Result<TurnOutcome, PipelineError> {
        let mut state = PrivilegedState::admin_entry(input);
        if let Some(memo) = &self.config.secret_context {
            state = state.with_secret_context(SecretContext::new(memo.clone()));
        }
        if let Some(key_ref) = &self.config.secret_key_ref {
            state = state.with_secret_key_ref(SecretKeyRef::new(key_ref.clone()));
        }

        let outcome = self.supervisor.run(&mut state).await?;
        drop(state);

        let path = match outcome.route {
            Route::Delegate => TurnPath::Bridged,
            _ => TurnPath::Direct,
        };
        Ok(TurnOutcome {
            response: outcome.response,
            path,
            blocked_actions: outcome.blocked_actions,
            classification_failed: outcome.classification_failed,
        })
    }

    /// User mode: sanitized state straight into the customer pipeline.
    pub async fn run_user_turn(&self, input: &str) -> Result<TurnOutcome, PipelineError> {
        let outcome = self.customer.run(SanitizedState::user_entry(input)).await?;
        Ok(TurnOutcome {
            response: outcome.response().to_string(),
            path: TurnPath::CustomerDirect,
            blocked_actions: outcome.blocked_actions,
            classification_failed: false,
        })
    }
}
