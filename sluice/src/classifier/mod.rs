//! # Routing Classifiers
//!
//! The router asks a [`Classifier`] whether an operator instruction should be
//! answered by the supervisor or delegated across the bridge. Classifiers are
//! external collaborators: their answer is a bare [`Intent`], so even a
//! classifier that sees secret context cannot smuggle it anywhere.
//!
//! - [`KeywordClassifier`]: deterministic keyword match (offline mode).
//! - [`LlmClassifier`]: asks a chat model, gated by the same keywords.

mod keyword;
mod llm;

pub use keyword::{BRIDGE_KEYWORDS, KeywordClassifier, has_bridge_intent};
pub use llm::LlmClassifier;

use async_trait::async_trait;

use crate::model::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    RespondDirectly,
    Delegate,
}

/// Input for one classification.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationRequest<'a> {
    pub instruction: &'a str,
    /// Privileged background. Only the intent leaves the classifier.
    pub secret_context: Option<&'a str>,
}

impl<'a> ClassificationRequest<'a> {
    pub fn new(instruction: &'a str) -> Self {
        Self {
            instruction,
            secret_context: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),

    #[error("classifier returned an unrecognized route label: {0:?}")]
    UnrecognizedLabel(String),

    #[error("classifier transport failed: {0}")]
    Transport(#[from] ModelError),
}

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        request: ClassificationRequest<'_>,
    ) -> Result<Intent, ClassificationError>;
}
