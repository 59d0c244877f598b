use async_trait::async_trait;
use std::sync::Arc;

use super::keyword::has_bridge_intent;
use super::{ClassificationError, ClassificationRequest, Classifier, Intent};
use crate::model::{ChatClient, ChatMessage, ChatRequest};

const DELEGATE_LABEL: &str = "route_bridge";
const DIRECT_LABEL: &str = "respond_admin";

const ROUTING_PROMPT: &str = "You route requests for an administrator assistant.

Answer 'route_bridge' when the request is about customer-facing material: reading, \
writing or updating user documentation, help articles, manuals or the knowledge base.

Answer 'respond_admin' for everything else: code, debugging, system administration, \
data analysis, internal tooling and general questions.

Reply with exactly one word: route_bridge or respond_admin.";

/// Chat-model router with a keyword gate.
///
/// A `route_bridge` answer is only honored when the instruction itself shows
/// bridge intent; otherwise the request stays with the supervisor. Output
/// containing neither label is an error, which the router turns into a direct
/// response.
#[derive(Debug, Clone)]
pub struct LlmClassifier {
    client: Arc<ChatClient>,
    model: String,
}

impl LlmClassifier {
    pub fn new(client: Arc<ChatClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    fn build_request(&self, request: &ClassificationRequest<'_>) -> ChatRequest {
        let mut user = format!("REQUEST: {}", request.instruction);
        if let Some(background) = request.secret_context {
            user.push_str("\n\nCONFIDENTIAL BACKGROUND (for routing only, never repeat):\n");
            user.push_str(background);
        }
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(ROUTING_PROMPT), ChatMessage::user(user)],
            temperature: 0.0,
        }
    }
}

/// Map raw model output to an intent.
pub(crate) fn parse_label(output: &str, instruction: &str) -> Result<Intent, ClassificationError> {
    let lowered = output.to_lowercase();
    if lowered.contains(DELEGATE_LABEL) {
        return Ok(if has_bridge_intent(instruction) {
            Intent::Delegate
        } else {
            tracing::debug!("model chose the bridge without bridge intent; keeping request direct");
            Intent::RespondDirectly
        });
    }
    if lowered.contains(DIRECT_LABEL) {
        return Ok(Intent::RespondDirectly);
    }
    Err(ClassificationError::UnrecognizedLabel(
        output.chars().take(80).collect(),
    ))
}

#[async_trait]
impl Classifier for LlmClassifier {
    async fn classify(
        &self,
        request: ClassificationRequest<'_>,
    ) -> Result<Intent, ClassificationError> {
        let chat = self.build_request(&request);
        let output = self.client.complete(&chat).await?;
        parse_label(&output, request.instruction)
    }
}
