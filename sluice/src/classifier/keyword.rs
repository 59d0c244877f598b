use async_trait::async_trait;

use super::{ClassificationError, ClassificationRequest, Classifier, Intent};

/// Phrases that signal customer-facing work.
pub const BRIDGE_KEYWORDS: &[&str] = &[
    "docs",
    "documentation",
    "customer",
    "user document",
    "knowledge base",
];

pub fn has_bridge_intent(instruction: &str) -> bool {
    let lowered = instruction.to_lowercase();
    BRIDGE_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// Delegates exactly when the instruction mentions a bridge keyword.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

#[async_trait]
impl Classifier for KeywordClassifier {
    async fn classify(
        &self,
        request: ClassificationRequest<'_>,
    ) -> Result<Intent, ClassificationError> {
        Ok(if has_bridge_intent(request.instruction) {
            Intent::Delegate
        } else {
            Intent::RespondDirectly
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn docs_requests_delegate() {
        for text in [
            "read docs for user",
            "Update the Documentation",
            "search the knowledge base",
            "reply to the customer",
        ] {
            let intent = KeywordClassifier
                .classify(ClassificationRequest::new(text))
                .await
                .unwrap();
            assert_eq!(intent, Intent::Delegate, "{text}");
        }
    }

    #[tokio::test]
    async fn other_requests_stay_direct() {
        let intent = KeywordClassifier
            .classify(ClassificationRequest::new("list files"))
            .await
            .unwrap();
        assert_eq!(intent, Intent::RespondDirectly);
    }

    #[tokio::test]
    async fn secret_context_does_not_influence_keywords() {
        let request = ClassificationRequest {
            instruction: "rotate the signing key",
            secret_context: Some("customer docs pending"),
        };
        let intent = KeywordClassifier.classify(request).await.unwrap();
        assert_eq!(intent, Intent::RespondDirectly);
    }
}
