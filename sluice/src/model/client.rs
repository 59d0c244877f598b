//! Minimal client for OpenAI-compatible `chat/completions` endpoints
//! (OpenRouter by default).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::error::ModelError;
use crate::retry::{RetryConfig, execute_with_retry};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Value,
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: Url,
    api_key: String,
    retry: RetryConfig,
}

impl ChatClient {
    pub fn new(base_url: &Url, api_key: impl Into<String>) -> Result<Self, ModelError> {
        let mut base = base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join("chat/completions")?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            endpoint,
            api_key: api_key.into(),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Send `request` and return the text of the first choice.
    pub async fn complete(&self, request: &ChatRequest) -> Result<String, ModelError> {
        execute_with_retry(&self.retry, || self.post_once(request), ModelError::is_transient).await
    }

    async fn post_once(&self, request: &ChatRequest) -> Result<String, ModelError> {
        tracing::debug!(model = %request.model, endpoint = %self.endpoint, "chat completion request");
        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ModelError::Status {
                status: status.as_u16(),
                body: truncate(&body, 512),
            });
        }

        let completion: ChatCompletion = serde_json::from_str(&body)?;
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or(ModelError::EmptyChoices)?;
        Ok(message_text(&choice.message.content))
    }
}

/// Flatten a message `content` that may be a string or a list of text parts.
pub fn message_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| match part {
                Value::String(text) => Some(text.as_str()),
                Value::Object(map) => map.get("text").and_then(Value::as_str),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoint_keeps_base_path() {
        let base = Url::parse("https://openrouter.ai/api/v1").unwrap();
        let client = ChatClient::new(&base, "key").unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "https://openrouter.ai/api/v1/chat/completions"
        );

        let base = Url::parse("http://localhost:8080/v1/").unwrap();
        let client = ChatClient::new(&base, "key").unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn message_text_handles_part_lists() {
        assert_eq!(message_text(&json!("plain")), "plain");
        assert_eq!(
            message_text(&json!([{"type": "text", "text": "a"}, "b", {"type": "image"}])),
            "a b"
        );
        assert_eq!(message_text(&Value::Null), "");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé...");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
