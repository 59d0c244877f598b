//! # Response Collaborators
//!
//! The text a pipeline answers with comes from a [`Responder`]. The core does
//! not care what the text says; it only controls what the responder is shown.
//!
//! - [`OfflineResponder`]: deterministic, no network. Used in offline mode and
//!   in tests.
//! - [`ChatResponder`]: asks an OpenAI-compatible chat endpoint through
//!   [`ChatClient`].

mod client;
mod error;

pub use client::{ChatClient, ChatMessage, ChatRequest, message_text};
pub use error::ModelError;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::agent::Observation;

/// Which pipeline's agent is speaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRole {
    Supervisor,
    CustomerService,
}

impl AgentRole {
    pub fn label(self) -> &'static str {
        match self {
            AgentRole::Supervisor => "supervisor",
            AgentRole::CustomerService => "customer-service",
        }
    }

    fn system_prompt(self) -> &'static str {
        match self {
            AgentRole::Supervisor => {
                "You are the supervisor agent for administrator workflows. \
                 File operations have already been carried out for you; their results follow \
                 the request. Answer the operator concisely."
            }
            AgentRole::CustomerService => {
                "You are a customer-facing documentation assistant. \
                 File operations have already been carried out for you; their results follow \
                 the request. Blocked operations must not be retried or explained in detail."
            }
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything a responder is allowed to see for one turn.
#[derive(Debug)]
pub struct AgentTurn<'a> {
    pub role: AgentRole,
    pub instruction: &'a str,
    pub observations: &'a [Observation],
}

impl AgentTurn<'_> {
    fn observation_block(&self) -> String {
        self.observations
            .iter()
            .map(Observation::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, turn: &AgentTurn<'_>) -> Result<String, ModelError>;
}

/// Echoes the instruction with the role label, then one line per observation.
#[derive(Debug, Clone, Default)]
pub struct OfflineResponder;

#[async_trait]
impl Responder for OfflineResponder {
    async fn respond(&self, turn: &AgentTurn<'_>) -> Result<String, ModelError> {
        let mut text = format!("{} handled: {}", turn.role, turn.instruction);
        if !turn.observations.is_empty() {
            text.push('\n');
            text.push_str(&turn.observation_block());
        }
        Ok(text)
    }
}

/// Responds through a chat model.
#[derive(Debug, Clone)]
pub struct ChatResponder {
    client: Arc<ChatClient>,
    model: String,
    temperature: f32,
}

impl ChatResponder {
    pub fn new(client: Arc<ChatClient>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            client,
            model: model.into(),
            temperature,
        }
    }
}

#[async_trait]
impl Responder for ChatResponder {
    async fn respond(&self, turn: &AgentTurn<'_>) -> Result<String, ModelError> {
        let mut user = turn.instruction.to_string();
        if !turn.observations.is_empty() {
            user.push_str("\n\nFile operation results:\n");
            user.push_str(&turn.observation_block());
        }
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(turn.role.system_prompt()),
                ChatMessage::user(user),
            ],
            temperature: self.temperature,
        };
        self.client.complete(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offline_responder_echoes_with_role() {
        let turn = AgentTurn {
            role: AgentRole::Supervisor,
            instruction: "hello admin",
            observations: &[],
        };
        assert_eq!(
            OfflineResponder.respond(&turn).await.unwrap(),
            "supervisor handled: hello admin"
        );
    }

    #[tokio::test]
    async fn offline_responder_appends_observations() {
        let observations = vec![Observation::Wrote {
            path: "faq.md".into(),
            bytes: 3,
        }];
        let turn = AgentTurn {
            role: AgentRole::CustomerService,
            instruction: "write_file faq.md abc",
            observations: &observations,
        };
        let text = OfflineResponder.respond(&turn).await.unwrap();
        assert_eq!(
            text,
            "customer-service handled: write_file faq.md abc\nwrote faq.md (3 bytes)"
        );
    }
}
