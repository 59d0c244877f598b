/// Failures of the response/chat collaborator.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("chat request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("chat endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed chat response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("chat response contained no choices")]
    EmptyChoices,

    #[error("invalid chat endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("model unavailable: {0}")]
    Unavailable(String),
}

impl ModelError {
    /// Transient failures worth another attempt: timeouts, connection
    /// problems, rate limiting and server-side errors.
    pub fn is_transient(&self) -> bool {
        match self {
            ModelError::Http(e) => e.is_timeout() || e.is_connect(),
            ModelError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
