//! Hosted model client.
//!
//! Flows talk to the model through the [`ModelClient`] trait: one request,
//! one JSON object back, or a terminal [`ModelError`]. There is no
//! streaming, retry, or cancellation at this layer.
//!
//! # Clients
//!
//! - [`ChatCompletionsClient`]: OpenAI-compatible `/chat/completions`
//!   endpoints (`OpenAI`, Azure, `OpenRouter`, Together, Groq, Google AI)
//!
//! # Example
//!
//! ```rust,ignore
//! use kadda_connect::llm::{ChatCompletionsClient, LlmSettings, Provider};
//!
//! let settings = LlmSettings {
//!     base_url: "https://generativelanguage.googleapis.com".to_string(),
//!     api_key: Some("...".to_string()),
//!     model: "gemini-2.0-flash".to_string(),
//!     provider: Provider::GoogleAi,
//!     temperature: None,
//! };
//! let client = ChatCompletionsClient::new(settings);
//! ```

pub mod chat_completions;
pub mod provider;

pub use chat_completions::ChatCompletionsClient;
pub use provider::Provider;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Model connection settings.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// Base URL for the model API (e.g., `https://api.openai.com`).
    pub base_url: String,
    /// Optional API key for authentication.
    pub api_key: Option<String>,
    /// Model identifier (e.g., `gpt-4o-mini`, `gemini-2.0-flash`).
    pub model: String,
    /// Provider type (auto-detected from `base_url` if not specified).
    pub provider: Provider,
    /// Sampling temperature; provider default when absent.
    pub temperature: Option<f32>,
}

/// Role of a prompt message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A prompt message sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Terminal failure of a model round-trip.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The provider could not be reached or the body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The provider answered with a non-2xx status.
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },
    /// The provider answered 2xx but not with a JSON object.
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// A hosted model that answers one prompt with one JSON object.
#[async_trait::async_trait]
pub trait ModelClient: Send + Sync + std::fmt::Debug {
    /// Send `messages` and return the model's reply parsed as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the provider responds with a
    /// non-success status, or the reply is not a JSON object.
    async fn complete_json(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<serde_json::Value, ModelError>;
}
