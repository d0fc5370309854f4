//! Schema-validated assistant flows.
//!
//! A flow turns one validated input record into one prompt, makes exactly
//! one model round-trip, and validates the reply into an output record.
//! Input validation failures never reach the network; an output that does
//! not fit the schema is a terminal [`FlowError::InvalidOutput`] with no
//! partial result. Flows do not touch session state.
//!
//! - [`chat::AssistantChat`]: conversational assistant
//! - [`sermon::SummarizeSermon`]: sermon summary with key points
//! - [`verse::ExplainVerse`]: Bible passage explanation
//! - [`sermon_search`]: local sermon search, no model call

pub mod chat;
pub mod sermon;
pub mod sermon_search;
pub mod verse;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::error::ValidationError;
use crate::llm::{ChatMessage, ModelClient, ModelError};

/// Structural checks beyond what deserialization enforces.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Why a flow produced no output.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("invalid input: {0}")]
    InvalidInput(ValidationError),
    #[error("model call failed: {0}")]
    Model(#[from] ModelError),
    #[error("model output failed validation: {0}")]
    InvalidOutput(String),
}

/// A single templated prompt with typed input and output.
pub trait Flow: Send + Sync {
    /// Name used in logs.
    const NAME: &'static str;

    type Input: Validate + Send + Sync;
    type Output: DeserializeOwned + Validate;

    /// Render the prompt for a validated input.
    fn render(&self, input: &Self::Input) -> Vec<ChatMessage>;
}

/// Validate, render, call the model once, and validate the reply.
pub async fn run_flow<F: Flow>(
    model: &dyn ModelClient,
    flow: &F,
    input: &F::Input,
) -> Result<F::Output, FlowError> {
    input.validate().map_err(FlowError::InvalidInput)?;

    let messages = flow.render(input);
    tracing::debug!(
        name: "flow.started",
        flow = F::NAME,
        prompt_messages = messages.len(),
        "Running flow"
    );

    let raw = model.complete_json(messages).await.inspect_err(|e| {
        tracing::warn!(name: "flow.model_failed", flow = F::NAME, error = %e, "Model call failed");
    })?;

    let output: F::Output =
        serde_json::from_value(raw).map_err(|e| FlowError::InvalidOutput(e.to_string()))?;
    output
        .validate()
        .map_err(|e| FlowError::InvalidOutput(e.to_string()))?;

    tracing::info!(name: "flow.completed", flow = F::NAME, "Flow completed");
    Ok(output)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted model client for flow tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use serde_json::Value;

    use crate::llm::{ChatMessage, ModelClient, ModelError};

    #[derive(Debug, Default)]
    pub struct ScriptedModel {
        replies: Mutex<VecDeque<Result<Value, String>>>,
        pub prompts: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedModel {
        pub fn replying(replies: impl IntoIterator<Item = Result<Value, String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
                prompts: Mutex::default(),
            }
        }

        pub fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }

        pub fn last_prompt_text(&self) -> String {
            self.prompts
                .lock()
                .unwrap()
                .last()
                .map(|m| {
                    m.iter()
                        .map(|c| c.content.as_str())
                        .collect::<Vec<_>>()
                        .join("\n")
                })
                .unwrap_or_default()
        }
    }

    #[async_trait::async_trait]
    impl ModelClient for ScriptedModel {
        async fn complete_json(&self, messages: Vec<ChatMessage>) -> Result<Value, ModelError> {
            self.prompts.lock().unwrap().push(messages);
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(v)) => Ok(v),
                Some(Err(body)) => Err(ModelError::Status { status: 500, body }),
                None => Err(ModelError::Malformed("no scripted reply".to_string())),
            }
        }
    }
}
