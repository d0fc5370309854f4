//! Sermon summary flow.

use serde::{Deserialize, Serialize};

use super::{Flow, Validate};
use crate::error::{ValidationError, require_non_blank};
use crate::llm::ChatMessage;

/// Longest sermon text accepted, in characters.
pub const MAX_CONTENT_CHARS: usize = 20_000;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SummarizeSermonInput {
    pub title: String,
    /// Transcript, outline, or personal notes.
    pub content: String,
}

impl Validate for SummarizeSermonInput {
    fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("title", &self.title)?;
        require_non_blank("content", &self.content)?;
        if self.content.chars().count() > MAX_CONTENT_CHARS {
            return Err(ValidationError::new(
                "content",
                format!("must be at most {MAX_CONTENT_CHARS} characters"),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeSermonOutput {
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
}

impl Validate for SummarizeSermonOutput {
    fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("summary", &self.summary)?;
        if self.key_points.iter().any(|p| p.trim().is_empty()) {
            return Err(ValidationError::new("keyPoints", "must not contain empty entries"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SummarizeSermon;

impl Flow for SummarizeSermon {
    const NAME: &'static str = "summarize_sermon";
    type Input = SummarizeSermonInput;
    type Output = SummarizeSermonOutput;

    fn render(&self, input: &SummarizeSermonInput) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(
                "You summarize sermons for church members. Write a short summary \
                 (3-5 sentences) and list 3-5 key points. Respond with a JSON object \
                 of the form {\"summary\": string, \"keyPoints\": [string]}.",
            ),
            ChatMessage::user(format!(
                "Sermon title: {}\n\nSermon content:\n{}",
                input.title.trim(),
                input.content.trim()
            )),
        ]
    }
}
