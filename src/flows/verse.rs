//! Bible passage explanation flow.

use serde::{Deserialize, Serialize};

use super::{Flow, Validate};
use crate::bible::Passage;
use crate::error::{ValidationError, require_non_blank};
use crate::llm::ChatMessage;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExplainVerseInput {
    /// e.g. "John 3:16".
    pub reference: String,
    /// Passage text the explanation is grounded on.
    pub text: String,
    /// Optional follow-up question about the passage.
    #[serde(default)]
    pub question: Option<String>,
}

impl ExplainVerseInput {
    /// Build an input from a fetched passage.
    #[must_use]
    pub fn from_passage(passage: &Passage, question: Option<String>) -> Self {
        Self {
            reference: passage.reference.clone(),
            text: passage.text.trim().to_string(),
            question,
        }
    }
}

impl Validate for ExplainVerseInput {
    fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("reference", &self.reference)?;
        require_non_blank("text", &self.text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExplainVerseOutput {
    pub explanation: String,
}

impl Validate for ExplainVerseOutput {
    fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("explanation", &self.explanation)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExplainVerse;

impl Flow for ExplainVerse {
    const NAME: &'static str = "explain_verse";
    type Input = ExplainVerseInput;
    type Output = ExplainVerseOutput;

    fn render(&self, input: &ExplainVerseInput) -> Vec<ChatMessage> {
        let mut prompt = format!(
            "Passage: {}\n\n\"{}\"",
            input.reference.trim(),
            input.text.trim()
        );
        match input.question.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => {
                prompt.push_str("\n\nQuestion: ");
                prompt.push_str(q);
            }
            _ => prompt.push_str("\n\nExplain what this passage means and how it applies today."),
        }

        vec![
            ChatMessage::system(
                "You explain Bible passages to church members in plain, respectful \
                 language. Give historical context where it helps and stay close to the \
                 text. Respond with a JSON object of the form {\"explanation\": string}.",
            ),
            ChatMessage::user(prompt),
        ]
    }
}
