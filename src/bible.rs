//! Read-only client for a bible-api.com compatible passage service.
//!
//! Passages are requested as `GET {base}/{book}+{chapter}:{verse}-{end}`
//! and come back as `{reference, verses[], text}`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{ValidationError, require_non_blank};

/// Public default endpoint.
pub const DEFAULT_BIBLE_API_URL: &str = "https://bible-api.com";

#[derive(Debug, Error)]
pub enum BibleError {
    #[error("invalid passage request: {0}")]
    Invalid(#[from] ValidationError),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("passage service returned {0}")]
    Status(u16),
}

/// Which passage to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassageRequest {
    pub book: String,
    pub chapter: u32,
    #[serde(default)]
    pub verse: Option<u32>,
    #[serde(default)]
    pub end_verse: Option<u32>,
}

impl PassageRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("book", &self.book)?;
        // The book is spliced into the URL path as-is.
        if !self.book.chars().all(|c| c.is_alphanumeric() || c == ' ') {
            return Err(ValidationError::new(
                "book",
                "may only contain letters, digits, and spaces",
            ));
        }
        if self.chapter == 0 {
            return Err(ValidationError::new("chapter", "must be at least 1"));
        }
        match (self.verse, self.end_verse) {
            (Some(0), _) => Err(ValidationError::new("verse", "must be at least 1")),
            (None, Some(_)) => Err(ValidationError::new("endVerse", "requires a start verse")),
            (Some(start), Some(end)) if end < start => Err(ValidationError::new(
                "endVerse",
                "must not be before the start verse",
            )),
            _ => Ok(()),
        }
    }

    /// Path segment in the service's `book+chapter:verse-end` form.
    #[must_use]
    pub fn path(&self) -> String {
        let book = self.book.split_whitespace().collect::<Vec<_>>().join("+");
        let mut path = format!("{book}+{}", self.chapter);
        if let Some(verse) = self.verse {
            path.push_str(&format!(":{verse}"));
            if let Some(end) = self.end_verse.filter(|end| *end != verse) {
                path.push_str(&format!("-{end}"));
            }
        }
        path
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Verse {
    pub book_name: String,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Passage {
    pub reference: String,
    pub verses: Vec<Verse>,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct BibleClient {
    http: reqwest::Client,
    base_url: String,
}

impl BibleClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fetch a passage. Invalid requests fail before any network call.
    pub async fn fetch_passage(&self, request: &PassageRequest) -> Result<Passage, BibleError> {
        request.validate()?;

        let url = format!("{}/{}", self.base_url, request.path());
        tracing::debug!(url = %url, "Fetching Bible passage");

        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BibleError::Status(status.as_u16()));
        }
        Ok(resp.json::<Passage>().await?)
    }
}

impl Default for BibleClient {
    fn default() -> Self {
        Self::new(DEFAULT_BIBLE_API_URL)
    }
}
