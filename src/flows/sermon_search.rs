//! Local sermon search.
//!
//! A linear scan over the in-memory archive; no model call and no index.

use serde::{Deserialize, Serialize};

use super::Validate;
use crate::error::ValidationError;
use crate::sermons::Sermon;

/// Results returned when the caller gives no limit.
pub const DEFAULT_LIMIT: usize = 3;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SermonSearchInput {
    /// Free text matched against title, summary, speaker, topics, and scripture.
    #[serde(default)]
    pub query: Option<String>,
    /// Every listed topic must be present on the sermon.
    #[serde(default)]
    pub topics: Vec<String>,
    /// Substring of the speaker's name.
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl Validate for SermonSearchInput {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.limit == Some(0) {
            return Err(ValidationError::new("limit", "must be at least 1"));
        }
        Ok(())
    }
}

fn normalized(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}

fn matches_query(sermon: &Sermon, needle: &str) -> bool {
    [
        &sermon.title,
        &sermon.summary,
        &sermon.speaker,
        &sermon.scripture_reference,
    ]
    .into_iter()
    .chain(&sermon.topics)
    .any(|field| field.to_lowercase().contains(needle))
}

fn has_topics(sermon: &Sermon, wanted: &[String]) -> bool {
    wanted.iter().all(|topic| {
        sermon
            .topics
            .iter()
            .any(|t| t.trim().to_lowercase() == *topic)
    })
}

/// Filter `catalog` by `input`, preserving catalog order.
pub fn search_sermons(
    catalog: &[Sermon],
    input: &SermonSearchInput,
) -> Result<Vec<Sermon>, ValidationError> {
    input.validate()?;

    let query = normalized(input.query.as_deref());
    let speaker = normalized(input.speaker.as_deref());
    let topics: Vec<String> = input
        .topics
        .iter()
        .filter_map(|t| normalized(Some(t)))
        .collect();
    let limit = input.limit.unwrap_or(DEFAULT_LIMIT);

    let results: Vec<Sermon> = catalog
        .iter()
        .filter(|s| query.as_deref().is_none_or(|q| matches_query(s, q)))
        .filter(|s| has_topics(s, &topics))
        .filter(|s| {
            speaker
                .as_deref()
                .is_none_or(|sp| s.speaker.to_lowercase().contains(sp))
        })
        .take(limit)
        .cloned()
        .collect();

    tracing::debug!(
        name: "sermon.search",
        matched = results.len(),
        limit,
        "Sermon search completed"
    );
    Ok(results)
}
