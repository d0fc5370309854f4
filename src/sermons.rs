//! Sermon archive records and personal sermon notes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A recorded sermon in the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sermon {
    pub id: String,
    pub title: String,
    pub speaker: String,
    pub date: NaiveDate,
    pub summary: String,
    pub topics: Vec<String>,
    pub scripture_reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

/// A member's private note on one sermon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SermonNote {
    pub id: String,
    pub sermon_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Find a sermon by id.
#[must_use]
pub fn find<'a>(catalog: &'a [Sermon], id: &str) -> Option<&'a Sermon> {
    catalog.iter().find(|s| s.id == id)
}

fn sermon(
    id: &str,
    title: &str,
    speaker: &str,
    date: (i32, u32, u32),
    summary: &str,
    topics: &[&str],
    scripture_reference: &str,
) -> Sermon {
    Sermon {
        id: id.to_string(),
        title: title.to_string(),
        speaker: speaker.to_string(),
        date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap_or_default(),
        summary: summary.to_string(),
        topics: topics.iter().map(ToString::to_string).collect(),
        scripture_reference: scripture_reference.to_string(),
        video_url: None,
    }
}

/// Placeholder archive used until a real sermon source exists.
#[must_use]
pub fn placeholder_catalog() -> Vec<Sermon> {
    vec![
        sermon(
            "sermon-1",
            "Walking by Faith",
            "Pastor John Kadda",
            (2024, 5, 5),
            "Trusting God when the road ahead is unclear, and living by conviction rather than sight.",
            &["Faith", "Trust"],
            "2 Corinthians 5:7",
        ),
        sermon(
            "sermon-2",
            "Amazing Grace in Everyday Life",
            "Rev. Mary Okafor",
            (2024, 5, 12),
            "How unearned favour reshapes the way we treat our families, coworkers, and neighbours.",
            &["Grace", "Forgiveness"],
            "Ephesians 2:8-9",
        ),
        sermon(
            "sermon-3",
            "The Power of Prayer",
            "Pastor John Kadda",
            (2024, 5, 19),
            "Prayer as conversation: persistence, honesty, and praying together as a church family.",
            &["Prayer", "Community"],
            "James 5:16",
        ),
        sermon(
            "sermon-4",
            "Serving One Another",
            "Deacon Samuel Mensah",
            (2024, 5, 26),
            "Freedom used in love: practical ways to serve inside and outside the congregation.",
            &["Service", "Community"],
            "Galatians 5:13",
        ),
    ]
}
