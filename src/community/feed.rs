//! Feed posts and prayer requests.
//!
//! Both carry a denormalized [`ProfileSummary`] of their author and a
//! per-viewer toggle whose counter moves in lockstep with the flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::profile::ProfileSummary;

/// A post on the community feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub author: ProfileSummary,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub likes: u32,
    pub liked_by_me: bool,
    pub created_at: DateTime<Utc>,
}

impl Post {
    #[must_use]
    pub fn new(author: ProfileSummary, content: impl Into<String>, image_url: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            author,
            content: content.into(),
            image_url,
            likes: 0,
            liked_by_me: false,
            created_at: Utc::now(),
        }
    }

    /// Flip `liked_by_me` and move `likes` with it.
    pub fn toggle_like(&mut self) {
        if self.liked_by_me {
            self.likes = self.likes.saturating_sub(1);
        } else {
            self.likes = self.likes.saturating_add(1);
        }
        self.liked_by_me = !self.liked_by_me;
    }
}

/// A prayer request shared with the community.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrayerRequest {
    pub id: String,
    pub author: ProfileSummary,
    pub title: String,
    pub details: String,
    pub is_anonymous: bool,
    pub prayer_count: u32,
    pub prayed_by_me: bool,
    pub answered: bool,
    pub created_at: DateTime<Utc>,
}

impl PrayerRequest {
    #[must_use]
    pub fn new(
        author: ProfileSummary,
        title: impl Into<String>,
        details: impl Into<String>,
        is_anonymous: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            author,
            title: title.into(),
            details: details.into(),
            is_anonymous,
            prayer_count: 0,
            prayed_by_me: false,
            answered: false,
            created_at: Utc::now(),
        }
    }

    /// Flip `prayed_by_me` and move `prayer_count` with it.
    pub fn toggle_prayed(&mut self) {
        if self.prayed_by_me {
            self.prayer_count = self.prayer_count.saturating_sub(1);
        } else {
            self.prayer_count = self.prayer_count.saturating_add(1);
        }
        self.prayed_by_me = !self.prayed_by_me;
    }

    /// Copy with the author hidden when the request is anonymous.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut request = self.clone();
        if request.is_anonymous {
            request.author = ProfileSummary {
                id: String::new(),
                display_name: "Anonymous".to_string(),
                profile_picture_url: String::new(),
            };
        }
        request
    }
}
