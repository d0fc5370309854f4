//! Member profiles.

use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, require_non_blank};

/// A member's profile record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub display_name: String,
    pub profile_picture_url: String,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ministry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A profile as other members see it in the directory. Contact details
/// stay with the member's own profile view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub id: String,
    pub display_name: String,
    pub profile_picture_url: String,
    pub interests: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ministry: Option<String>,
}

impl From<&Profile> for DirectoryEntry {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id.clone(),
            display_name: profile.display_name.clone(),
            profile_picture_url: profile.profile_picture_url.clone(),
            interests: profile.interests.clone(),
            ministry: profile.ministry.clone(),
        }
    }
}

/// Display fields copied onto posts and prayer requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub id: String,
    pub display_name: String,
    pub profile_picture_url: String,
}

/// Partial profile update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub display_name: Option<String>,
    pub profile_picture_url: Option<String>,
    pub interests: Option<Vec<String>>,
    /// An empty string clears the ministry.
    pub ministry: Option<String>,
}

impl ProfilePatch {
    /// Patch that only changes the display name.
    #[must_use]
    pub fn display_name(name: impl Into<String>) -> Self {
        Self {
            display_name: Some(name.into()),
            ..Self::default()
        }
    }
}

impl Profile {
    /// Build a profile for a newly registered member.
    #[must_use]
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        let display_name = display_name.into();
        Self {
            id: id.into(),
            profile_picture_url: placeholder_avatar(&display_name),
            display_name,
            interests: Vec::new(),
            ministry: None,
            email: None,
        }
    }

    #[must_use]
    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            profile_picture_url: self.profile_picture_url.clone(),
        }
    }

    /// Merge `patch` onto this profile.
    ///
    /// Returns `true` when a denormalized display field changed. The patch
    /// is validated in full before anything is written.
    pub fn apply(&mut self, patch: ProfilePatch) -> Result<bool, ValidationError> {
        if let Some(name) = &patch.display_name {
            require_non_blank("displayName", name)?;
        }
        if let Some(url) = &patch.profile_picture_url {
            require_non_blank("profilePictureUrl", url)?;
        }

        let before = self.summary();
        if let Some(name) = patch.display_name {
            self.display_name = name.trim().to_string();
        }
        if let Some(url) = patch.profile_picture_url {
            self.profile_picture_url = url.trim().to_string();
        }
        if let Some(interests) = patch.interests {
            self.interests = interests
                .into_iter()
                .map(|i| i.trim().to_string())
                .filter(|i| !i.is_empty())
                .collect();
        }
        if let Some(ministry) = patch.ministry {
            let ministry = ministry.trim();
            self.ministry = (!ministry.is_empty()).then(|| ministry.to_string());
        }
        Ok(before != self.summary())
    }

    /// Case-insensitive match on name, ministry, or any interest.
    pub(crate) fn matches(&self, needle: &str) -> bool {
        self.display_name.to_lowercase().contains(needle)
            || self
                .ministry
                .as_deref()
                .is_some_and(|m| m.to_lowercase().contains(needle))
            || self
                .interests
                .iter()
                .any(|i| i.to_lowercase().contains(needle))
    }
}

fn placeholder_avatar(display_name: &str) -> String {
    let initial = display_name
        .chars()
        .find(|c| c.is_alphanumeric())
        .map_or('?', |c| c.to_ascii_uppercase());
    format!("https://placehold.co/100x100.png?text={initial}")
}
