//! Community data for one client session: members, feed, prayer requests,
//! events, and sermon notes.
//!
//! Posts and prayer requests hold denormalized copies of their author's
//! display fields. [`CommunityStore::update_profile`] rewrites every copy
//! authored by the updated profile, so author fields always reflect the
//! latest profile update.

mod events;
mod feed;
mod profile;
mod seed;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::error::{ValidationError, require_non_blank};
use crate::sermons::{self, Sermon, SermonNote};

pub use events::Event;
pub use feed::{Post, PrayerRequest};
pub use profile::{DirectoryEntry, Profile, ProfilePatch, ProfileSummary};

/// Why a community operation was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommunityError {
    #[error("not signed in")]
    NotAuthenticated,
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("only the author can {0}")]
    Forbidden(&'static str),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl CommunityError {
    fn not_found(kind: &'static str, id: &str) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommunityStore {
    members: Vec<Profile>,
    current_user: Option<String>,
    /// Newest first.
    posts: Vec<Post>,
    /// Newest first.
    prayers: Vec<PrayerRequest>,
    events: Vec<Event>,
    sermons: Arc<Vec<Sermon>>,
    notes: HashMap<String, SermonNote>,
}

impl CommunityStore {
    /// An empty store over the given sermon archive.
    #[must_use]
    pub fn new(sermons: Arc<Vec<Sermon>>) -> Self {
        Self {
            members: Vec::new(),
            current_user: None,
            posts: Vec::new(),
            prayers: Vec::new(),
            events: Vec::new(),
            sermons,
            notes: HashMap::new(),
        }
    }

    /// A store populated with placeholder data.
    #[must_use]
    pub fn seeded(sermons: Arc<Vec<Sermon>>) -> Self {
        let members = seed::members();
        Self {
            posts: seed::posts(&members),
            prayers: seed::prayers(&members),
            events: seed::events(),
            members,
            ..Self::new(sermons)
        }
    }

    // ── Members ─────────────────────────────────────────────────────────────

    #[must_use]
    pub fn current_user(&self) -> Option<&Profile> {
        self.current_user.as_deref().and_then(|id| self.profile(id))
    }

    fn require_user(&self) -> Result<&Profile, CommunityError> {
        self.current_user().ok_or(CommunityError::NotAuthenticated)
    }

    pub fn set_current_user(&mut self, id: &str) -> Result<(), CommunityError> {
        if self.profile(id).is_none() {
            return Err(CommunityError::not_found("profile", id));
        }
        self.current_user = Some(id.to_string());
        Ok(())
    }

    pub fn clear_current_user(&mut self) {
        self.current_user = None;
    }

    #[must_use]
    pub fn profile(&self, id: &str) -> Option<&Profile> {
        self.members.iter().find(|p| p.id == id)
    }

    /// Case-insensitive lookup by email.
    #[must_use]
    pub fn member_by_email(&self, email: &str) -> Option<&Profile> {
        let email = email.trim();
        self.members.iter().find(|p| {
            p.email
                .as_deref()
                .is_some_and(|e| e.eq_ignore_ascii_case(email))
        })
    }

    /// Add a member, replacing any existing profile with the same id.
    pub fn add_member(&mut self, profile: Profile) {
        self.members.retain(|p| p.id != profile.id);
        self.members.push(profile);
    }

    /// Merge `patch` onto a profile and reconcile denormalized author copies.
    pub fn update_profile(
        &mut self,
        id: &str,
        patch: ProfilePatch,
    ) -> Result<Profile, CommunityError> {
        let profile = self
            .members
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| CommunityError::not_found("profile", id))?;

        if profile.apply(patch)? {
            let summary = profile.summary();
            let mut rewritten = 0usize;
            for post in self.posts.iter_mut().filter(|p| p.author.id == summary.id) {
                post.author = summary.clone();
                rewritten += 1;
            }
            for prayer in self.prayers.iter_mut().filter(|p| p.author.id == summary.id) {
                prayer.author = summary.clone();
                rewritten += 1;
            }
            tracing::debug!(profile_id = %id, rewritten, "Reconciled author fields");
        }

        Ok(profile.clone())
    }

    /// Update the signed-in member's profile.
    pub fn update_user_profile(&mut self, patch: ProfilePatch) -> Result<Profile, CommunityError> {
        let id = self.require_user()?.id.clone();
        self.update_profile(&id, patch)
    }

    /// Directory search over name, ministry, and interests. A blank query lists everyone.
    #[must_use]
    pub fn search_members(&self, query: &str) -> Vec<Profile> {
        let needle = query.trim().to_lowercase();
        self.members
            .iter()
            .filter(|p| needle.is_empty() || p.matches(&needle))
            .cloned()
            .collect()
    }

    // ── Feed ────────────────────────────────────────────────────────────────

    #[must_use]
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn create_post(
        &mut self,
        content: &str,
        image_url: Option<String>,
    ) -> Result<Post, CommunityError> {
        require_non_blank("content", content)?;
        let author = self.require_user()?.summary();
        let image_url = image_url.filter(|u| !u.trim().is_empty());

        let post = Post::new(author, content.trim(), image_url);
        self.posts.insert(0, post.clone());
        Ok(post)
    }

    pub fn toggle_like(&mut self, post_id: &str) -> Result<Post, CommunityError> {
        let post = self
            .posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| CommunityError::not_found("post", post_id))?;
        post.toggle_like();
        Ok(post.clone())
    }

    // ── Prayer requests ─────────────────────────────────────────────────────

    /// Prayer requests as shown to the viewer, with anonymous authors hidden.
    #[must_use]
    pub fn prayers(&self) -> Vec<PrayerRequest> {
        self.prayers.iter().map(PrayerRequest::redacted).collect()
    }

    pub fn create_prayer(
        &mut self,
        title: &str,
        details: &str,
        is_anonymous: bool,
    ) -> Result<PrayerRequest, CommunityError> {
        require_non_blank("title", title)?;
        let author = self.require_user()?.summary();

        let request = PrayerRequest::new(author, title.trim(), details.trim(), is_anonymous);
        self.prayers.insert(0, request.clone());
        Ok(request.redacted())
    }

    pub fn toggle_prayed(&mut self, prayer_id: &str) -> Result<PrayerRequest, CommunityError> {
        let request = self.prayer_mut(prayer_id)?;
        request.toggle_prayed();
        Ok(request.redacted())
    }

    /// Mark a request as answered. Only its author may do so.
    pub fn mark_answered(&mut self, prayer_id: &str) -> Result<PrayerRequest, CommunityError> {
        let user_id = self.require_user()?.id.clone();
        let request = self.prayer_mut(prayer_id)?;
        if request.author.id != user_id {
            return Err(CommunityError::Forbidden("mark a prayer request answered"));
        }
        request.answered = true;
        Ok(request.redacted())
    }

    fn prayer_mut(&mut self, prayer_id: &str) -> Result<&mut PrayerRequest, CommunityError> {
        self.prayers
            .iter_mut()
            .find(|p| p.id == prayer_id)
            .ok_or_else(|| CommunityError::not_found("prayer request", prayer_id))
    }

    // ── Events ──────────────────────────────────────────────────────────────

    /// Events starting at or after `now`, soonest first.
    #[must_use]
    pub fn upcoming_events(&self, now: DateTime<Utc>) -> Vec<Event> {
        let mut events: Vec<Event> = self
            .events
            .iter()
            .filter(|e| e.starts_at >= now)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.starts_at);
        events
    }

    #[must_use]
    pub fn event(&self, id: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    pub fn toggle_rsvp(&mut self, event_id: &str) -> Result<Event, CommunityError> {
        let event = self
            .events
            .iter_mut()
            .find(|e| e.id == event_id)
            .ok_or_else(|| CommunityError::not_found("event", event_id))?;
        event.toggle_rsvp();
        Ok(event.clone())
    }

    // ── Sermon notes ────────────────────────────────────────────────────────

    #[must_use]
    pub fn sermons(&self) -> &[Sermon] {
        &self.sermons
    }

    #[must_use]
    pub fn note(&self, sermon_id: &str) -> Option<&SermonNote> {
        self.notes.get(sermon_id)
    }

    /// Create or overwrite the note for a sermon. Blank text deletes it.
    pub fn save_note(
        &mut self,
        sermon_id: &str,
        text: &str,
    ) -> Result<Option<SermonNote>, CommunityError> {
        if sermons::find(&self.sermons, sermon_id).is_none() {
            return Err(CommunityError::not_found("sermon", sermon_id));
        }
        if text.trim().is_empty() {
            self.notes.remove(sermon_id);
            return Ok(None);
        }

        let now = Utc::now();
        let note = self
            .notes
            .entry(sermon_id.to_string())
            .and_modify(|n| {
                n.text = text.to_string();
                n.updated_at = now;
            })
            .or_insert_with(|| SermonNote {
                id: Uuid::new_v4().to_string(),
                sermon_id: sermon_id.to_string(),
                text: text.to_string(),
                created_at: now,
                updated_at: now,
            });
        Ok(Some(note.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sermons::placeholder_catalog;

    fn store() -> CommunityStore {
        let mut store = CommunityStore::seeded(Arc::new(placeholder_catalog()));
        store.set_current_user("member-1").unwrap();
        store
    }

    #[test]
    fn test_update_profile_reconciles_posts() {
        let mut store = store();
        store.create_post("Hello church", None).unwrap();
        let others_before: Vec<Post> = store
            .posts()
            .iter()
            .filter(|p| p.author.id != "member-1")
            .cloned()
            .collect();

        store
            .update_user_profile(ProfilePatch::display_name("New Name"))
            .unwrap();

        let mine: Vec<&Post> = store
            .posts()
            .iter()
            .filter(|p| p.author.id == "member-1")
            .collect();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|p| p.author.display_name == "New Name"));

        let others_after: Vec<Post> = store
            .posts()
            .iter()
            .filter(|p| p.author.id != "member-1")
            .cloned()
            .collect();
        assert_eq!(others_before, others_after);
    }

    #[test]
    fn test_update_profile_reconciles_prayers() {
        let mut store = store();
        store.set_current_user("member-3").unwrap();
        store
            .update_user_profile(ProfilePatch {
                profile_picture_url: Some("https://img.example/ruth.png".to_string()),
                ..ProfilePatch::default()
            })
            .unwrap();

        let ruths = store
            .prayers()
            .into_iter()
            .filter(|p| p.author.id == "member-3")
            .collect::<Vec<_>>();
        assert!(!ruths.is_empty());
        assert!(
            ruths
                .iter()
                .all(|p| p.author.profile_picture_url == "https://img.example/ruth.png")
        );
    }

    #[test]
    fn test_update_requires_sign_in() {
        let mut store = CommunityStore::seeded(Arc::new(placeholder_catalog()));
        assert_eq!(
            store.update_user_profile(ProfilePatch::display_name("X")),
            Err(CommunityError::NotAuthenticated)
        );
    }

    #[test]
    fn test_toggle_like_twice() {
        let mut store = store();
        let id = store.posts()[0].id.clone();
        let before = store.posts()[0].likes;

        let liked = store.toggle_like(&id).unwrap();
        assert_eq!(liked.likes, before + 1);
        assert!(liked.liked_by_me);

        let unliked = store.toggle_like(&id).unwrap();
        assert_eq!(unliked.likes, before);
        assert!(!unliked.liked_by_me);
    }

    #[test]
    fn test_create_post_validation() {
        let mut store = store();
        assert!(matches!(
            store.create_post("   ", None),
            Err(CommunityError::Invalid(_))
        ));
        let post = store
            .create_post(" Picnic after service ", Some(" ".to_string()))
            .unwrap();
        assert_eq!(post.content, "Picnic after service");
        assert_eq!(post.image_url, None);
        assert_eq!(store.posts()[0].id, post.id);
    }

    #[test]
    fn test_mark_answered_only_by_author() {
        let mut store = store();
        let mine = store.create_prayer("Exams", "Finals next week", false).unwrap();
        let theirs = store
            .prayers()
            .into_iter()
            .find(|p| p.title == "Healing for my father")
            .unwrap();

        assert!(store.mark_answered(&mine.id).unwrap().answered);
        assert!(matches!(
            store.mark_answered(&theirs.id),
            Err(CommunityError::Forbidden(_))
        ));
    }

    #[test]
    fn test_search_members() {
        let store = store();
        let hits = store.search_members("choir");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "member-1");
        assert_eq!(store.search_members("deacons")[0].id, "member-2");
        assert_eq!(store.search_members("").len(), 4);
    }

    #[test]
    fn test_upcoming_events_sorted() {
        let store = store();
        let events = store.upcoming_events(Utc::now());
        let ids: Vec<_> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["event-2", "event-1"]);
    }

    #[test]
    fn test_save_note_upsert_and_delete() {
        let mut store = store();
        let first = store.save_note("sermon-1", "Faith over sight").unwrap().unwrap();
        let second = store.save_note("sermon-1", "Faith over fear").unwrap().unwrap();
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(store.note("sermon-1").unwrap().text, "Faith over fear");

        assert_eq!(store.save_note("sermon-1", " ").unwrap(), None);
        assert!(store.note("sermon-1").is_none());

        assert!(matches!(
            store.save_note("sermon-404", "x"),
            Err(CommunityError::NotFound { .. })
        ));
    }

    #[test]
    fn test_member_by_email_case_insensitive() {
        let store = store();
        assert_eq!(
            store.member_by_email(" Grace@Kadda.Church ").unwrap().id,
            "member-1"
        );
    }
}
