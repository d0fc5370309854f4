//! Per-client-session state.
//!
//! A [`Workspace`] bundles the conversation store, the community store, and
//! the persisted sign-in state of one client session. The
//! [`WorkspaceRegistry`] maps session ids to workspaces; nothing is shared
//! between sessions apart from the read-only sermon archive.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::{
    AUTH_STORAGE_KEY, AuthError, AuthState, AuthStore, AuthUser, KeyValueStore, MIN_PASSWORD_CHARS,
};
use crate::community::{CommunityError, CommunityStore, Profile, ProfilePatch};
use crate::error::{ValidationError, require_non_blank};
use crate::session::ConversationStore;
use crate::sermons::Sermon;

/// Idle time after which a workspace is dropped (30 minutes).
pub const DEFAULT_WORKSPACE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug)]
pub struct Workspace {
    pub conversations: ConversationStore,
    pub community: CommunityStore,
    auth: AuthStore,
}

fn validate_email(email: &str) -> Result<(), ValidationError> {
    require_non_blank("email", email)?;
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(ValidationError::new("email", "must be an email address")),
    }
}

impl Workspace {
    /// Seeded community data, signed in as whoever `auth` remembers.
    #[must_use]
    pub fn open(sermons: Arc<Vec<Sermon>>, auth: AuthStore) -> Self {
        let mut workspace = Self {
            conversations: ConversationStore::new(),
            community: CommunityStore::seeded(sermons),
            auth,
        };
        if let Some(user) = workspace.auth.state().user().cloned() {
            workspace.bind(&user);
        }
        workspace
    }

    /// A workspace whose sign-in state lives only in memory.
    #[must_use]
    pub fn detached(sermons: Arc<Vec<Sermon>>) -> Self {
        Self::open(sermons, AuthStore::in_memory())
    }

    #[must_use]
    pub fn auth_state(&self) -> &AuthState {
        self.auth.state()
    }

    /// Make `user` the current member, adding a profile if none exists.
    fn bind(&mut self, user: &AuthUser) {
        if self.community.profile(&user.id).is_none() {
            let mut profile = Profile::new(&user.id, &user.display_name);
            profile.email = Some(user.email.clone());
            self.community.add_member(profile);
        }
        // The profile was ensured above.
        let _ = self.community.set_current_user(&user.id);
    }

    fn sign_in(&mut self, profile: &Profile, email: &str) -> Result<AuthState, AuthError> {
        let user = AuthUser {
            id: profile.id.clone(),
            email: email.to_string(),
            display_name: profile.display_name.clone(),
        };
        let state = self.auth.persist(user.clone())?.clone();
        self.bind(&user);
        tracing::info!(name: "auth.signed_in", user_id = %user.id, "Member signed in");
        Ok(state)
    }

    /// Sign in by email. A known member's profile is reused; an unknown
    /// email gets a fresh profile named after its local part.
    pub fn login(&mut self, email: &str, password: &str) -> Result<AuthState, AuthError> {
        validate_email(email)?;
        require_non_blank("password", password)?;
        let email = email.trim();

        let profile = match self.community.member_by_email(email) {
            Some(existing) => existing.clone(),
            None => {
                let name = email.split('@').next().unwrap_or(email);
                let mut profile = Profile::new(format!("member-{}", Uuid::new_v4()), name);
                profile.email = Some(email.to_string());
                self.community.add_member(profile.clone());
                profile
            }
        };
        self.sign_in(&profile, email)
    }

    pub fn signup(
        &mut self,
        display_name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthState, AuthError> {
        require_non_blank("displayName", display_name)?;
        validate_email(email)?;
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(ValidationError::new(
                "password",
                format!("must be at least {MIN_PASSWORD_CHARS} characters"),
            )
            .into());
        }
        let email = email.trim();
        if self.community.member_by_email(email).is_some() {
            return Err(AuthError::EmailTaken(email.to_string()));
        }

        let mut profile = Profile::new(format!("member-{}", Uuid::new_v4()), display_name.trim());
        profile.email = Some(email.to_string());
        self.community.add_member(profile.clone());
        self.sign_in(&profile, email)
    }

    /// Update the signed-in member's profile. A new display name is also
    /// written to the persisted sign-in record so a reopened workspace
    /// restores the current name.
    pub fn update_profile(&mut self, patch: ProfilePatch) -> Result<Profile, CommunityError> {
        let profile = self.community.update_user_profile(patch)?;
        let stale = self
            .auth
            .state()
            .user()
            .filter(|u| u.id == profile.id && u.display_name != profile.display_name)
            .cloned();
        if let Some(user) = stale {
            let user = AuthUser {
                display_name: profile.display_name.clone(),
                ..user
            };
            if let Err(e) = self.auth.persist(user) {
                tracing::warn!(name: "auth.refresh.failed", user_id = %profile.id, error = %e, "Failed to refresh stored display name");
            }
        }
        Ok(profile)
    }

    pub fn logout(&mut self) -> Result<(), AuthError> {
        self.auth.clear()?;
        self.community.clear_current_user();
        tracing::info!(name: "auth.signed_out", "Member signed out");
        Ok(())
    }
}

#[derive(Debug)]
struct SharedInner {
    workspace: Mutex<Workspace>,
    last_activity: RwLock<DateTime<Utc>>,
}

/// A workspace handle shared between requests of one session.
#[derive(Debug, Clone)]
pub struct SharedWorkspace {
    inner: Arc<SharedInner>,
}

impl SharedWorkspace {
    #[must_use]
    pub fn new(workspace: Workspace) -> Self {
        Self {
            inner: Arc::new(SharedInner {
                workspace: Mutex::new(workspace),
                last_activity: RwLock::new(Utc::now()),
            }),
        }
    }

    /// Lock the workspace and record activity.
    ///
    /// Store operations cannot leave the workspace half-updated, so a
    /// poisoned lock is recovered rather than propagated. Never hold the
    /// guard across an `.await`.
    pub fn lock(&self) -> MutexGuard<'_, Workspace> {
        self.touch();
        self.inner
            .workspace
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn touch(&self) {
        *self
            .inner
            .last_activity
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Utc::now();
    }

    #[must_use]
    pub fn last_activity(&self) -> DateTime<Utc> {
        *self
            .inner
            .last_activity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn is_expired_with_timeout(&self, timeout: Duration) -> bool {
        // A last-activity in the future (clock skew) never expires.
        (Utc::now() - self.last_activity())
            .to_std()
            .is_ok_and(|idle| idle > timeout)
    }
}

/// Session id to workspace map.
#[derive(Debug, Clone)]
pub struct WorkspaceRegistry {
    workspaces: Arc<RwLock<HashMap<String, SharedWorkspace>>>,
    sermons: Arc<Vec<Sermon>>,
    auth_backend: Arc<dyn KeyValueStore>,
}

impl WorkspaceRegistry {
    #[must_use]
    pub fn new(sermons: Arc<Vec<Sermon>>, auth_backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            workspaces: Arc::new(RwLock::new(HashMap::new())),
            sermons,
            auth_backend,
        }
    }

    /// Storage key of the auth blob for `session_id`.
    #[must_use]
    pub fn auth_key(session_id: &str) -> String {
        format!("{AUTH_STORAGE_KEY}:{session_id}")
    }

    #[must_use]
    pub fn get(&self, session_id: &str) -> Option<SharedWorkspace> {
        self.workspaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
    }

    /// Get the workspace for a session, opening it if it doesn't exist.
    #[must_use]
    pub fn get_or_create(&self, session_id: &str) -> SharedWorkspace {
        if let Some(existing) = self.get(session_id) {
            return existing;
        }

        let mut guard = self
            .workspaces
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard
            .entry(session_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(name: "workspace.opened", session_id = %session_id, "Opening workspace");
                let auth = AuthStore::load(Arc::clone(&self.auth_backend), Self::auth_key(session_id));
                SharedWorkspace::new(Workspace::open(Arc::clone(&self.sermons), auth))
            })
            .clone()
    }

    pub fn remove(&self, session_id: &str) -> Option<SharedWorkspace> {
        self.workspaces
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.workspaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop workspaces idle longer than `timeout`. Returns how many were
    /// removed. Persisted sign-in state is kept.
    pub fn cleanup_expired(&self, timeout: Duration) -> usize {
        let mut guard = self
            .workspaces
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = guard.len();
        guard.retain(|_, ws| !ws.is_expired_with_timeout(timeout));
        before - guard.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::InMemoryStore;
    use crate::sermons::placeholder_catalog;

    fn registry() -> WorkspaceRegistry {
        WorkspaceRegistry::new(
            Arc::new(placeholder_catalog()),
            Arc::new(InMemoryStore::default()),
        )
    }

    fn detached() -> Workspace {
        Workspace::detached(Arc::new(placeholder_catalog()))
    }

    #[test]
    fn test_login_binds_seeded_member() {
        let mut ws = detached();
        let state = ws.login("GRACE@kadda.church", "secret").unwrap();
        assert!(state.is_authenticated);
        assert_eq!(state.user.unwrap().id, "member-1");
        assert_eq!(ws.community.current_user().unwrap().id, "member-1");
    }

    #[test]
    fn test_login_unknown_email_creates_profile() {
        let mut ws = detached();
        ws.login("newcomer@example.com", "pw").unwrap();
        let user = ws.community.current_user().unwrap();
        assert_eq!(user.display_name, "newcomer");
        assert_eq!(user.email.as_deref(), Some("newcomer@example.com"));
    }

    #[test]
    fn test_login_validation() {
        let mut ws = detached();
        assert!(matches!(ws.login("", "pw"), Err(AuthError::Invalid(_))));
        assert!(matches!(ws.login("not-an-email", "pw"), Err(AuthError::Invalid(_))));
        assert!(matches!(ws.login("a@b.c", "  "), Err(AuthError::Invalid(_))));
        assert!(!ws.auth_state().is_authenticated);
    }

    #[test]
    fn test_signup_rules() {
        let mut ws = detached();
        assert!(matches!(
            ws.signup("Grace", "grace@kadda.church", "longenough"),
            Err(AuthError::EmailTaken(_))
        ));
        assert!(matches!(
            ws.signup("Joy", "joy@example.com", "short"),
            Err(AuthError::Invalid(_))
        ));

        let state = ws.signup("Joy Bello", "joy@example.com", "longenough").unwrap();
        assert_eq!(state.user.unwrap().display_name, "Joy Bello");
        assert!(ws.community.member_by_email("joy@example.com").is_some());
    }

    #[test]
    fn test_logout_clears_user() {
        let mut ws = detached();
        ws.login("grace@kadda.church", "pw").unwrap();
        ws.logout().unwrap();
        assert!(ws.community.current_user().is_none());
        assert_eq!(ws.auth_state(), &AuthState::default());
    }

    #[test]
    fn test_sign_in_is_restored_on_reopen() {
        let registry = registry();
        registry
            .get_or_create("s1")
            .lock()
            .signup("Joy Bello", "joy@example.com", "longenough")
            .unwrap();

        registry.remove("s1");
        let reopened = registry.get_or_create("s1");
        let ws = reopened.lock();
        assert_eq!(ws.community.current_user().unwrap().display_name, "Joy Bello");
    }

    #[test]
    fn test_display_name_change_reaches_stored_sign_in() {
        let registry = registry();
        {
            let shared = registry.get_or_create("s1");
            let mut ws = shared.lock();
            ws.signup("Joy Bello", "joy@example.com", "longenough").unwrap();
            ws.update_profile(ProfilePatch::display_name("Joy B.")).unwrap();
            assert_eq!(ws.auth_state().user().unwrap().display_name, "Joy B.");
        }

        registry.remove("s1");
        let reopened = registry.get_or_create("s1");
        let ws = reopened.lock();
        assert_eq!(ws.auth_state().user().unwrap().display_name, "Joy B.");
        assert_eq!(ws.community.current_user().unwrap().display_name, "Joy B.");
    }

    #[test]
    fn test_profile_update_without_name_change_keeps_record() {
        let mut ws = detached();
        ws.login("grace@kadda.church", "pw").unwrap();
        let before = ws.auth_state().clone();
        let patch = ProfilePatch {
            interests: Some(vec!["choir".to_string()]),
            ..ProfilePatch::default()
        };
        ws.update_profile(patch).unwrap();
        assert_eq!(ws.auth_state(), &before);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let registry = registry();
        registry
            .get_or_create("a")
            .lock()
            .login("grace@kadda.church", "pw")
            .unwrap();
        assert!(registry.get_or_create("b").lock().community.current_user().is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_cleanup_expired() {
        let registry = registry();
        let _ = registry.get_or_create("a");
        assert_eq!(registry.cleanup_expired(Duration::from_secs(60)), 0);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(registry.cleanup_expired(Duration::from_millis(1)), 1);
        assert!(registry.is_empty());
    }
}
