//! Conversation threads and the per-session conversation store.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Title used when neither the caller nor the first message supplies one.
const UNTITLED: &str = "Untitled conversation";

/// Maximum characters taken from the first user message for a derived title.
const DERIVED_TITLE_CHARS: usize = 40;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// Transient state of a bot message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Optimistic placeholder awaiting the model response.
    Loading,
    /// The model call failed; the text is a user-visible error.
    Error,
}

/// A single chat message.
///
/// A message is final once its status is anything other than
/// [`MessageStatus::Loading`]. Final messages are immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,
}

impl Message {
    fn new(sender: Sender, text: impl Into<String>, status: Option<MessageStatus>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
            status,
        }
    }

    /// A message typed by the user.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text, None)
    }

    /// A finished bot reply.
    #[must_use]
    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(Sender::Bot, text, None)
    }

    /// An empty bot placeholder rendered while the model call is in flight.
    #[must_use]
    pub fn loading() -> Self {
        Self::new(Sender::Bot, "", Some(MessageStatus::Loading))
    }

    /// Finalize this placeholder with the model's reply, keeping its id.
    #[must_use]
    pub fn resolve(&self, text: impl Into<String>) -> Self {
        Self {
            id: self.id.clone(),
            text: text.into(),
            sender: self.sender,
            timestamp: Utc::now(),
            status: None,
        }
    }

    /// Finalize this placeholder as an error marker, keeping its id.
    #[must_use]
    pub fn fail(&self, text: impl Into<String>) -> Self {
        Self {
            id: self.id.clone(),
            text: text.into(),
            sender: self.sender,
            timestamp: Utc::now(),
            status: Some(MessageStatus::Error),
        }
    }

    /// Whether the message has left the loading state.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.status != Some(MessageStatus::Loading)
    }
}

/// Why a conversation operation was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("conversation {0} not found")]
    UnknownConversation(String),
    #[error("message {0} not found")]
    UnknownMessage(String),
    #[error("message {0} is already final")]
    MessageFinalized(String),
    #[error("title must not be empty")]
    EmptyTitle,
}

/// Result of appending a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum AppendOutcome {
    Appended,
    /// A message with the same id was already present; nothing changed.
    Duplicate,
}

/// Insertion-ordered messages keyed by id.
///
/// Replacement goes through the id map so a placeholder is overwritten in
/// place instead of being spliced by position.
#[derive(Debug, Clone, Default)]
struct MessageLog {
    order: Vec<String>,
    by_id: HashMap<String, Message>,
}

impl MessageLog {
    fn from_messages(messages: impl IntoIterator<Item = Message>) -> Self {
        let mut log = Self::default();
        for message in messages {
            let _ = log.insert(message);
        }
        log
    }

    fn insert(&mut self, message: Message) -> AppendOutcome {
        if self.by_id.contains_key(&message.id) {
            return AppendOutcome::Duplicate;
        }
        self.order.push(message.id.clone());
        self.by_id.insert(message.id.clone(), message);
        AppendOutcome::Appended
    }

    fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    fn replace(&mut self, message: Message) -> Result<(), ConversationError> {
        let slot = self
            .by_id
            .get_mut(&message.id)
            .ok_or_else(|| ConversationError::UnknownMessage(message.id.clone()))?;
        if slot.is_final() {
            return Err(ConversationError::MessageFinalized(message.id));
        }
        *slot = message;
        Ok(())
    }

    fn to_vec(&self) -> Vec<Message> {
        self.order
            .iter()
            .filter_map(|id| self.by_id.get(id).cloned())
            .collect()
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn clear(&mut self) {
        self.order.clear();
        self.by_id.clear();
    }

    fn take(&mut self) -> Vec<Message> {
        let messages = self.to_vec();
        self.clear();
        messages
    }
}

/// A named, saved sequence of chat messages.
#[derive(Debug, Clone)]
pub struct ConversationThread {
    id: String,
    title: String,
    created_at: DateTime<Utc>,
    messages: MessageLog,
}

/// Serializable snapshot of a thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadView {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<Message>,
}

/// Listing entry for the conversation sidebar.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSummary {
    pub id: String,
    pub title: String,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
}

impl ConversationThread {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.messages.to_vec()
    }

    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn to_view(&self) -> ThreadView {
        ThreadView {
            id: self.id.clone(),
            title: self.title.clone(),
            created_at: self.created_at,
            messages: self.messages.to_vec(),
        }
    }

    fn summary(&self) -> ThreadSummary {
        ThreadSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            message_count: self.messages.len(),
            created_at: self.created_at,
        }
    }
}

/// Saved threads plus the active pointer for one client session.
///
/// When no thread is active the session is in the "new conversation" state
/// and messages accumulate in a transient draft until saved.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    /// Newest first.
    threads: Vec<ConversationThread>,
    active: Option<String>,
    draft: MessageLog,
}

impl ConversationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the active thread, if any.
    #[must_use]
    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Messages currently on screen: the active thread or the draft.
    #[must_use]
    pub fn active_messages(&self) -> Vec<Message> {
        match self.active.as_deref().and_then(|id| self.thread(id)) {
            Some(thread) => thread.messages(),
            None => self.draft.to_vec(),
        }
    }

    #[must_use]
    pub fn thread(&self, id: &str) -> Option<&ConversationThread> {
        self.threads.iter().find(|t| t.id == id)
    }

    fn thread_mut(&mut self, id: &str) -> Option<&mut ConversationThread> {
        self.threads.iter_mut().find(|t| t.id == id)
    }

    #[must_use]
    pub fn list(&self) -> Vec<ThreadSummary> {
        self.threads.iter().map(ConversationThread::summary).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// Enter the "new conversation" state: no active thread, empty draft.
    pub fn new_conversation(&mut self) {
        self.active = None;
        self.draft.clear();
    }

    /// Make `id` the active thread.
    ///
    /// An unknown id (for example one deleted elsewhere) falls back to the
    /// new-conversation state and returns `false`.
    pub fn select_conversation(&mut self, id: &str) -> bool {
        if self.thread(id).is_some() {
            self.active = Some(id.to_string());
            self.draft.clear();
            true
        } else {
            tracing::debug!(conversation_id = %id, "Selected unknown conversation, starting new");
            self.new_conversation();
            false
        }
    }

    /// Save `messages` as a new thread and make it active.
    ///
    /// A blank title is derived from the first user message.
    pub fn save_new(&mut self, messages: Vec<Message>, title: &str) -> String {
        let log = MessageLog::from_messages(messages);
        let title = if title.trim().is_empty() {
            derive_title(&log.to_vec())
        } else {
            title.trim().to_string()
        };

        let thread = ConversationThread {
            id: Uuid::new_v4().to_string(),
            title,
            created_at: Utc::now(),
            messages: log,
        };
        let id = thread.id.clone();
        self.threads.insert(0, thread);
        self.active = Some(id.clone());
        self.draft.clear();

        tracing::debug!(conversation_id = %id, "Saved new conversation");
        id
    }

    /// Save the accumulated draft as a new thread.
    pub fn save_draft(&mut self, title: &str) -> String {
        let messages = self.draft.take();
        self.save_new(messages, title)
    }

    /// Append to a saved thread. Re-delivery of an id already present is a no-op.
    pub fn append_message(
        &mut self,
        conversation_id: &str,
        message: Message,
    ) -> Result<AppendOutcome, ConversationError> {
        let thread = self
            .thread_mut(conversation_id)
            .ok_or_else(|| ConversationError::UnknownConversation(conversation_id.to_string()))?;
        Ok(thread.messages.insert(message))
    }

    /// Append to the active thread, or to the draft when none is active.
    pub fn push(&mut self, message: Message) -> AppendOutcome {
        let active = self.active.clone();
        match active.as_deref().and_then(|id| self.thread_mut(id)) {
            Some(thread) => thread.messages.insert(message),
            None => self.draft.insert(message),
        }
    }

    /// Replace a loading message in a saved thread by id.
    pub fn replace_message(
        &mut self,
        conversation_id: &str,
        message: Message,
    ) -> Result<(), ConversationError> {
        let thread = self
            .thread_mut(conversation_id)
            .ok_or_else(|| ConversationError::UnknownConversation(conversation_id.to_string()))?;
        thread.messages.replace(message)
    }

    /// Replace a loading message wherever it currently lives.
    ///
    /// The placeholder may have moved from the draft into a saved thread
    /// while the model call was in flight.
    pub fn settle(&mut self, message: Message) -> Result<(), ConversationError> {
        if self.draft.contains(&message.id) {
            return self.draft.replace(message);
        }
        match self
            .threads
            .iter_mut()
            .find(|t| t.messages.contains(&message.id))
        {
            Some(thread) => thread.messages.replace(message),
            None => Err(ConversationError::UnknownMessage(message.id)),
        }
    }

    /// Remove a thread. Deleting the active thread resets to a new conversation.
    pub fn delete_conversation(&mut self, id: &str) -> bool {
        let before = self.threads.len();
        self.threads.retain(|t| t.id != id);
        let removed = self.threads.len() != before;
        if removed && self.active.as_deref() == Some(id) {
            self.new_conversation();
        }
        removed
    }

    /// Rename a thread. Blank titles are rejected and leave the title unchanged.
    pub fn rename_conversation(
        &mut self,
        id: &str,
        new_title: &str,
    ) -> Result<(), ConversationError> {
        let title = new_title.trim();
        if title.is_empty() {
            return Err(ConversationError::EmptyTitle);
        }
        let thread = self
            .thread_mut(id)
            .ok_or_else(|| ConversationError::UnknownConversation(id.to_string()))?;
        thread.title = title.to_string();
        Ok(())
    }

    /// Whether the draft holds unsaved messages.
    #[must_use]
    pub fn has_draft(&self) -> bool {
        !self.draft.is_empty()
    }
}

fn derive_title(messages: &[Message]) -> String {
    messages
        .iter()
        .find(|m| m.sender == Sender::User && !m.text.trim().is_empty())
        .map_or_else(
            || UNTITLED.to_string(),
            |m| {
                let text = m.text.trim();
                let mut title: String = text.chars().take(DERIVED_TITLE_CHARS).collect();
                if text.chars().count() > DERIVED_TITLE_CHARS {
                    title.push('…');
                }
                title
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_thread() -> (ConversationStore, String) {
        let mut store = ConversationStore::new();
        let id = store.save_new(vec![Message::user("Hello")], "Greetings");
        (store, id)
    }

    #[test]
    fn test_save_new_becomes_active() {
        let (store, id) = store_with_thread();
        assert_eq!(store.active_id(), Some(id.as_str()));
        assert_eq!(store.len(), 1);
        assert_eq!(store.active_messages().len(), 1);
        assert_eq!(store.thread(&id).unwrap().title(), "Greetings");
    }

    #[test]
    fn test_save_draft_derives_title() {
        let mut store = ConversationStore::new();
        let _ = store.push(Message::user("How do I join the choir?"));
        let _ = store.push(Message::bot("Talk to the worship ministry."));
        assert!(store.has_draft());

        let id = store.save_draft("   ");
        let thread = store.thread(&id).unwrap();
        assert_eq!(thread.title(), "How do I join the choir?");
        assert_eq!(thread.message_count(), 2);
        assert!(!store.has_draft());
    }

    #[test]
    fn test_derived_title_truncates() {
        let long = "a".repeat(60);
        let title = derive_title(&[Message::user(long)]);
        assert_eq!(title.chars().count(), DERIVED_TITLE_CHARS + 1);
        assert_eq!(derive_title(&[]), UNTITLED);
    }

    #[test]
    fn test_select_unknown_falls_back_to_new() {
        let (mut store, id) = store_with_thread();
        let _ = store.push(Message::user("still here"));

        assert!(!store.select_conversation("missing"));
        assert_eq!(store.active_id(), None);
        assert!(store.active_messages().is_empty());

        assert!(store.select_conversation(&id));
        assert_eq!(store.active_messages().len(), 2);
    }

    #[test]
    fn test_append_is_idempotent_on_id() {
        let (mut store, id) = store_with_thread();
        let msg = Message::bot("Welcome!");

        assert_eq!(
            store.append_message(&id, msg.clone()),
            Ok(AppendOutcome::Appended)
        );
        assert_eq!(store.append_message(&id, msg), Ok(AppendOutcome::Duplicate));
        assert_eq!(store.thread(&id).unwrap().message_count(), 2);
    }

    #[test]
    fn test_append_unknown_conversation() {
        let mut store = ConversationStore::new();
        assert_eq!(
            store.append_message("nope", Message::user("hi")),
            Err(ConversationError::UnknownConversation("nope".to_string()))
        );
    }

    #[test]
    fn test_distinct_ids_with_placeholder_replacement() {
        let (mut store, id) = store_with_thread();
        let first = Message::loading();
        let second = Message::loading();

        let _ = store.append_message(&id, first.clone()).unwrap();
        let _ = store.append_message(&id, Message::user("again")).unwrap();
        store.replace_message(&id, first.resolve("one")).unwrap();
        let _ = store.append_message(&id, second.clone()).unwrap();
        let _ = store.append_message(&id, first.clone()).unwrap();
        store.replace_message(&id, second.fail("oops")).unwrap();

        let messages = store.thread(&id).unwrap().messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].id, first.id);
        assert_eq!(messages[1].text, "one");
        assert_eq!(messages[3].status, Some(MessageStatus::Error));
    }

    #[test]
    fn test_finalized_message_is_immutable() {
        let (mut store, id) = store_with_thread();
        let placeholder = Message::loading();
        let _ = store.append_message(&id, placeholder.clone()).unwrap();
        store.replace_message(&id, placeholder.resolve("first")).unwrap();

        assert_eq!(
            store.replace_message(&id, placeholder.resolve("second")),
            Err(ConversationError::MessageFinalized(placeholder.id.clone()))
        );
        assert_eq!(store.thread(&id).unwrap().messages()[1].text, "first");
    }

    #[test]
    fn test_settle_follows_placeholder_into_saved_thread() {
        let mut store = ConversationStore::new();
        let _ = store.push(Message::user("Pray for me"));
        let placeholder = Message::loading();
        let _ = store.push(placeholder.clone());

        let id = store.save_draft("Prayer");
        store.settle(placeholder.resolve("We are praying.")).unwrap();

        let messages = store.thread(&id).unwrap().messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].is_final());
        assert_eq!(messages[1].text, "We are praying.");
    }

    #[test]
    fn test_rename_rejects_blank_titles() {
        let (mut store, id) = store_with_thread();

        assert_eq!(
            store.rename_conversation(&id, ""),
            Err(ConversationError::EmptyTitle)
        );
        assert_eq!(
            store.rename_conversation(&id, "   "),
            Err(ConversationError::EmptyTitle)
        );
        assert_eq!(store.thread(&id).unwrap().title(), "Greetings");

        store.rename_conversation(&id, "  Hello again ").unwrap();
        assert_eq!(store.thread(&id).unwrap().title(), "Hello again");
    }

    #[test]
    fn test_delete_active_resets_state() {
        let (mut store, id) = store_with_thread();

        assert!(store.delete_conversation(&id));
        assert_eq!(store.active_id(), None);
        assert!(store.active_messages().is_empty());
        assert!(store.is_empty());
        assert!(!store.delete_conversation(&id));
    }

    #[test]
    fn test_delete_inactive_keeps_active() {
        let (mut store, first) = store_with_thread();
        let second = store.save_new(vec![Message::user("Second")], "Second");
        assert!(store.delete_conversation(&first));
        assert_eq!(store.active_id(), Some(second.as_str()));
    }

    #[test]
    fn test_list_newest_first() {
        let (mut store, first) = store_with_thread();
        let second = store.save_new(Vec::new(), "Later");
        let ids: Vec<_> = store.list().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[test]
    fn test_message_serializes_camel_case() {
        let json = serde_json::to_value(Message::loading()).unwrap();
        assert_eq!(json["sender"], "bot");
        assert_eq!(json["status"], "loading");

        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert!(json.get("status").is_none());
    }
}
