//! Conversational assistant flow and the send-message path that drives it.

use serde::{Deserialize, Serialize};

use super::{Flow, Validate, run_flow};
use crate::error::{ValidationError, require_non_blank};
use crate::llm::{ChatMessage, ModelClient};
use crate::memory::LongTermMemory;
use crate::session::{Message, Sender};
use crate::workspace::SharedWorkspace;

/// Finalized messages from the visible conversation sent as history.
pub const HISTORY_TURNS: usize = 10;

/// Snippets pulled from long-term memory per message.
pub const MEMORY_SNIPPETS: usize = 3;

/// Longest accepted user message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// Text shown in place of a reply when the model call fails.
pub const ERROR_REPLY: &str = "Sorry, I couldn't reach the assistant just now. Please try again.";

const SYSTEM_PROMPT: &str = "You are KaddaBot, the warm and encouraging assistant of the \
KaddaConnect church community. Help members with questions about faith, scripture, church \
life, events, and prayer. Keep answers concise and kind. When you are unsure, say so and \
suggest speaking with a pastor. Respond with a JSON object of the form {\"reply\": string}.";

/// One prior turn of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub sender: Sender,
    pub text: String,
}

impl From<Message> for HistoryTurn {
    fn from(message: Message) -> Self {
        Self {
            sender: message.sender,
            text: message.text,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AssistantChatInput {
    pub message: String,
    pub history: Vec<HistoryTurn>,
    /// Recalled snippets interpolated into the system prompt.
    pub memory_context: Option<String>,
    pub user_name: Option<String>,
}

impl Validate for AssistantChatInput {
    fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("message", &self.message)?;
        if self.message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ValidationError::new(
                "message",
                format!("must be at most {MAX_MESSAGE_CHARS} characters"),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantChatOutput {
    pub reply: String,
}

impl Validate for AssistantChatOutput {
    fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("reply", &self.reply)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AssistantChat;

impl Flow for AssistantChat {
    const NAME: &'static str = "assistant_chat";
    type Input = AssistantChatInput;
    type Output = AssistantChatOutput;

    fn render(&self, input: &AssistantChatInput) -> Vec<ChatMessage> {
        let mut system = SYSTEM_PROMPT.to_string();
        if let Some(name) = input.user_name.as_deref().filter(|n| !n.trim().is_empty()) {
            system.push_str(&format!("\n\nYou are talking with {}.", name.trim()));
        }
        if let Some(context) = input.memory_context.as_deref().filter(|c| !c.is_empty()) {
            system.push_str("\n\nThings you remember about this member:\n");
            system.push_str(context);
        }

        let mut messages = vec![ChatMessage::system(system)];
        messages.extend(input.history.iter().map(|turn| match turn.sender {
            Sender::User => ChatMessage::user(&turn.text),
            Sender::Bot => ChatMessage::assistant(&turn.text),
        }));
        messages.push(ChatMessage::user(input.message.trim()));
        messages
    }
}

/// The user message and the settled bot reply for one send.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatExchange {
    /// Active thread at send time; `None` while the conversation is unsaved.
    pub conversation_id: Option<String>,
    pub user_message: Message,
    pub reply: Message,
}

/// Send a chat message in the workspace's active conversation.
///
/// The user message and a loading placeholder are recorded before the
/// model call. The placeholder is then replaced in place, by id, with the
/// reply or with an error-status message. The workspace lock is never held
/// across the model call.
pub async fn send_message(
    workspace: &SharedWorkspace,
    model: &dyn ModelClient,
    memory: Option<&dyn LongTermMemory>,
    text: &str,
) -> Result<ChatExchange, ValidationError> {
    require_non_blank("message", text)?;

    let user_message = Message::user(text.trim());
    let placeholder = Message::loading();

    let (mut input, conversation_id, user_id) = {
        let mut ws = workspace.lock();
        let mut history: Vec<HistoryTurn> = ws
            .conversations
            .active_messages()
            .into_iter()
            .filter(|m| m.status.is_none())
            .rev()
            .take(HISTORY_TURNS)
            .map(HistoryTurn::from)
            .collect();
        history.reverse();

        let _ = ws.conversations.push(user_message.clone());
        let _ = ws.conversations.push(placeholder.clone());

        let user = ws.community.current_user();
        let input = AssistantChatInput {
            message: user_message.text.clone(),
            history,
            memory_context: None,
            user_name: user.map(|p| p.display_name.clone()),
        };
        (
            input,
            ws.conversations.active_id().map(str::to_string),
            user.map(|p| p.id.clone()),
        )
    };

    if let (Some(memory), Some(user_id)) = (memory, user_id.as_deref()) {
        let recalled = memory
            .retrieve(user_id, &user_message.text, MEMORY_SNIPPETS)
            .await;
        if !recalled.retrieved_context.is_empty() {
            input.memory_context = Some(recalled.retrieved_context);
        }
    }

    let (reply, succeeded) = match run_flow(model, &AssistantChat, &input).await {
        Ok(output) => (placeholder.resolve(output.reply), true),
        Err(e) => {
            tracing::warn!(
                name: "chat.reply.failed",
                message_id = %placeholder.id,
                error = %e,
                "Assistant reply failed"
            );
            (placeholder.fail(ERROR_REPLY), false)
        }
    };

    if let Err(e) = workspace.lock().conversations.settle(reply.clone()) {
        // The thread was deleted while the call was in flight.
        tracing::debug!(message_id = %reply.id, error = %e, "Placeholder no longer present");
    }

    if succeeded && let (Some(memory), Some(user_id)) = (memory, user_id.as_deref()) {
        let stored = memory
            .store(
                user_id,
                &user_message.text,
                serde_json::json!({ "source": "chat", "messageId": user_message.id }),
            )
            .await;
        if !stored.success {
            tracing::warn!(error = ?stored.error, "Failed to store chat message in memory");
        }
    }

    Ok(ChatExchange {
        conversation_id,
        user_message,
        reply,
    })
}
