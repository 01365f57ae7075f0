use crate::domain::conversation::{Conversation, ConversationSummary};
use crate::domain::message::Message;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartConversation {
    #[serde(default)]
    pub mentor_id: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    #[serde(default)]
    pub sender_id: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: Uuid,
    pub sender: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub was_redacted: bool,
}

impl From<Message> for MessageView {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            sender: message.sender_id,
            content: message.content,
            timestamp: message.created_at,
            was_redacted: message.was_redacted,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    pub id: Uuid,
    pub mentor_id: String,
    pub student_id: String,
    pub is_active: bool,
    pub messages: Vec<MessageView>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_message_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Conversation> for ConversationView {
    fn from(conversation: Conversation) -> Self {
        Self {
            id: conversation.id,
            mentor_id: conversation.mentor_id,
            student_id: conversation.student_id,
            is_active: conversation.is_active,
            messages: conversation.messages.into_iter().map(MessageView::from).collect(),
            last_message_at: conversation.last_message_at,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummaryView {
    pub id: Uuid,
    pub mentor_id: String,
    pub student_id: String,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub last_message_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<ConversationSummary> for ConversationSummaryView {
    fn from(summary: ConversationSummary) -> Self {
        Self {
            id: summary.id,
            mentor_id: summary.mentor_id,
            student_id: summary.student_id,
            is_active: summary.is_active,
            last_message_at: summary.last_message_at,
            created_at: summary.created_at,
            updated_at: summary.updated_at,
        }
    }
}
