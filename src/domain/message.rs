use time::OffsetDateTime;
use uuid::Uuid;

/// A single entry in a conversation's message log.
///
/// `content` is always the redacted form; raw text never leaves the append
/// path. `was_redacted` records whether redaction changed anything.
#[derive(Debug, Clone)]
pub struct Message {
    pub(crate) id: Uuid,
    pub(crate) sender_id: String,
    pub(crate) content: String,
    pub(crate) was_redacted: bool,
    pub(crate) created_at: OffsetDateTime,
}

/// Event fanned out to everyone subscribed to a conversation's room.
#[derive(Debug, Clone)]
pub struct MessageBroadcast {
    pub(crate) conversation_id: Uuid,
    pub(crate) message: Message,
}
