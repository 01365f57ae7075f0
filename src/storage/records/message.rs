use time::OffsetDateTime;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
pub(crate) struct MessageRecord {
    pub id: Uuid,
    pub sender_id: String,
    pub content: String,
    pub was_redacted: bool,
    pub created_at: OffsetDateTime,
}

impl From<MessageRecord> for crate::domain::message::Message {
    fn from(record: MessageRecord) -> Self {
        Self {
            id: record.id,
            sender_id: record.sender_id,
            content: record.content,
            was_redacted: record.was_redacted,
            created_at: record.created_at,
        }
    }
}
