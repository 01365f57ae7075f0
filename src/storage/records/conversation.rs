use time::OffsetDateTime;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
pub(crate) struct ConversationRecord {
    pub id: Uuid,
    pub mentor_id: String,
    pub student_id: String,
    pub is_active: bool,
    pub last_message_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<ConversationRecord> for crate::domain::conversation::ConversationSummary {
    fn from(record: ConversationRecord) -> Self {
        Self {
            id: record.id,
            mentor_id: record.mentor_id,
            student_id: record.student_id,
            is_active: record.is_active,
            last_message_at: record.last_message_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}
