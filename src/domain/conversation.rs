use crate::domain::message::Message;
use time::OffsetDateTime;
use uuid::Uuid;

/// A conversation between exactly one mentor and one student, including its
/// full message log in chronological order.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub(crate) id: Uuid,
    pub(crate) mentor_id: String,
    pub(crate) student_id: String,
    pub(crate) is_active: bool,
    pub(crate) messages: Vec<Message>,
    pub(crate) last_message_at: OffsetDateTime,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

impl Conversation {
    pub(crate) fn from_parts(summary: ConversationSummary, messages: Vec<Message>) -> Self {
        Self {
            id: summary.id,
            mentor_id: summary.mentor_id,
            student_id: summary.student_id,
            is_active: summary.is_active,
            messages,
            last_message_at: summary.last_message_at,
            created_at: summary.created_at,
            updated_at: summary.updated_at,
        }
    }
}

/// Conversation head without the message log, used for listings and for
/// participant checks that do not need the full history.
#[derive(Debug, Clone)]
pub struct ConversationSummary {
    pub(crate) id: Uuid,
    pub(crate) mentor_id: String,
    pub(crate) student_id: String,
    pub(crate) is_active: bool,
    pub(crate) last_message_at: OffsetDateTime,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

impl ConversationSummary {
    /// Whether `user_id` is the mentor or the student of this conversation.
    #[must_use]
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.mentor_id == user_id || self.student_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(mentor_id: &str, student_id: &str) -> ConversationSummary {
        let now = OffsetDateTime::now_utc();
        ConversationSummary {
            id: Uuid::new_v4(),
            mentor_id: mentor_id.to_string(),
            student_id: student_id.to_string(),
            is_active: true,
            last_message_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_both_participants_recognized() {
        let conversation = summary("mentor_1", "student_1");
        assert!(conversation.is_participant("mentor_1"));
        assert!(conversation.is_participant("student_1"));
    }

    #[test]
    fn test_stranger_is_not_a_participant() {
        let conversation = summary("mentor_1", "student_1");
        assert!(!conversation.is_participant("stranger_1"));
    }
}
