use crate::domain::conversation::ConversationSummary;
use crate::domain::message::Message;
use crate::error::{AppError, Result};
use crate::storage::records::{ConversationRecord, MessageRecord};
use sqlx::PgConnection;
use uuid::Uuid;

#[derive(Clone, Debug, Default)]
pub struct ConversationRepository {}

impl ConversationRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// Finds the active conversation for the unordered (mentor, student) pair,
    /// creating it if none exists. Returns the conversation and whether this
    /// call created it.
    ///
    /// Concurrent calls for the same pair are resolved by the partial unique
    /// index on `(LEAST(mentor_id, student_id), GREATEST(mentor_id, student_id))`:
    /// exactly one insert wins, every other caller gets the winner's row.
    ///
    /// # Errors
    /// Returns `AppError::Database` if a query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn find_or_create(
        &self,
        conn: &mut PgConnection,
        mentor_id: &str,
        student_id: &str,
    ) -> Result<(ConversationSummary, bool)> {
        let inserted = sqlx::query_as::<_, ConversationRecord>(
            r#"
            INSERT INTO conversations (mentor_id, student_id)
            VALUES ($1, $2)
            ON CONFLICT ((LEAST(mentor_id, student_id)), (GREATEST(mentor_id, student_id))) WHERE is_active
            DO NOTHING
            RETURNING id, mentor_id, student_id, is_active, last_message_at, created_at, updated_at
            "#,
        )
        .bind(mentor_id)
        .bind(student_id)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(record) = inserted {
            return Ok((record.into(), true));
        }

        // Lost the insert race (or the pair already talked). This statement
        // takes a fresh snapshot, so a concurrently committed winner is
        // visible here.
        let existing = sqlx::query_as::<_, ConversationRecord>(
            r#"
            SELECT id, mentor_id, student_id, is_active, last_message_at, created_at, updated_at
            FROM conversations
            WHERE LEAST(mentor_id, student_id) = LEAST($1, $2)
              AND GREATEST(mentor_id, student_id) = GREATEST($1, $2)
              AND is_active
            "#,
        )
        .bind(mentor_id)
        .bind(student_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::Internal)?;

        Ok((existing.into(), false))
    }

    /// Fetches a conversation head by id.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn find_by_id(
        &self,
        conn: &mut PgConnection,
        conversation_id: Uuid,
    ) -> Result<Option<ConversationSummary>> {
        let record = sqlx::query_as::<_, ConversationRecord>(
            r#"
            SELECT id, mentor_id, student_id, is_active, last_message_at, created_at, updated_at
            FROM conversations
            WHERE id = $1
            "#,
        )
        .bind(conversation_id)
        .fetch_optional(conn)
        .await?;

        Ok(record.map(Into::into))
    }

    /// Lists every conversation where the participant is the mentor or the
    /// student, most recently active first.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn list_for_participant(
        &self,
        conn: &mut PgConnection,
        participant_id: &str,
    ) -> Result<Vec<ConversationSummary>> {
        let records = sqlx::query_as::<_, ConversationRecord>(
            r#"
            SELECT id, mentor_id, student_id, is_active, last_message_at, created_at, updated_at
            FROM conversations
            WHERE mentor_id = $1 OR student_id = $1
            ORDER BY last_message_at DESC, id ASC
            "#,
        )
        .bind(participant_id)
        .fetch_all(conn)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }

    /// Fetches a conversation's messages in chronological order.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn fetch_messages(&self, conn: &mut PgConnection, conversation_id: Uuid) -> Result<Vec<Message>> {
        let messages = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, sender_id, content, was_redacted, created_at
            FROM conversation_messages
            WHERE conversation_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(conn)
        .await?;

        Ok(messages.into_iter().map(Into::into).collect())
    }

    /// Appends a message and bumps the conversation's recency timestamp in a
    /// single statement, so the two can never drift apart.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the conversation does not exist.
    /// Returns `AppError::Database` if the insert fails.
    #[tracing::instrument(level = "debug", skip(self, conn, content))]
    pub(crate) async fn append_message(
        &self,
        conn: &mut PgConnection,
        conversation_id: Uuid,
        sender_id: &str,
        content: &str,
        was_redacted: bool,
    ) -> Result<Message> {
        let result = sqlx::query_as::<_, MessageRecord>(
            r#"
            WITH appended AS (
                INSERT INTO conversation_messages (conversation_id, sender_id, content, was_redacted)
                VALUES ($1, $2, $3, $4)
                RETURNING id, sender_id, content, was_redacted, created_at
            ), bumped AS (
                UPDATE conversations
                SET last_message_at = (SELECT created_at FROM appended),
                    updated_at = NOW()
                WHERE id = $1
            )
            SELECT id, sender_id, content, was_redacted, created_at FROM appended
            "#,
        )
        .bind(conversation_id)
        .bind(sender_id)
        .bind(content)
        .bind(was_redacted)
        .fetch_one(conn)
        .await;

        match result {
            Ok(record) => Ok(record.into()),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("23503") => {
                // Foreign key violation: conversation_id does not exist
                Err(AppError::NotFound)
            }
            Err(e) => Err(AppError::Database(e)),
        }
    }
}
