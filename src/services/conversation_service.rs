use crate::domain::conversation::{Conversation, ConversationSummary};
use crate::domain::message::MessageBroadcast;
use crate::domain::redaction;
use crate::error::{AppError, Result};
use crate::services::relay::RoomRelay;
use crate::storage::DbPool;
use crate::storage::conversation_repo::ConversationRepository;
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone, Debug)]
struct Metrics {
    started_total: Counter<u64>,
    appended_total: Counter<u64>,
    redacted_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("alumniconnect-chat");
        Self {
            started_total: meter
                .u64_counter("conversations_started_total")
                .with_description("Total conversation start requests, labelled by whether a row was created")
                .build(),
            appended_total: meter
                .u64_counter("messages_appended_total")
                .with_description("Total message append attempts")
                .build(),
            redacted_total: meter
                .u64_counter("messages_redacted_total")
                .with_description("Messages altered by the redaction filter before storage")
                .build(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ConversationService {
    pool: DbPool,
    repo: ConversationRepository,
    relay: Arc<dyn RoomRelay>,
    metrics: Metrics,
}

impl ConversationService {
    #[must_use]
    pub fn new(pool: DbPool, repo: ConversationRepository, relay: Arc<dyn RoomRelay>) -> Self {
        Self { pool, repo, relay, metrics: Metrics::new() }
    }

    /// Finds or creates the active conversation between a mentor and a student.
    ///
    /// Returns the conversation with its message history, plus whether this
    /// call created a new row.
    ///
    /// # Errors
    /// Returns `AppError::Validation` if either participant id is blank.
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(err(level = "warn"), skip(self))]
    pub async fn start(&self, mentor_id: &str, student_id: &str) -> Result<(Conversation, bool)> {
        if mentor_id.trim().is_empty() {
            return Err(AppError::Validation("mentorId is required".to_string()));
        }
        if student_id.trim().is_empty() {
            return Err(AppError::Validation("studentId is required".to_string()));
        }

        let mut conn = self.pool.acquire().await?;
        let (summary, created) = self.repo.find_or_create(&mut conn, mentor_id, student_id).await?;

        self.metrics
            .started_total
            .add(1, &[KeyValue::new("created", if created { "true" } else { "false" })]);

        let messages =
            if created { Vec::new() } else { self.repo.fetch_messages(&mut conn, summary.id).await? };

        Ok((Conversation::from_parts(summary, messages), created))
    }

    /// Loads a conversation and its full ordered message history.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if no conversation exists with this id.
    #[tracing::instrument(
        err(level = "warn"),
        skip(self, conversation_id),
        fields(conversation_id = %conversation_id)
    )]
    pub async fn get(&self, conversation_id: Uuid) -> Result<Conversation> {
        let mut conn = self.pool.acquire().await?;
        let summary =
            self.repo.find_by_id(&mut conn, conversation_id).await?.ok_or(AppError::NotFound)?;
        let messages = self.repo.fetch_messages(&mut conn, conversation_id).await?;
        Ok(Conversation::from_parts(summary, messages))
    }

    /// Lists every conversation the participant belongs to, most recently active first.
    ///
    /// # Errors
    /// Returns `AppError::Validation` if the participant id is blank.
    #[tracing::instrument(err(level = "warn"), skip(self))]
    pub async fn list_for_participant(&self, participant_id: &str) -> Result<Vec<ConversationSummary>> {
        if participant_id.trim().is_empty() {
            return Err(AppError::Validation("userId is required".to_string()));
        }

        let mut conn = self.pool.acquire().await?;
        self.repo.list_for_participant(&mut conn, participant_id).await
    }

    /// Verifies that `user_id` is one of the conversation's two participants.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the conversation does not exist.
    /// Returns `AppError::NotAuthorized` if the user is not a participant.
    #[tracing::instrument(
        err(level = "warn"),
        skip(self, conversation_id),
        fields(conversation_id = %conversation_id)
    )]
    pub async fn ensure_participant(&self, conversation_id: Uuid, user_id: &str) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        let summary =
            self.repo.find_by_id(&mut conn, conversation_id).await?.ok_or(AppError::NotFound)?;

        if summary.is_participant(user_id) { Ok(()) } else { Err(AppError::NotAuthorized) }
    }

    /// Validates, redacts, persists, and broadcasts a message, returning the
    /// updated conversation with its full history.
    ///
    /// The broadcast only happens after the row is durably stored, so live
    /// subscribers never observe a message that later failed to persist.
    ///
    /// # Errors
    /// Returns `AppError::Validation` if the sender id or content is blank.
    /// Returns `AppError::NotFound` if the conversation does not exist.
    /// Returns `AppError::NotAuthorized` if the sender is not a participant.
    #[tracing::instrument(
        err(level = "warn"),
        skip(self, conversation_id, content),
        fields(conversation_id = %conversation_id)
    )]
    pub async fn append_message(
        &self,
        conversation_id: Uuid,
        sender_id: &str,
        content: &str,
    ) -> Result<Conversation> {
        if sender_id.trim().is_empty() {
            return Err(AppError::Validation("senderId is required".to_string()));
        }
        if content.trim().is_empty() {
            return Err(AppError::Validation("content is required".to_string()));
        }

        let mut conn = self.pool.acquire().await?;
        let summary =
            self.repo.find_by_id(&mut conn, conversation_id).await?.ok_or(AppError::NotFound)?;
        if !summary.is_participant(sender_id) {
            return Err(AppError::NotAuthorized);
        }

        let scrubbed = redaction::redact(content);
        let was_redacted = scrubbed != content;

        let message = match self
            .repo
            .append_message(&mut conn, conversation_id, sender_id, &scrubbed, was_redacted)
            .await
        {
            Ok(message) => {
                tracing::debug!("Message stored");
                self.metrics.appended_total.add(1, &[KeyValue::new("status", "success")]);
                message
            }
            Err(e) => {
                self.metrics.appended_total.add(1, &[KeyValue::new("status", "failure")]);
                return Err(e);
            }
        };

        if was_redacted {
            self.metrics.redacted_total.add(1, &[]);
            tracing::debug!("Redaction filter altered message content");
        }

        // Subscribers only ever see the stored, already-redacted form.
        self.relay.broadcast(conversation_id, MessageBroadcast { conversation_id, message }).await;

        let summary =
            self.repo.find_by_id(&mut conn, conversation_id).await?.ok_or(AppError::NotFound)?;
        let messages = self.repo.fetch_messages(&mut conn, conversation_id).await?;
        Ok(Conversation::from_parts(summary, messages))
    }
}
