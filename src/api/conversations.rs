use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::api::schemas::conversations::{
    ConversationSummaryView, ConversationView, SendMessage, StartConversation,
};
use crate::error::Result;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

/// Starts a conversation between a mentor and a student, or returns the
/// existing one for the pair.
///
/// # Errors
/// Returns `AppError::Validation` if either participant id is missing or blank.
pub async fn start_conversation(
    _auth_user: AuthUser,

    State(state): State<AppState>,

    Json(body): Json<StartConversation>,
) -> Result<impl IntoResponse> {
    let mentor_id = body.mentor_id.unwrap_or_default();
    let student_id = body.student_id.unwrap_or_default();

    let (conversation, created) =
        state.conversation_service.start(&mentor_id, &student_id).await?;

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(ConversationView::from(conversation))))
}

/// Lists all conversations the given user participates in, most recently
/// active first.
pub async fn list_conversations(
    _auth_user: AuthUser,

    State(state): State<AppState>,

    Path(user_id): Path<String>,
) -> Result<impl IntoResponse> {
    let summaries = state.conversation_service.list_for_participant(&user_id).await?;

    let views: Vec<ConversationSummaryView> =
        summaries.into_iter().map(ConversationSummaryView::from).collect();

    Ok(Json(views))
}

/// Fetches one conversation with its full message history.
///
/// # Errors
/// Returns `AppError::NotFound` if the conversation does not exist.
pub async fn get_conversation(
    _auth_user: AuthUser,

    State(state): State<AppState>,

    Path(conversation_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let conversation = state.conversation_service.get(conversation_id).await?;

    Ok(Json(ConversationView::from(conversation)))
}

/// Appends a message to a conversation and returns the updated conversation.
///
/// # Errors
/// Returns `AppError::NotFound` if the conversation does not exist.
/// Returns `AppError::NotAuthorized` if the sender is not a participant.
/// Returns `AppError::Validation` if the sender id or content is missing or blank.
pub async fn send_message(
    _auth_user: AuthUser,

    State(state): State<AppState>,

    Path(conversation_id): Path<Uuid>,

    Json(body): Json<SendMessage>,
) -> Result<impl IntoResponse> {
    let sender_id = body.sender_id.unwrap_or_default();
    let content = body.content.unwrap_or_default();

    let conversation =
        state.conversation_service.append_message(conversation_id, &sender_id, &content).await?;

    Ok((StatusCode::CREATED, Json(ConversationView::from(conversation))))
}
