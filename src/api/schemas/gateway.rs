use crate::api::schemas::conversations::MessageView;
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: String,
}

/// Frames a client may send over the gateway socket. The `type` tags reuse
/// the event names the web client already emits.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    #[serde(rename_all = "camelCase")]
    JoinChat { conversation_id: Uuid },
    #[serde(rename_all = "camelCase")]
    SendMessage { conversation_id: Uuid, sender_id: String, content: String },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    #[serde(rename_all = "camelCase")]
    Joined { conversation_id: Uuid },
    #[serde(rename_all = "camelCase")]
    ReceiveMessage { conversation_id: Uuid, message: MessageView },
    Error { code: String, message: String },
}

impl ServerFrame {
    pub(crate) fn error_from(error: &AppError) -> Self {
        let (code, message) = match error {
            AppError::Validation(msg) => ("validation", msg.clone()),
            AppError::NotFound => ("not_found", "Not found".to_string()),
            AppError::NotAuthorized => {
                ("not_authorized", "Not a participant of this conversation".to_string())
            }
            AppError::AuthError => ("unauthorized", "Unauthorized".to_string()),
            AppError::Database(_) | AppError::Internal => {
                ("internal", "Failed to send message".to_string())
            }
        };

        Self::Error { code: code.to_string(), message }
    }

    pub(crate) fn malformed() -> Self {
        Self::Error {
            code: "malformed_frame".to_string(),
            message: "Could not parse frame".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::OffsetDateTime;

    #[test]
    fn test_parses_join_chat_frame() {
        let id = Uuid::new_v4();
        let raw = format!(r#"{{"type":"join_chat","conversationId":"{id}"}}"#);

        let frame: ClientFrame = serde_json::from_str(&raw).expect("frame should parse");
        match frame {
            ClientFrame::JoinChat { conversation_id } => assert_eq!(conversation_id, id),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_parses_send_message_frame() {
        let id = Uuid::new_v4();
        let raw = format!(
            r#"{{"type":"send_message","conversationId":"{id}","senderId":"mentor-1","content":"hi"}}"#
        );

        let frame: ClientFrame = serde_json::from_str(&raw).expect("frame should parse");
        match frame {
            ClientFrame::SendMessage { conversation_id, sender_id, content } => {
                assert_eq!(conversation_id, id);
                assert_eq!(sender_id, "mentor-1");
                assert_eq!(content, "hi");
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_unknown_frame_type() {
        let raw = r#"{"type":"leave_chat","conversationId":"not even checked"}"#;
        assert!(serde_json::from_str::<ClientFrame>(raw).is_err());
    }

    #[test]
    fn test_receive_message_frame_shape() {
        let conversation_id = Uuid::new_v4();
        let message_id = Uuid::new_v4();
        let frame = ServerFrame::ReceiveMessage {
            conversation_id,
            message: MessageView {
                id: message_id,
                sender: "student-1".to_string(),
                content: "[EMAIL REDACTED]".to_string(),
                timestamp: OffsetDateTime::from_unix_timestamp(1_700_000_000)
                    .expect("valid timestamp"),
                was_redacted: true,
            },
        };

        let value = serde_json::to_value(&frame).expect("frame should serialize");
        assert_eq!(value["type"], "receive_message");
        assert_eq!(value["conversationId"], json!(conversation_id.to_string()));
        assert_eq!(value["message"]["sender"], "student-1");
        assert_eq!(value["message"]["wasRedacted"], json!(true));
        assert_eq!(value["message"]["timestamp"], "2023-11-14T22:13:20Z");
    }

    #[test]
    fn test_error_frame_maps_app_errors() {
        let frame = ServerFrame::error_from(&AppError::NotAuthorized);
        let value = serde_json::to_value(&frame).expect("frame should serialize");
        assert_eq!(value["type"], "error");
        assert_eq!(value["code"], "not_authorized");

        let frame = ServerFrame::error_from(&AppError::Validation("content is required".to_string()));
        let value = serde_json::to_value(&frame).expect("frame should serialize");
        assert_eq!(value["code"], "validation");
        assert_eq!(value["message"], "content is required");
    }
}
