use crate::api::schemas::gateway::{ClientFrame, ServerFrame};
use crate::domain::message::MessageBroadcast;
use crate::services::conversation_service::ConversationService;
use crate::services::gateway::Metrics;
use crate::services::relay::RoomRelay;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio_stream::StreamMap;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use uuid::Uuid;

pub struct Session {
    pub user_id: String,
    pub request_id: String,
    pub socket: WebSocket,
    pub conversation_service: ConversationService,
    pub relay: Arc<dyn RoomRelay>,
    pub metrics: Metrics,
    pub shutdown_rx: tokio::sync::watch::Receiver<bool>,
}

impl Session {
    #[tracing::instrument(
        name = "websocket_session",
        skip(self),
        fields(
            user_id = %self.user_id,
            request_id = %self.request_id,
            otel.kind = "server",
            ws.session_id = %Uuid::new_v4()
        )
    )]
    pub(crate) async fn run(self) {
        // Destructuring allows independent mutable access to fields while the socket
        // is split into sink and stream halves.
        let Self { user_id, socket, conversation_service, relay, metrics, mut shutdown_rx, .. } = self;

        metrics.active_connections.add(1, &[]);
        tracing::info!("WebSocket connected");

        let (mut ws_sink, mut ws_stream) = socket.split();

        // One subscription per joined conversation. A session starts with no
        // rooms and accumulates them through join_chat frames.
        let mut rooms: StreamMap<Uuid, BroadcastStream<MessageBroadcast>> = StreamMap::new();

        loop {
            // Priority is given to shutdown and high-frequency events to ensure
            // the server remains responsive to control signals.
            if *shutdown_rx.borrow() {
                tracing::info!("Shutdown signal received, closing WebSocket");
                let _ = ws_sink
                    .send(WsMessage::Close(Some(axum::extract::ws::CloseFrame {
                        code: axum::extract::ws::close_code::AWAY,
                        reason: "Server shutting down".into(),
                    })))
                    .await;
                break;
            }

            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {}

                msg = ws_stream.next() => {
                    let continue_loop = match msg {
                        Some(Ok(WsMessage::Text(text))) => match serde_json::from_str::<ClientFrame>(&text) {
                            Ok(ClientFrame::JoinChat { conversation_id }) => {
                                match conversation_service.ensure_participant(conversation_id, &user_id).await {
                                    Ok(()) => {
                                        let rx = relay.join(conversation_id).await;
                                        // Inserting over an existing entry replaces the old
                                        // subscription, which keeps re-joins idempotent.
                                        rooms.insert(conversation_id, BroadcastStream::new(rx));
                                        metrics.joins_total.add(1, &[]);
                                        tracing::debug!(%conversation_id, "Joined conversation room");
                                        send_frame(&mut ws_sink, &ServerFrame::Joined { conversation_id }).await
                                    }
                                    Err(e) => {
                                        tracing::warn!(%conversation_id, error = %e, "Join rejected");
                                        send_frame(&mut ws_sink, &ServerFrame::error_from(&e)).await
                                    }
                                }
                            }
                            Ok(ClientFrame::SendMessage { conversation_id, sender_id, content }) => {
                                match conversation_service.append_message(conversation_id, &sender_id, &content).await {
                                    // The sender's own copy arrives through its room
                                    // subscription like every other participant's.
                                    Ok(_) => true,
                                    Err(e) => {
                                        metrics.send_failures_total.add(1, &[]);
                                        send_frame(&mut ws_sink, &ServerFrame::error_from(&e)).await
                                    }
                                }
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Failed to parse client frame");
                                send_frame(&mut ws_sink, &ServerFrame::malformed()).await
                            }
                        },
                        Some(Ok(WsMessage::Close(_)) | Err(_)) | None => false,
                        Some(Ok(WsMessage::Binary(_))) => {
                            tracing::warn!("Received unexpected binary message");
                            true
                        }
                        Some(Ok(WsMessage::Ping(_))) => {
                            tracing::debug!("Received heartbeat ping from client");
                            true
                        }
                        Some(Ok(WsMessage::Pong(_))) => {
                            tracing::debug!("Received heartbeat pong from client");
                            true
                        }
                    };

                    if !continue_loop { break; }
                }

                Some((conversation_id, event)) = rooms.next(), if !rooms.is_empty() => {
                    match event {
                        Ok(event) => {
                            let frame = ServerFrame::ReceiveMessage {
                                conversation_id: event.conversation_id,
                                message: event.message.into(),
                            };
                            if !send_frame(&mut ws_sink, &frame).await { break; }
                        }
                        Err(BroadcastStreamRecvError::Lagged(missed)) => {
                            tracing::warn!(%conversation_id, missed, "Room subscription lagged, messages skipped");
                        }
                    }
                }
            }
        }

        let _ = ws_sink.close().await;

        // Dropping the room subscriptions is what removes this session from every
        // room; the relay GC reclaims channels once their last receiver is gone.
        drop(rooms);

        metrics.active_connections.add(-1, &[]);
        tracing::info!("WebSocket disconnected");
    }
}

/// Serializes and sends one frame, returning whether the socket is still usable.
async fn send_frame(ws_sink: &mut SplitSink<WebSocket, WsMessage>, frame: &ServerFrame) -> bool {
    match serde_json::to_string(frame) {
        Ok(json) => ws_sink.send(WsMessage::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize server frame");
            true
        }
    }
}
