pub(crate) mod session;

use crate::services::conversation_service::ConversationService;
use crate::services::gateway::session::Session;
use crate::services::relay::RoomRelay;
use axum::extract::ws::WebSocket;
use opentelemetry::{
    global,
    metrics::{Counter, UpDownCounter},
};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub(crate) struct Metrics {
    pub(crate) active_connections: UpDownCounter<i64>,
    pub(crate) joins_total: Counter<u64>,
    pub(crate) send_failures_total: Counter<u64>,
}

impl Metrics {
    #[must_use]
    pub(crate) fn new() -> Self {
        let meter = global::meter("alumniconnect-chat");
        Self {
            active_connections: meter
                .i64_up_down_counter("websocket_active_connections")
                .with_description("Number of active WebSocket connections")
                .build(),
            joins_total: meter
                .u64_counter("websocket_joins_total")
                .with_description("Total conversation room joins accepted")
                .build(),
            send_failures_total: meter
                .u64_counter("websocket_send_failures_total")
                .with_description("Total send_message frames rejected with an error")
                .build(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub struct GatewayService {
    conversation_service: ConversationService,
    relay: Arc<dyn RoomRelay>,
    metrics: Metrics,
}

impl GatewayService {
    #[must_use]
    pub fn new(conversation_service: ConversationService, relay: Arc<dyn RoomRelay>) -> Self {
        Self { conversation_service, relay, metrics: Metrics::new() }
    }

    pub async fn handle_socket(
        &self,
        socket: WebSocket,
        user_id: String,
        request_id: String,
        shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) {
        // Identity is already verified by the upgrade handler, so the session
        // starts immediately.
        let session = Session {
            user_id,
            request_id,
            socket,
            conversation_service: self.conversation_service.clone(),
            relay: self.relay.clone(),
            metrics: self.metrics.clone(),
            shutdown_rx,
        };

        session.run().await;
    }
}
