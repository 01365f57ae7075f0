use crate::config::RelayConfig;
use crate::domain::message::MessageBroadcast;
use async_trait::async_trait;
use dashmap::DashMap;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram, UpDownCounter},
};
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Clone, Debug)]
struct Metrics {
    broadcasts_total: Counter<u64>,
    active_rooms: UpDownCounter<i64>,
    gc_duration_seconds: Histogram<f64>,
    gc_reclaimed_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("alumniconnect-chat");
        Self {
            broadcasts_total: meter
                .u64_counter("relay_broadcasts_total")
                .with_description("Total messages offered to conversation rooms")
                .build(),
            active_rooms: meter
                .i64_up_down_counter("relay_active_rooms")
                .with_description("Number of conversation rooms with a live channel")
                .build(),
            gc_duration_seconds: meter
                .f64_histogram("relay_gc_duration_seconds")
                .with_description("Time taken to perform a single GC iteration")
                .build(),
            gc_reclaimed_total: meter
                .u64_counter("relay_gc_reclaimed_total")
                .with_description("Total number of stale rooms reclaimed by GC")
                .build(),
        }
    }
}

/// Fan-out seam between message persistence and live conversation subscribers.
#[async_trait]
pub trait RoomRelay: Send + Sync + std::fmt::Debug {
    /// Returns a receiver for every message subsequently broadcast to the conversation.
    async fn join(&self, conversation_id: Uuid) -> broadcast::Receiver<MessageBroadcast>;

    /// Publishes an already-persisted message to the conversation's live subscribers.
    async fn broadcast(&self, conversation_id: Uuid, event: MessageBroadcast);

    /// Reclaims rooms whose last subscriber has disconnected.
    fn perform_gc(&self);
}

#[derive(Debug)]
pub struct InProcessRelay {
    rooms: DashMap<Uuid, broadcast::Sender<MessageBroadcast>>,
    room_channel_capacity: usize,
    metrics: Metrics,
}

impl InProcessRelay {
    /// Creates a new in-process relay handle.
    #[must_use]
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            rooms: DashMap::new(),
            room_channel_capacity: config.room_channel_capacity,
            metrics: Metrics::new(),
        }
    }
}

#[async_trait]
impl RoomRelay for InProcessRelay {
    #[tracing::instrument(skip(self), fields(conversation_id = %conversation_id))]
    async fn join(&self, conversation_id: Uuid) -> broadcast::Receiver<MessageBroadcast> {
        let tx = self
            .rooms
            .entry(conversation_id)
            .or_insert_with(|| {
                self.metrics.active_rooms.add(1, &[]);
                let (tx, _rx) = broadcast::channel(self.room_channel_capacity);
                tx
            })
            .value()
            .clone();

        tx.subscribe()
    }

    #[tracing::instrument(skip(self, event), fields(conversation_id = %conversation_id))]
    async fn broadcast(&self, conversation_id: Uuid, event: MessageBroadcast) {
        if let Some(tx) = self.rooms.get(&conversation_id) {
            tracing::trace!(%conversation_id, "Dispatched message to room subscribers");
            let _ = tx.send(event);
            self.metrics.broadcasts_total.add(1, &[KeyValue::new("status", "delivered")]);
        } else {
            tracing::debug!(%conversation_id, "No live subscribers for conversation");
            self.metrics.broadcasts_total.add(1, &[KeyValue::new("status", "unrouted")]);
        }
    }

    /// Performs a garbage collection cycle to reclaim rooms without subscribers.
    fn perform_gc(&self) {
        let start = std::time::Instant::now();
        tracing::debug!("Starting relay room GC cycle");
        let mut reclaimed_this_cycle = 0;

        self.rooms.retain(|_, sender| {
            let active = sender.receiver_count() > 0;
            if !active {
                self.metrics.active_rooms.add(-1, &[]);
                reclaimed_this_cycle += 1;
            }
            active
        });

        let duration = start.elapsed().as_secs_f64();
        self.metrics.gc_duration_seconds.record(duration, &[]);

        if reclaimed_this_cycle > 0 {
            self.metrics.gc_reclaimed_total.add(reclaimed_this_cycle, &[]);
            tracing::info!(reclaimed = reclaimed_this_cycle, "Relay room GC reclaimed stale rooms");
        }
        tracing::debug!(duration_secs = %duration, "Relay room GC cycle completed");
    }
}
