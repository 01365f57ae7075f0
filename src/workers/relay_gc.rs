use crate::config::RelayConfig;
use crate::services::relay::RoomRelay;
use std::sync::Arc;
use std::time::Duration;

/// Sweeps relay rooms whose last subscriber has disconnected.
///
/// Rooms are created lazily on join and only dropped here, so a room
/// outlives short reconnect gaps of up to one GC interval.
#[derive(Debug)]
pub struct RelayGcWorker {
    relay: Arc<dyn RoomRelay>,
    gc_interval_secs: u64,
}

impl RelayGcWorker {
    #[must_use]
    pub fn new(relay: Arc<dyn RoomRelay>, config: &RelayConfig) -> Self {
        Self { relay, gc_interval_secs: config.gc_interval_secs }
    }

    pub async fn run(self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.gc_interval_secs));

        while !*shutdown.borrow() {
            tokio::select! {
                _ = interval.tick() => {
                    tracing::info_span!("relay_gc_iteration").in_scope(|| self.relay.perform_gc());
                }
                _ = shutdown.changed() => {}
            }
        }
        tracing::info!("Relay GC loop shutting down...");
    }
}
