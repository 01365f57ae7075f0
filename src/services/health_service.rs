use crate::config::HealthConfig;
use crate::storage::DbPool;
use opentelemetry::{KeyValue, global, metrics::Gauge};
use std::time::Duration;
use tokio::time::timeout;

#[derive(Clone, Debug)]
pub struct Metrics {
    pub status: Gauge<i64>,
}

impl Metrics {
    #[must_use]
    pub(crate) fn new() -> Self {
        let meter = global::meter("alumniconnect-chat");
        Self {
            status: meter
                .i64_gauge("health_status")
                .with_description("Status of health checks (1 for ok, 0 for error)")
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
pub struct HealthService {
    pool: DbPool,
    config: HealthConfig,
    metrics: Metrics,
}

impl HealthService {
    #[must_use]
    pub fn new(pool: DbPool, config: HealthConfig) -> Self {
        Self { pool, config, metrics: Metrics::new() }
    }

    /// Probes database connectivity within the configured time budget.
    ///
    /// # Errors
    /// Returns a string describing the failure if the database is unreachable.
    pub async fn check_db(&self) -> Result<(), String> {
        let budget = Duration::from_millis(self.config.db_timeout_ms);

        let outcome = match timeout(budget, sqlx::query("SELECT 1").execute(&self.pool)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(format!("Database connection failed: {e:?}")),
            Err(_) => Err("Database connection timed out".to_string()),
        };

        self.metrics.status.record(i64::from(outcome.is_ok()), &[KeyValue::new("component", "database")]);

        outcome
    }
}
