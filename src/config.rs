use clap::{Args, Parser, ValueEnum};
use ipnetwork::IpNetwork;

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub database: DatabaseConfig,

    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub auth: AuthConfig,

    #[command(flatten)]
    pub rate_limit: RateLimitConfig,

    #[command(flatten)]
    pub relay: RelayConfig,

    #[command(flatten)]
    pub health: HealthConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Args)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[arg(long, env = "ALUMNICONNECT_DATABASE_URL")]
    pub url: String,

    /// Maximum number of pooled connections
    #[arg(long, env = "ALUMNICONNECT_DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub max_connections: u32,

    /// Minimum number of pooled connections kept open
    #[arg(long, env = "ALUMNICONNECT_DB_MIN_CONNECTIONS", default_value_t = 1)]
    pub min_connections: u32,

    /// How long to wait for a connection from the pool
    #[arg(long, env = "ALUMNICONNECT_DB_ACQUIRE_TIMEOUT_SECS", default_value_t = 5)]
    pub acquire_timeout_secs: u64,

    /// How long an idle connection may live before being closed
    #[arg(long, env = "ALUMNICONNECT_DB_IDLE_TIMEOUT_SECS", default_value_t = 600)]
    pub idle_timeout_secs: u64,

    /// Maximum lifetime of a pooled connection
    #[arg(long, env = "ALUMNICONNECT_DB_MAX_LIFETIME_SECS", default_value_t = 1800)]
    pub max_lifetime_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long, env = "ALUMNICONNECT_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "ALUMNICONNECT_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Port for the management server (health probes)
    #[arg(long, env = "ALUMNICONNECT_MGMT_PORT", default_value_t = 3001)]
    pub mgmt_port: u16,

    /// Per-request timeout for REST endpoints
    #[arg(long, env = "ALUMNICONNECT_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// How long to wait for background tasks to drain on shutdown
    #[arg(long, env = "ALUMNICONNECT_SHUTDOWN_TIMEOUT_SECS", default_value_t = 30)]
    pub shutdown_timeout_secs: u64,

    /// Comma-separated list of CIDRs to trust for X-Forwarded-For IP extraction
    #[arg(
        long,
        env = "ALUMNICONNECT_TRUSTED_PROXIES",
        default_value = "10.0.0.0/8,172.16.0.0/12,192.168.0.0/16,127.0.0.1/32",
        value_delimiter = ','
    )]
    pub trusted_proxies: Vec<IpNetwork>,
}

#[derive(Clone, Debug, Args)]
pub struct AuthConfig {
    /// Shared secret for verifying identity-provider JWTs
    #[arg(long, env = "ALUMNICONNECT_JWT_SECRET")]
    pub jwt_secret: String,
}

#[derive(Clone, Debug, Args)]
pub struct RateLimitConfig {
    /// Requests per second allowed per client IP
    #[arg(long, env = "ALUMNICONNECT_RATE_LIMIT_PER_SECOND", default_value_t = 10)]
    pub per_second: u32,

    /// Burst allowance per client IP
    #[arg(long, env = "ALUMNICONNECT_RATE_LIMIT_BURST", default_value_t = 20)]
    pub burst: u32,
}

#[derive(Clone, Debug, Args)]
pub struct RelayConfig {
    /// Capacity of each conversation's broadcast channel
    #[arg(long, env = "ALUMNICONNECT_ROOM_CHANNEL_CAPACITY", default_value_t = 32)]
    pub room_channel_capacity: usize,

    /// How often to reclaim conversation rooms with no subscribers
    #[arg(long, env = "ALUMNICONNECT_ROOM_GC_INTERVAL_SECS", default_value_t = 60)]
    pub gc_interval_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct HealthConfig {
    /// Timeout for the database readiness check
    #[arg(long, env = "ALUMNICONNECT_HEALTH_DB_TIMEOUT_MS", default_value_t = 500)]
    pub db_timeout_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Debug, Args)]
pub struct TelemetryConfig {
    /// OTLP endpoint for traces and metrics; telemetry export is disabled when unset
    #[arg(long, env = "ALUMNICONNECT_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Log output format
    #[arg(long, env = "ALUMNICONNECT_LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

impl Config {
    pub fn load() -> Self {
        Self::parse()
    }
}
