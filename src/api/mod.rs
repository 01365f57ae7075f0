use crate::api::rate_limit::log_rate_limit_events;
use crate::config::Config;
use crate::services::conversation_service::ConversationService;
use crate::services::gateway::GatewayService;
use crate::services::health_service::HealthService;
use crate::services::rate_limit_service::RateLimitService;
use axum::body::Body;
use axum::http::Request;
use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_governor::GovernorLayer;
use tower_governor::governor::GovernorConfigBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub mod conversations;
pub mod gateway;
pub mod health;
pub mod middleware;
pub mod rate_limit;
pub mod schemas;

#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Config,
    pub conversation_service: ConversationService,
    pub gateway_service: GatewayService,
    pub rate_limit_service: RateLimitService,
    pub shutdown_rx: tokio::sync::watch::Receiver<bool>,
}

#[derive(Clone, Debug)]
pub struct MgmtState {
    pub health_service: HealthService,
}

#[derive(Debug)]
pub struct ServiceContainer {
    pub conversation_service: ConversationService,
    pub gateway_service: GatewayService,
    pub rate_limit_service: RateLimitService,
}

fn request_span(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.header_value().to_str().unwrap_or_default())
        .unwrap_or_default()
        .to_string();

    tracing::info_span!(
        "request",
        "request_id" = %request_id,
        "http.request.method" = %request.method(),
        "url.path" = %request.uri().path(),
        "http.response.status_code" = tracing::field::Empty,
        "otel.kind" = "server",
        "user_id" = tracing::field::Empty,
    )
}

fn record_response(response: &axum::http::Response<Body>, latency: Duration, span: &tracing::Span) {
    let status = response.status().as_u16();
    span.record("http.response.status_code", status);

    tracing::info!(latency_ms = %latency.as_millis(), status = %status, "request completed");
}

/// Configures and returns the primary application router.
///
/// # Panics
/// Panics if the rate limiter configuration cannot be constructed.
pub fn app_router(
    config: Config,
    services: ServiceContainer,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
) -> Router {
    let interval_ns = 1_000_000_000 / config.rate_limit.per_second.max(1);
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_nanosecond(u64::from(interval_ns))
            .burst_size(config.rate_limit.burst)
            .key_extractor(services.rate_limit_service.extractor.clone())
            .finish()
            .expect("Failed to build rate limiter config"),
    );

    let request_timeout = Duration::from_secs(config.server.request_timeout_secs);

    let state = AppState {
        config,
        conversation_service: services.conversation_service,
        gateway_service: services.gateway_service,
        rate_limit_service: services.rate_limit_service,
        shutdown_rx,
    };

    let api_routes = Router::new()
        .route("/conversations", post(conversations::start_conversation))
        .route("/conversations/user/{userId}", get(conversations::list_conversations))
        .route("/conversations/{conversationId}", get(conversations::get_conversation))
        .route("/conversations/{conversationId}/messages", post(conversations::send_message))
        .route("/gateway", get(gateway::websocket_handler))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(GovernorLayer::new(governor_conf));

    Router::new()
        .nest("/v1", api_routes)
        .layer(from_fn_with_state(state.clone(), log_rate_limit_events))
        .layer(PropagateRequestIdLayer::new(axum::http::HeaderName::from_static("x-request-id")))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_response(record_response)
                .on_failure(|error, _latency, _span: &tracing::Span| {
                    tracing::error!(error = %error, "request failed");
                }),
        )
        .layer(SetRequestIdLayer::new(
            axum::http::HeaderName::from_static("x-request-id"),
            middleware::MakeRequestUuidOrHeader,
        ))
        .with_state(state)
}

pub fn mgmt_router(state: MgmtState) -> Router {
    Router::new().route("/livez", get(health::livez)).route("/readyz", get(health::readyz)).with_state(state)
}
