use crate::api::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Records the outcome of the rate limiter's decision for this request.
///
/// The governor layer attaches an `x-ratelimit-after` header when it rejects
/// a request; everything else counts as allowed.
pub async fn log_rate_limit_events(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let response = next.run(req).await;

    let ratelimit_after = response
        .headers()
        .get("x-ratelimit-after")
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);

    state.rate_limit_service.log_decision(response.status(), ratelimit_after);

    response
}
