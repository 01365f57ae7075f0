use crate::api::AppState;
use crate::domain::auth::Claims;
use crate::error::AppError;
use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, Request, header, request::Parts},
};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub struct AuthUser {
    pub user_id: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts.headers.get(header::AUTHORIZATION).ok_or(AppError::AuthError)?;

        let auth_str = auth_header.to_str().map_err(|_| AppError::AuthError)?;
        let token = auth_str.strip_prefix("Bearer ").ok_or(AppError::AuthError)?;

        let claims = Claims::decode(token, &state.config.auth.jwt_secret)?;

        // The request span declares user_id as an empty field; fill it now that
        // the caller is known.
        tracing::Span::current().record("user_id", claims.sub.as_str());

        Ok(AuthUser { user_id: claims.sub })
    }
}

/// Reuses the request id supplied by an upstream proxy, generating a fresh
/// UUID only when the header is absent.
#[derive(Clone, Copy, Debug)]
pub struct MakeRequestUuidOrHeader;

impl MakeRequestId for MakeRequestUuidOrHeader {
    fn make_request_id<B>(&mut self, request: &Request<B>) -> Option<RequestId> {
        if let Some(id) = request.headers().get("x-request-id") {
            return Some(RequestId::new(id.clone()));
        }

        HeaderValue::try_from(Uuid::new_v4().to_string()).ok().map(RequestId::new)
    }
}
