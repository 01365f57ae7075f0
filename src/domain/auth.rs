use crate::error::{AppError, Result};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Claims carried by the identity-provider JWTs presented by clients.
///
/// `sub` is the opaque platform user id, shared with the main AlumniConnect
/// backend; this service never issues ids of its own.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

impl Claims {
    #[must_use]
    pub fn new(user_id: impl Into<String>, ttl_secs: u64) -> Self {
        let expiration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(std::time::Duration::from_secs(0))
            .as_secs() as usize
            + ttl_secs as usize;

        Self { sub: user_id.into(), exp: expiration }
    }

    /// Signs these claims with the shared secret.
    ///
    /// # Errors
    /// Returns `AppError::Internal` if signing fails.
    pub fn encode(&self, secret: &str) -> Result<String> {
        encode(&Header::default(), self, &EncodingKey::from_secret(secret.as_bytes())).map_err(|_| AppError::Internal)
    }

    /// Verifies a token's signature and expiry and returns its claims.
    ///
    /// # Errors
    /// Returns `AppError::AuthError` if the token is malformed, expired, or
    /// signed with a different secret.
    pub fn decode(token: &str, secret: &str) -> Result<Self> {
        let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
            .map_err(|_| AppError::AuthError)?;

        Ok(token_data.claims)
    }
}
