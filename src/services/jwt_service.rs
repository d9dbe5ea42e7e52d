use crate::{
    config::AuthConfig,
    error::{ApiError, Result},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Session token claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user_id)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Issues and verifies short-lived HS256 session tokens.
pub struct JwtService {
    config: Arc<AuthConfig>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(config: Arc<AuthConfig>) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::hours(self.config.access_token_expiration_hours as i64)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::days(self.config.refresh_token_expiration_days as i64)
    }

    /// Issue a session token for a user with the standard access TTL.
    /// Returns the token and its expiry.
    pub fn issue_token(&self, user_id: Uuid) -> Result<(String, OffsetDateTime)> {
        self.issue_token_with_ttl(user_id, self.access_token_ttl())
    }

    pub fn issue_token_with_ttl(
        &self,
        user_id: Uuid,
        ttl: Duration,
    ) -> Result<(String, OffsetDateTime)> {
        let now = OffsetDateTime::now_utc();
        let expires_at = now + ttl;

        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.unix_timestamp(),
            exp: expires_at.unix_timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(e.into()))?;

        Ok((token, expires_at))
    }

    /// Verify a session token, distinguishing expiry from any other defect
    /// so callers can surface a specific reason.
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => ApiError::ExpiredToken,
                _ => ApiError::InvalidToken(e.to_string()),
            })?;

        Ok(token_data.claims)
    }

    /// Extract user_id from claims
    pub fn user_id_from_claims(claims: &Claims) -> Result<Uuid> {
        Uuid::parse_str(&claims.sub)
            .map_err(|e| ApiError::InvalidToken(format!("Invalid user_id: {}", e)))
    }
}
