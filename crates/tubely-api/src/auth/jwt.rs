//! HS256 access tokens
//!
//! The service only needs an owner identity from the bearer token; tokens
//! carry the user id as `sub` and are issued by [`JwtService::issue`] for
//! tooling and tests.

use super::models::JwtClaims;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tubely_core::AppError;
use uuid::Uuid;

const TOKEN_ISSUER: &str = "tubely-access";
const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue an access token for `user_id` valid for one hour.
    pub fn issue(&self, user_id: Uuid) -> Result<String, AppError> {
        self.issue_with_ttl(user_id, Duration::seconds(DEFAULT_TOKEN_TTL_SECS))
    }

    pub fn issue_with_ttl(&self, user_id: Uuid, ttl: Duration) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: user_id,
            iss: TOKEN_ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Validate and decode a token
    pub fn validate(&self, token: &str) -> Result<JwtClaims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.leeway = 0;

        let token_data =
            decode::<JwtClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                tracing::debug!("JWT validation failed: {}", e);
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::Unauthorized("Token has expired".to_string())
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                        AppError::Unauthorized("Invalid token issuer".to_string())
                    }
                    _ => AppError::Unauthorized("Invalid token".to_string()),
                }
            })?;

        Ok(token_data.claims)
    }
}
