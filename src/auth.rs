//! Bearer-token authentication and password handling
//!
//! Tokens are HS256 JWTs carrying the user id as `sub` and a one hour
//! lifetime. They are never stored; every request re-checks signature
//! and expiry. A verified token becomes an [`AuthenticatedUser`] value
//! that handlers receive as an extractor argument.

use crate::error::FinanceError;
use crate::Result;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Lifetime of an issued access token
pub const TOKEN_TTL_HOURS: i64 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: Duration,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(secret: &str, bcrypt_cost: u32) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl: Duration::hours(TOKEN_TTL_HOURS),
            bcrypt_cost,
        }
    }

    // =============================
    // Tokens
    // =============================

    pub fn issue(&self, user_id: Uuid) -> Result<String> {
        self.issue_at(user_id, Utc::now())
    }

    /// Issue a token as if it were created at `issued_at`.
    pub fn issue_at(&self, user_id: Uuid, issued_at: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            sub: user_id.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.token_ttl).timestamp(),
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }

    /// Check signature and expiry, returning the bound user id.
    pub fn verify(&self, token: &str) -> Result<Uuid> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            debug!("Token rejected: {}", e);
            FinanceError::InvalidToken
        })?;

        Uuid::parse_str(&data.claims.sub).map_err(|_| FinanceError::InvalidToken)
    }

    // =============================
    // Passwords
    // =============================

    pub fn hash_password(&self, password: &str) -> Result<String> {
        Ok(bcrypt::hash(password, self.bcrypt_cost)?)
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        Ok(bcrypt::verify(password, hash)?)
    }
}

/// Pull the credential out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Err(FinanceError::MissingToken);
    };

    let value = value.to_str().map_err(|_| FinanceError::InvalidToken)?;

    match value.strip_prefix("Bearer ").map(str::trim) {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(FinanceError::MissingToken),
    }
}

/// Identity of the caller, proven by a valid bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = FinanceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let auth = Arc::<AuthService>::from_ref(state);
        let token = bearer_token(&parts.headers)?;
        let user_id = auth.verify(token)?;

        Ok(AuthenticatedUser { user_id })
    }
}
