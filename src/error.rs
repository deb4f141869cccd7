//! Error types for the personal finance advisor

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Result type alias for advisor operations
pub type Result<T> = std::result::Result<T, FinanceError>;

#[derive(Error, Debug)]
pub enum FinanceError {

    // =============================
    // Client Errors
    // =============================

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Access token is missing")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    // =============================
    // Server Errors
    // =============================

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Advice service credential is not configured")]
    ServiceUnauthorized,

    #[error("Upstream failure: {0}")]
    UpstreamFailure(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Password hash error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),
}

impl From<sqlx::Error> for FinanceError {
    fn from(err: sqlx::Error) -> Self {
        FinanceError::Database(err.to_string())
    }
}

impl FinanceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            FinanceError::Validation(_) | FinanceError::Conflict(_) => StatusCode::BAD_REQUEST,
            FinanceError::MissingToken | FinanceError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            FinanceError::InvalidToken => StatusCode::FORBIDDEN,
            FinanceError::UserNotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand back to a client. Server-side detail stays in the logs.
    fn public_message(&self) -> String {
        match self {
            FinanceError::Validation(_)
            | FinanceError::Conflict(_)
            | FinanceError::MissingToken
            | FinanceError::InvalidToken
            | FinanceError::InvalidCredentials
            | FinanceError::UserNotFound
            | FinanceError::ServiceUnauthorized => self.to_string(),
            FinanceError::UpstreamFailure(_) => "Failed to generate advice".to_string(),
            FinanceError::Configuration(_) => "Server configuration error".to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for FinanceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": self.public_message(),
        }));

        (status, body).into_response()
    }
}
