use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Malformed receipt token: {0}")]
    MalformedToken(String),

    #[error("Transaction environment does not match app environment")]
    EnvironmentMismatch,

    #[error("Product ID in receipt does not match request")]
    ProductMismatch,

    #[error("Invalid product ID: {0}")]
    InvalidProduct(String),

    #[error("Transaction verification failed (status {status})")]
    RemoteVerificationFailed { status: i32 },

    #[error("This purchase has already been processed")]
    DuplicateTransaction,

    #[error("Subscription must have expiry date")]
    MissingExpiry,

    #[error("Authentication required")]
    MissingCredential,

    #[error("Session token has expired")]
    ExpiredToken,

    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "An internal database error occurred".to_string(),
                )
            }
            ApiError::MalformedToken(ref msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "MALFORMED_TOKEN",
                msg.clone(),
            ),
            ApiError::EnvironmentMismatch => (
                StatusCode::BAD_REQUEST,
                "ENVIRONMENT_MISMATCH",
                self.to_string(),
            ),
            ApiError::ProductMismatch => (
                StatusCode::BAD_REQUEST,
                "PRODUCT_MISMATCH",
                self.to_string(),
            ),
            ApiError::InvalidProduct(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_PRODUCT", self.to_string())
            }
            ApiError::RemoteVerificationFailed { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "REMOTE_VERIFICATION_FAILED",
                self.to_string(),
            ),
            ApiError::DuplicateTransaction => (
                StatusCode::CONFLICT,
                "DUPLICATE_TRANSACTION",
                self.to_string(),
            ),
            ApiError::MissingExpiry => {
                (StatusCode::BAD_REQUEST, "MISSING_EXPIRY", self.to_string())
            }
            ApiError::MissingCredential => (
                StatusCode::UNAUTHORIZED,
                "MISSING_CREDENTIAL",
                self.to_string(),
            ),
            ApiError::ExpiredToken => {
                (StatusCode::UNAUTHORIZED, "EXPIRED_TOKEN", self.to_string())
            }
            ApiError::InvalidToken(ref msg) => {
                (StatusCode::UNAUTHORIZED, "INVALID_TOKEN", msg.clone())
            }
            ApiError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::NotFound(ref msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            ApiError::Internal(ref e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message,
            }
        });

        (status, Json(body)).into_response()
    }
}

// Helper type for results
pub type Result<T> = std::result::Result<T, ApiError>;
