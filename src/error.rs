// src/error.rs
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user already exists")]
    UserExists,

    #[error("invalid token")]
    TokenInvalid,

    #[error("token expired")]
    TokenExpired,

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("user not found")]
    UserNotFound,

    #[error("plan not found")]
    PlanNotFound,

    #[error("subscription not found")]
    SubscriptionNotFound,

    #[error("content not found")]
    ContentNotFound,

    #[error("watch history not found")]
    WatchHistoryNotFound,

    #[error("content not published")]
    NotPublished,

    #[error("content not accessible with current subscription")]
    NotAccessible,

    #[error("user already has an active subscription")]
    ActiveSubscriptionExists,

    #[error("plan not available")]
    PlanNotAvailable,

    #[error("subscription expired")]
    SubscriptionExpired,

    #[error("subscription inactive")]
    SubscriptionInactive,

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("rate limit exceeded: maximum {max} requests per {window_secs}s allowed")]
    RateLimited { max: i64, window_secs: u64 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store error: {0}")]
    Store(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Not-found kinds are ordinary control flow for callers.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::UserNotFound
                | AppError::PlanNotFound
                | AppError::SubscriptionNotFound
                | AppError::ContentNotFound
                | AppError::WatchHistoryNotFound
        )
    }

    /// Infrastructure failures that a caller may retry at its own discretion.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Store(_) | AppError::Database(_))
    }
}

impl From<redis::RedisError> for AppError {
    fn from(e: redis::RedisError) -> Self {
        AppError::Store(e.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match e.kind() {
            ErrorKind::ExpiredSignature => AppError::TokenExpired,
            _ => AppError::TokenInvalid,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials
            | AppError::Unauthorized
            | AppError::TokenExpired
            | AppError::TokenInvalid => StatusCode::UNAUTHORIZED,
            AppError::Forbidden | AppError::NotAccessible | AppError::NotPublished => {
                StatusCode::FORBIDDEN
            }
            AppError::UserExists | AppError::ActiveSubscriptionExists => StatusCode::CONFLICT,
            AppError::UserNotFound
            | AppError::PlanNotFound
            | AppError::SubscriptionNotFound
            | AppError::ContentNotFound
            | AppError::WatchHistoryNotFound => StatusCode::NOT_FOUND,
            AppError::PlanNotAvailable
            | AppError::SubscriptionExpired
            | AppError::SubscriptionInactive
            | AppError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Database(_) | AppError::Store(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Internal server error".to_string()
            }
            AppError::Store(e) => {
                tracing::error!("Store error: {}", e);
                "Internal server error".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}
