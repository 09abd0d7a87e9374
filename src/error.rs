use crate::{api_response::ApiResponse, cache::CacheError, database::DatabaseError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(config::ConfigError),
    Jwt(jsonwebtoken::errors::Error),
    Database(DatabaseError),
    Cache(CacheError),
    /// Kakao could not be reached, timed out, or the attempt was cancelled
    ProviderUnavailable(String),
    /// Kakao answered but refused the exchange
    ProviderRejected(String),
    /// Kakao profile lacks a usable email or is not decodable
    MalformedProfile(String),
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "Configuration error: {}", err),
            AppError::Jwt(err) => write!(f, "JWT error: {}", err),
            AppError::Database(err) => write!(f, "Database error: {}", err),
            AppError::Cache(err) => write!(f, "Cache error: {}", err),
            AppError::ProviderUnavailable(msg) => write!(f, "Kakao unavailable: {}", msg),
            AppError::ProviderRejected(msg) => write!(f, "Kakao rejected the login: {}", msg),
            AppError::MalformedProfile(msg) => write!(f, "Malformed Kakao profile: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::Jwt(err)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Database(err)
    }
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        AppError::Cache(err)
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Config(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Cache(_) | AppError::ProviderUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Jwt(_) | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::ProviderRejected(_)
            | AppError::MalformedProfile(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Server-side faults never leak their internals to the caller
        let message = match &self {
            AppError::Config(_) => "Configuration error".to_string(),
            AppError::Database(_) | AppError::Internal(_) => "Internal server error".to_string(),
            AppError::Cache(_) => "Credential cache unavailable".to_string(),
            AppError::Jwt(_) => "Authentication failed".to_string(),
            _ => self.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        }

        (status, Json(ApiResponse::<()>::fail(message))).into_response()
    }
}
