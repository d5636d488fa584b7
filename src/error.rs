use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Response type for health check endpoint
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Response type for unhealthy status
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct UnhealthyResponse {
    pub status: String,
    pub error: String,
}

/// Rejections produced by the registration endpoint
///
/// Every variant maps to a bare status code with an empty body; the reason
/// is only written to the server log.
#[derive(Debug)]
pub enum ApiError {
    /// Caller identity is missing or not the allow-listed one
    Unauthorized,
    /// `s` or `l` absent, or the query string could not be parsed
    MissingParams(String),
    /// A parameter is outside its length bounds
    InvalidLength {
        param: &'static str,
        len: usize,
    },
    /// The short path is already registered
    Conflict(String),
    /// The store rejected or failed the write
    StoreError(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::MissingParams(_) | ApiError::InvalidLength { .. } => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::StoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            ApiError::Unauthorized => tracing::warn!("Registration rejected: caller not allowed"),
            ApiError::MissingParams(reason) => {
                tracing::info!("Registration rejected: {}", reason)
            }
            ApiError::InvalidLength { param, len } => tracing::info!(
                "Registration rejected: parameter '{}' has invalid length {}",
                param,
                len
            ),
            ApiError::Conflict(short_path) => {
                tracing::info!("Registration rejected: '{}' already exists", short_path)
            }
            ApiError::StoreError(err) => tracing::error!("Registration failed: {:#}", err),
        }

        status.into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::StoreError(err)
    }
}
