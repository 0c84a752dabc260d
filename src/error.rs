use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// ApiError
///
/// Every failure a handler can report. Each variant maps to exactly one HTTP
/// status; the body is always `{"error": "<message>"}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The client omitted a required identifier (e.g. `organizationId`).
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Authentication required")]
    Unauthorized,
    /// Authenticated (or anonymous) caller whose role is insufficient.
    #[error("Forbidden")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    /// The organization exists in the request but has no `squeak_config` row.
    /// Signals a mis-provisioned tenant on mutation paths.
    #[error("No config found")]
    ConfigMissing,
    #[error("Webhook delivery failed: {0}")]
    Delivery(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingField(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Delivery(_) => StatusCode::BAD_GATEWAY,
            Self::ConfigMissing | Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // Store errors are logged in full but never echoed to the client.
            Self::Database(e) => {
                tracing::error!("database error: {:?}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
