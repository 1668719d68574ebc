use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};

/// Application-wide Result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Main application error type
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// Invalid input (page parameters, settings values, hook output)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database operation errors, propagated unchanged from sqlx
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A filter or attribute key that is not a column of the entity's table
    #[error("Unknown field '{field}' for table '{table}'")]
    UnknownField { table: String, field: String },

    /// The session was used after its scope ended
    #[error("Session is closed")]
    SessionClosed,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// HTTP transport errors (connect, timeout, decode)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Upstream answered with a non-2xx status
    #[error("Upstream {url} responded with status {status}: {body}")]
    UpstreamStatus { status: u16, url: String, body: String },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem errors (migration revisions)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let error_message = self.to_string();

        HttpResponse::build(status_code).json(serde_json::json!({
            "error": {
                "message": error_message,
                "code": status_code.as_u16(),
            }
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UnknownField { .. } => StatusCode::BAD_REQUEST,
            AppError::SessionClosed => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,
            AppError::UpstreamStatus { .. } => StatusCode::BAD_GATEWAY,
            AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Helper functions for common error scenarios
impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        AppError::NotFound(resource.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        AppError::Configuration(msg.into())
    }

    pub fn unknown_field(table: impl Into<String>, field: impl Into<String>) -> Self {
        AppError::UnknownField {
            table: table.into(),
            field: field.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}
