use std::time::Duration;
use thiserror::Error;

/// Run-level errors. Any of these aborts the run.
#[derive(Error, Debug)]
pub enum CsvTranslatorError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Column not found: '{column}' (available: {available})")]
    ColumnNotFound { column: String, available: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

pub type Result<T> = std::result::Result<T, CsvTranslatorError>;

/// Failure of a single translation request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    #[error("rate limited by API (HTTP {status}): {message}")]
    RateLimited {
        status: u16,
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("authentication failed (HTTP {status}): {message}")]
    Auth { status: u16, message: String },

    #[error("invalid request (HTTP {status}): {message}")]
    InvalidRequest { status: u16, message: String },

    #[error("no translation in response: {0}")]
    EmptyResponse(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl TranslateError {
    /// Whether the same request may succeed if sent again.
    pub fn is_transient(&self) -> bool {
        match self {
            TranslateError::RateLimited { .. } => true,
            TranslateError::Timeout(_) => true,
            TranslateError::Network(_) => true,
            TranslateError::Server { .. } => true,
            TranslateError::Auth { .. } => false,
            TranslateError::InvalidRequest { .. } => false,
            TranslateError::EmptyResponse(_) => false,
            TranslateError::MalformedResponse(_) => false,
            TranslateError::Cancelled => false,
            TranslateError::Internal(_) => false,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            TranslateError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Maps a non-success HTTP status and its body to an error.
    pub fn from_status(status: u16, message: String, retry_after: Option<Duration>) -> Self {
        match status {
            429 => TranslateError::RateLimited {
                status,
                message,
                retry_after,
            },
            408 => TranslateError::Timeout(format!("HTTP 408: {}", message)),
            401 | 403 => TranslateError::Auth { status, message },
            500..=599 => TranslateError::Server { status, message },
            _ => TranslateError::InvalidRequest { status, message },
        }
    }
}

impl From<reqwest::Error> for TranslateError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TranslateError::Timeout(e.to_string())
        } else if e.is_decode() {
            TranslateError::MalformedResponse(e.to_string())
        } else {
            TranslateError::Network(e.to_string())
        }
    }
}
