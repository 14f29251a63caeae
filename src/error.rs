// Remote API error taxonomy and the descriptor handed to views
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const VALIDATION_MESSAGE: &str = "Invalid request. Please check your input.";
pub const AUTH_MESSAGE: &str = "Authentication failed. Please log in again.";
pub const NOT_FOUND_MESSAGE: &str = "The requested resource was not found.";
pub const SERVER_MESSAGE: &str = "Server error. Please try again later.";
pub const NETWORK_MESSAGE: &str =
    "No response received from server. Please check your network connection.";

/// Failure of a remote call, classified so the caller can react.
///
/// Every remote operation in this crate returns one of these instead of
/// panicking or leaking transport errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    // 400 / 422 - user can correct the input
    #[error("{0}")]
    Validation(String),

    // 401 / 403 - credential expired or rejected
    #[error("{0}")]
    Auth(String),

    // 404 - entity vanished server-side
    #[error("{0}")]
    NotFound(String),

    // 5xx, unexpected payloads
    #[error("{0}")]
    Server(String),

    // No response at all
    #[error("{0}")]
    Network(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Validation,
    Auth,
    NotFound,
    Server,
    Network,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// Uniform `{message, severity}` value surfaced to the view layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub kind: ErrorKind,
    pub message: String,
    pub severity: Severity,
}

impl ApiError {
    /// Classify an HTTP failure status. `message` is the server-provided
    /// text, if any; 5xx responses always get the generic server message.
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        match status {
            400 | 422 => ApiError::Validation(message.unwrap_or_else(|| VALIDATION_MESSAGE.into())),
            401 | 403 => ApiError::Auth(message.unwrap_or_else(|| AUTH_MESSAGE.into())),
            404 => ApiError::NotFound(message.unwrap_or_else(|| NOT_FOUND_MESSAGE.into())),
            500..=599 => ApiError::Server(SERVER_MESSAGE.into()),
            _ => ApiError::Server(
                message.unwrap_or_else(|| "An unexpected error occurred.".into()),
            ),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn auth(message: impl Into<String>) -> Self {
        ApiError::Auth(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn server(message: impl Into<String>) -> Self {
        ApiError::Server(message.into())
    }

    pub fn network(message: impl Into<String>) -> Self {
        ApiError::Network(message.into())
    }

    pub fn unexpected_format() -> Self {
        ApiError::Server("Unexpected response format".into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Validation(_) => ErrorKind::Validation,
            ApiError::Auth(_) => ErrorKind::Auth,
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::Server(_) => ErrorKind::Server,
            ApiError::Network(_) => ErrorKind::Network,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::Validation(msg)
            | ApiError::Auth(msg)
            | ApiError::NotFound(msg)
            | ApiError::Server(msg)
            | ApiError::Network(msg) => msg,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ApiError::Validation(_) | ApiError::NotFound(_) => Severity::Warning,
            ApiError::Auth(_) | ApiError::Server(_) | ApiError::Network(_) => Severity::Error,
        }
    }

    /// Error code for JSON output
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Auth(_) => "AUTH_ERROR",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Server(_) => "SERVER_ERROR",
            ApiError::Network(_) => "NETWORK_ERROR",
        }
    }

    pub fn descriptor(&self) -> ErrorDescriptor {
        ErrorDescriptor {
            kind: self.kind(),
            message: self.message().to_string(),
            severity: self.severity(),
        }
    }
}

impl From<ApiError> for ErrorDescriptor {
    fn from(err: ApiError) -> Self {
        err.descriptor()
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            tracing::warn!("Undecodable response body: {}", err);
            return ApiError::unexpected_format();
        }
        if let Some(status) = err.status() {
            return ApiError::from_status(status.as_u16(), None);
        }
        tracing::warn!("Request failed without response: {}", err);
        ApiError::network(NETWORK_MESSAGE)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        tracing::warn!("Response payload did not match the expected shape: {}", err);
        ApiError::unexpected_format()
    }
}

/// Failures of the persisted credential store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Credential store I/O error: {0}")]
    Io(#[from] std::io::Error),
}
