//! API error type and the status codes it maps to.

use serde::{Deserialize, Serialize};

/// Error categories a handler can report back through a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCode {
    InvalidArgument,
    NotFound,
    Internal,

    // Any other HTTP status
    Custom(u16),
}

impl ApiErrorCode {
    /// HTTP status written into the reply.
    pub fn status(&self) -> u16 {
        match self {
            Self::InvalidArgument => 400,
            Self::NotFound => 404,
            Self::Internal => 500,
            Self::Custom(s) => *s,
        }
    }

    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::InvalidArgument,
            404 => Self::NotFound,
            500 => Self::Internal,
            s => Self::Custom(s),
        }
    }
}

/// Error returned by request handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: u16,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.status(),
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::InvalidArgument, message)
    }

    pub fn not_found(path: &str) -> Self {
        Self::new(ApiErrorCode::NotFound, format!("No route for {path}"))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Internal, message)
    }

    pub fn error_code(&self) -> ApiErrorCode {
        ApiErrorCode::from_status(self.code)
    }

    pub fn status(&self) -> u16 {
        self.code
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "API Error [{}]: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
