//! Directory error kinds.

use std::path::PathBuf;
use std::time::Duration;

use apps_protocol::ApiError;
use thiserror::Error;

/// Errors raised by the directory engine and its collaborators.
///
/// Source-side kinds (`SourceUnavailable`, `CommandFailed`, `CommandTimeout`)
/// are degraded by the engine during discovery. Store-side kinds are always
/// surfaced to the caller.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("application source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("command failed: {0}")]
    CommandFailed(String),

    #[error("command timed out after {}s", .0.as_secs())]
    CommandTimeout(Duration),

    #[error("failed to write connection store {}: {source}", path.display())]
    PersistenceWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read connection store {}: {source}", path.display())]
    PersistenceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode connection store: {0}")]
    Encode(#[from] quick_xml::SeError),

    #[error("failed to decode connection store: {0}")]
    Decode(#[from] quick_xml::DeError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DirectoryError {
    /// Whether this error came from an external collaborator rather than the store.
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable(_) | Self::CommandFailed(_) | Self::CommandTimeout(_)
        )
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::InvalidArgument(msg) => ApiError::invalid_argument(msg),
            other => ApiError::internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apps_protocol::ApiErrorCode;

    #[test]
    fn invalid_argument_maps_to_400() {
        let api: ApiError = DirectoryError::InvalidArgument("empty alias".into()).into();
        assert_eq!(api.error_code(), ApiErrorCode::InvalidArgument);
        assert_eq!(api.message, "empty alias");
    }

    #[test]
    fn store_errors_map_to_500() {
        let err = DirectoryError::PersistenceRead {
            path: PathBuf::from("/nonexistent/logins.xml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(!err.is_source_error());
        let api: ApiError = err.into();
        assert_eq!(api.status(), 500);
        assert!(api.message.contains("/nonexistent/logins.xml"));
    }

    #[test]
    fn source_errors_are_classified() {
        assert!(DirectoryError::CommandFailed("exit 1".into()).is_source_error());
        assert!(DirectoryError::CommandTimeout(Duration::from_secs(3)).is_source_error());
        assert!(!DirectoryError::InvalidConfig("x".into()).is_source_error());
    }

    #[test]
    fn timeout_message_in_seconds() {
        let err = DirectoryError::CommandTimeout(Duration::from_secs(60));
        assert_eq!(err.to_string(), "command timed out after 60s");
    }
}
