//! Publish control — best-effort unpublish of a remote application.
//!
//! Unpublishing never touches the connection document. Connections to the
//! removed application disappear on the next regeneration.

use serde::Serialize;
use tracing::{info, warn};

use crate::engine::DirectoryEngine;
use crate::error::DirectoryError;
use crate::source::ApplicationSource;
use crate::users::UserDirectory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnpublishStatus {
    Unpublished,
    Failed,
}

/// What happened to an unpublish request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnpublishOutcome {
    pub alias: String,
    pub status: UnpublishStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UnpublishOutcome {
    pub fn is_unpublished(&self) -> bool {
        self.status == UnpublishStatus::Unpublished
    }
}

impl<S: ApplicationSource, U: UserDirectory> DirectoryEngine<S, U> {
    /// Remove `alias` from the configured collection.
    ///
    /// Only an empty or unusable alias is an error. A failing command is
    /// logged and reported as [`UnpublishStatus::Failed`].
    pub async fn unpublish_application(&self, alias: &str) -> Result<UnpublishOutcome, DirectoryError> {
        let alias = alias.trim();
        if alias.is_empty() {
            return Err(DirectoryError::InvalidArgument("application alias must not be empty".into()));
        }

        let collection = self.config.apps_collection.as_str();
        let timeout = self.config.command_timeout();
        let result = match tokio::time::timeout(timeout, self.source.unpublish(alias, collection)).await {
            Ok(result) => result,
            Err(_) => Err(DirectoryError::CommandTimeout(timeout)),
        };

        match result {
            Ok(()) => {
                info!("Unpublished {alias} from {collection}");
                Ok(UnpublishOutcome {
                    alias: alias.to_string(),
                    status: UnpublishStatus::Unpublished,
                    error: None,
                })
            }
            Err(e @ DirectoryError::InvalidArgument(_)) => Err(e),
            Err(e) => {
                warn!("Failed to unpublish {alias}: {e}");
                Ok(UnpublishOutcome {
                    alias: alias.to_string(),
                    status: UnpublishStatus::Failed,
                    error: Some(e.to_string()),
                })
            }
        }
    }
}
