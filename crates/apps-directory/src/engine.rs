//! Connection directory engine.
//!
//! Combines the application source, the user directory and the execution
//! server pool into the gateway connection document, and answers queries
//! over the persisted document.
//!
//! All store access goes through one `RwLock<()>`: regeneration (and the
//! regenerate-then-read of [`DirectoryEngine::list_all_connections`]) holds
//! the write guard, per-user queries hold the read guard.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::DirectoryConfig;
use crate::error::DirectoryError;
use crate::model::{
    ApplicationDescriptor, Connection, DESKTOP_CONNECTION, MANAGEMENT_CONNECTION,
    MANAGEMENT_REMOTE_APP, UserAccount, is_reserved, remote_app_for,
};
use crate::selector::{RandomSelector, ServerSelector};
use crate::source::ApplicationSource;
use crate::store::{Configs, ConnectionConfig, StoreFile, param};
use crate::users::UserDirectory;

pub struct DirectoryEngine<S, U> {
    pub(crate) config: Arc<DirectoryConfig>,
    pub(crate) source: S,
    users: U,
    selector: Box<dyn ServerSelector>,
    store: StoreFile,
    store_lock: RwLock<()>,
}

impl<S: ApplicationSource, U: UserDirectory> DirectoryEngine<S, U> {
    pub fn new(config: Arc<DirectoryConfig>, source: S, users: U) -> Self {
        let store = StoreFile::new(config.xml_configuration_file.clone());
        Self {
            config,
            source,
            users,
            selector: Box::new(RandomSelector),
            store,
            store_lock: RwLock::new(()),
        }
    }

    /// Replace the execution server selector.
    pub fn with_selector(mut self, selector: impl ServerSelector + 'static) -> Self {
        self.selector = Box::new(selector);
        self
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn users(&self) -> &U {
        &self.users
    }

    pub fn store_path(&self) -> &Path {
        self.store.path()
    }

    /// Rebuild the whole connection document from the current sources.
    pub async fn regenerate(&self) -> Result<(), DirectoryError> {
        let _guard = self.store_lock.write().await;
        self.regenerate_locked().await
    }

    async fn regenerate_locked(&self) -> Result<(), DirectoryError> {
        let applications = self.discover().await;
        let users = self.accounts().await;
        let configs = self.build_connections(&applications, &users);
        self.store.write(&configs).await?;
        info!(
            "Regenerated {} connections ({} applications, {} users)",
            configs.len(),
            applications.len(),
            users.len()
        );
        Ok(())
    }

    /// Published applications; any source failure degrades to none.
    async fn discover(&self) -> Vec<ApplicationDescriptor> {
        let timeout = self.config.command_timeout();
        match tokio::time::timeout(timeout, self.source.discover_applications()).await {
            Ok(Ok(apps)) => apps,
            Ok(Err(e)) => {
                warn!("Application discovery failed, continuing without applications: {e}");
                Vec::new()
            }
            Err(_) => {
                let e = DirectoryError::CommandTimeout(timeout);
                warn!("Application discovery failed, continuing without applications: {e}");
                Vec::new()
            }
        }
    }

    async fn accounts(&self) -> Vec<UserAccount> {
        match self.users.list_users().await {
            Ok(users) => users,
            Err(e) => {
                warn!("User directory unavailable, continuing without users: {e}");
                Vec::new()
            }
        }
    }

    /// One connection per (user, application) pair, then the two reserved ones.
    pub fn build_connections(
        &self,
        applications: &[ApplicationDescriptor],
        users: &[UserAccount],
    ) -> Configs {
        let mut configs = Vec::with_capacity(users.len() * applications.len() + 2);
        let mut seen = HashSet::new();

        for user in users {
            for app in applications {
                if app.alias == MANAGEMENT_CONNECTION {
                    continue;
                }

                let name = format!("{}_{}", app.alias, user.email);
                if is_reserved(&name) || !seen.insert(name.clone()) {
                    debug!("Skipping duplicate connection {name}");
                    continue;
                }

                let host = self
                    .selector
                    .select(&self.config.execution_servers)
                    .unwrap_or(self.config.server.as_str());

                configs.push(
                    ConnectionConfig::rdp(name)
                        .param(param::HOSTNAME, host)
                        .param(param::PORT, self.config.rdp_port.as_str())
                        .param(param::USERNAME, self.config.domain_user(&user.sam))
                        .param(param::PASSWORD, user.password.as_str())
                        .param(param::REMOTE_APP, remote_app_for(&app.alias)),
                );
            }
        }

        configs.push(self.service_connection(DESKTOP_CONNECTION));
        configs.push(
            self.service_connection(MANAGEMENT_CONNECTION)
                .param(param::REMOTE_APP, MANAGEMENT_REMOTE_APP),
        );

        Configs { configs }
    }

    /// Reserved connection on the primary server with the service account.
    fn service_connection(&self, name: &str) -> ConnectionConfig {
        ConnectionConfig::rdp(name)
            .param(param::HOSTNAME, self.config.server.as_str())
            .param(param::PORT, self.config.rdp_port.as_str())
            .param(param::USERNAME, self.config.domain_user(&self.config.user))
            .param(param::PASSWORD, self.config.password.as_str())
    }

    /// Regenerate, then list every application connection.
    pub async fn list_all_connections(&self) -> Result<Vec<Connection>, DirectoryError> {
        let _guard = self.store_lock.write().await;
        self.regenerate_locked().await?;
        let configs = self.store.read().await?;

        Ok(configs
            .configs
            .iter()
            .map(ConnectionConfig::to_connection)
            .filter(Connection::is_application)
            .collect())
    }

    /// Connections of one account, from the last persisted document.
    ///
    /// Does not regenerate: results can lag behind the application source
    /// until the next [`Self::list_all_connections`] or [`Self::regenerate`].
    pub async fn list_connections_for_user(&self, logon: &str) -> Result<Vec<Connection>, DirectoryError> {
        let _guard = self.store_lock.read().await;
        let configs = self.store.read().await?;
        let username = self.config.domain_user(logon);

        Ok(configs
            .configs
            .iter()
            .filter(|c| !is_reserved(&c.name))
            .map(ConnectionConfig::to_connection)
            .filter(|c| c.username == username)
            .collect())
    }

    /// The persisted document as is.
    pub async fn read_store(&self) -> Result<Configs, DirectoryError> {
        let _guard = self.store_lock.read().await;
        self.store.read().await
    }
}
