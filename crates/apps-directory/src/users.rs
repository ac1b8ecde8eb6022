//! User directory — the accounts that get application connections.

use std::future::Future;

use parking_lot::RwLock;

use crate::error::DirectoryError;
use crate::model::UserAccount;

/// Capability the engine uses to enumerate entitled accounts.
pub trait UserDirectory: Send + Sync {
    fn list_users(&self) -> impl Future<Output = Result<Vec<UserAccount>, DirectoryError>> + Send;
}

/// In-memory account list, seeded from configuration.
#[derive(Debug, Default)]
pub struct StaticUserDirectory {
    users: RwLock<Vec<UserAccount>>,
}

impl StaticUserDirectory {
    pub fn new(users: Vec<UserAccount>) -> Self {
        Self {
            users: RwLock::new(users),
        }
    }

    /// Swap the account list. Takes effect on the next regeneration.
    pub fn replace(&self, users: Vec<UserAccount>) {
        *self.users.write() = users;
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

impl UserDirectory for StaticUserDirectory {
    async fn list_users(&self) -> Result<Vec<UserAccount>, DirectoryError> {
        Ok(self.users.read().clone())
    }
}
