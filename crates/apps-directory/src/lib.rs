//! Remote application connection directory
//!
//! Builds the gateway connection document from the published remote
//! applications, the entitled users and the execution server pool, and
//! answers queries over it. External systems are reached through the
//! [`ApplicationSource`] and [`UserDirectory`] capabilities.

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod publish;
pub mod selector;
pub mod source;
pub mod store;
pub mod users;

pub use config::DirectoryConfig;
pub use engine::DirectoryEngine;
pub use error::DirectoryError;
pub use model::{ApplicationDescriptor, Connection, UserAccount};
pub use publish::{UnpublishOutcome, UnpublishStatus};
pub use selector::{RandomSelector, ServerSelector};
pub use source::{ApplicationSource, ScriptApplicationSource};
pub use store::{Configs, ConnectionConfig, StoreFile};
pub use users::{StaticUserDirectory, UserDirectory};
