//! Apps directory request routing
//!
//! An ordered route table that dispatches [`apps_protocol::PlugRequest`]s
//! to handlers, and the handlers of the apps API on top of
//! [`apps_directory::DirectoryEngine`].

pub mod handlers;
pub mod router;

pub use handlers::{ListApplications, ListUserApplications, UnpublishApplication, apps_router};
pub use router::{Handler, Router, RouterError};
