//! Apps directory transport layer
//!
//! Serves the apps API over HTTP. Each request is converted into a
//! [`apps_protocol::PlugRequest`] and answered by a [`RequestHandler`];
//! the transport knows nothing about routes or the directory itself.

pub mod server;

pub use server::{RequestHandler, TransportConfig, TransportError, TransportServer};
