//! Apps directory protocol types
//!
//! The request/reply envelope the router consumes and produces, the route
//! patterns of the apps API, and the error codes handlers report with.
//! This crate is the single source of truth for everything that crosses
//! the transport boundary.

pub mod error;
pub mod request;
pub mod routes;

pub use error::{ApiError, ApiErrorCode};
pub use request::{
    CONTENT_TYPE, HandlerResult, JSON_CONTENT_TYPE, PlugReply, PlugRequest, Values,
};
pub use routes::{Routes, Verbs};
