//! Route pattern and verb constants for the apps endpoints.
//!
//! Patterns are anchored regular expressions matched against the request
//! path. A pattern carries at most one capture group; its text becomes the
//! handler parameter.

/// Route patterns, in the order the default table registers them.
pub struct Routes;

impl Routes {
    /// `/api/apps` with an optional trailing slash.
    pub const APPS: &str = r"^/api/apps/?$";
    /// `/api/apps/{id}` with an optional trailing slash.
    pub const APP: &str = r"^/api/apps/(?P<id>[^/]+)/?$";
}

/// HTTP verbs as they appear in [`crate::PlugRequest::method`].
pub struct Verbs;

impl Verbs {
    pub const GET: &str = "GET";
    pub const DELETE: &str = "DELETE";
}
