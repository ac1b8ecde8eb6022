//! Request/reply envelope exchanged between the transport and the router.
//!
//! Field names are PascalCase on the wire so the envelope stays compatible
//! with clients of the plugin interface it replaces.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Content type set by every JSON handler.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Header carrying the content type in [`PlugReply::head_vals`].
pub const CONTENT_TYPE: &str = "Content-Type";

/// Multi-valued string map (headers, form values).
pub type Values = HashMap<String, Vec<String>>;

/// Result of a route handler. The reply is filled in place.
pub type HandlerResult = Result<(), ApiError>;

/// Inbound request handed to the router.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PlugRequest {
    /// Request path, optionally with a query string.
    pub url: String,
    /// Upper-case HTTP verb.
    pub method: String,
    pub body: String,
    pub header: Values,
    pub form: Values,
    pub post_form: Values,
}

impl PlugRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            ..Default::default()
        }
    }

    /// The URL without its query string.
    pub fn path(&self) -> &str {
        match self.url.split_once('?') {
            Some((path, _)) => path,
            None => &self.url,
        }
    }
}

/// Reply populated by the handlers a request matched.
///
/// A reply nobody touched keeps `status == 0` and no body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PlugReply {
    pub status: u16,
    pub head_vals: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl PlugReply {
    /// Whether any handler wrote to this reply.
    pub fn is_handled(&self) -> bool {
        self.status != 0
    }

    /// Reset headers for a JSON response and set status 200.
    pub fn begin_json(&mut self) {
        self.head_vals.clear();
        self.head_vals
            .insert(CONTENT_TYPE.to_string(), JSON_CONTENT_TYPE.to_string());
        self.status = 200;
    }

    /// Serialize `value` as the body.
    pub fn set_json<T: Serialize>(&mut self, value: &T) -> HandlerResult {
        match serde_json::to_string(value) {
            Ok(body) => {
                self.body = Some(body);
                Ok(())
            }
            Err(e) => {
                let err = ApiError::internal(format!("Failed to encode response: {e}"));
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Record a failure: status from the error, body unset.
    pub fn fail(&mut self, err: &ApiError) {
        self.status = err.status();
        self.body = None;
    }

    pub fn content_type(&self) -> Option<&str> {
        self.head_vals.get(CONTENT_TYPE).map(String::as_str)
    }
}
