//! Request router — an ordered table of (path pattern, verb, handler).
//!
//! Every route whose verb and pattern match the request is invoked, in
//! table order. Later handlers see (and may overwrite) what earlier ones
//! wrote into the reply. A handler error is logged and evaluation moves on
//! to the next route; the router itself never fails.

use std::future::Future;
use std::pin::Pin;

use apps_protocol::{HandlerResult, PlugReply, PlugRequest};
use apps_transport::RequestHandler;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

/// A route handler. `param` is the pattern's capture, or `""`.
pub trait Handler: Send + Sync {
    fn handle(
        &self,
        request: &PlugRequest,
        reply: &mut PlugReply,
        param: &str,
    ) -> impl Future<Output = HandlerResult> + Send;

    /// Handler name for logs.
    fn name(&self) -> &str;
}

/// Object-safe wrapper for the Handler trait.
trait HandlerDyn: Send + Sync {
    fn handle_dyn<'a>(
        &'a self,
        request: &'a PlugRequest,
        reply: &'a mut PlugReply,
        param: &'a str,
    ) -> Pin<Box<dyn Future<Output = HandlerResult> + Send + 'a>>;
    fn name_dyn(&self) -> &str;
}

impl<T: Handler> HandlerDyn for T {
    fn handle_dyn<'a>(
        &'a self,
        request: &'a PlugRequest,
        reply: &'a mut PlugReply,
        param: &'a str,
    ) -> Pin<Box<dyn Future<Output = HandlerResult> + Send + 'a>> {
        Box::pin(self.handle(request, reply, param))
    }
    fn name_dyn(&self) -> &str {
        self.name()
    }
}

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("invalid route pattern {pattern}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("route pattern {0} has more than one capture group")]
    TooManyCaptures(String),
}

struct Route {
    pattern: Regex,
    method: String,
    handler: Box<dyn HandlerDyn>,
}

/// Ordered route table.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Append a route. Patterns may carry at most one capture group.
    pub fn route<H: Handler + 'static>(
        &mut self,
        pattern: &str,
        method: &str,
        handler: H,
    ) -> Result<&mut Self, RouterError> {
        let regex = Regex::new(pattern).map_err(|source| RouterError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        // captures_len counts the implicit whole-match group
        if regex.captures_len() > 2 {
            return Err(RouterError::TooManyCaptures(pattern.to_string()));
        }

        debug!("Registering route {method} {pattern} -> {}", handler.name());
        self.routes.push(Route {
            pattern: regex,
            method: method.to_string(),
            handler: Box::new(handler),
        });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Run every matching route against a fresh reply.
    pub async fn dispatch(&self, request: &PlugRequest) -> PlugReply {
        let mut reply = PlugReply::default();
        let path = request.path();

        for route in &self.routes {
            if route.method != request.method {
                continue;
            }
            let Some(captures) = route.pattern.captures(path) else {
                continue;
            };
            let param = captures.get(1).map(|m| m.as_str()).unwrap_or("");

            debug!("{} {path} -> {} ({param:?})", request.method, route.handler.name_dyn());
            if let Err(e) = route.handler.handle_dyn(request, &mut reply, param).await {
                warn!("{} {path} failed in {}: {e}", request.method, route.handler.name_dyn());
            }
        }

        if !reply.is_handled() {
            debug!("No route for {} {path}", request.method);
        }
        reply
    }
}

impl RequestHandler for Router {
    async fn handle_request(&self, request: PlugRequest) -> PlugReply {
        self.dispatch(&request).await
    }
}
