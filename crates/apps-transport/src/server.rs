//! HTTP transport server using Axum.
//!
//! Every request except `/health` is turned into a [`PlugRequest`], handed
//! to the [`RequestHandler`], and the resulting [`PlugReply`] is written
//! back. The path is percent-decoded before it reaches the handler; the
//! query string is not. A reply no handler touched (status 0) becomes a 404.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use apps_protocol::{ApiError, PlugReply, PlugRequest, Values};
use axum::{
    Router,
    body::{Body, to_bytes},
    extract::{Query, Request, State},
    http::{HeaderName, HeaderValue, StatusCode, Uri, header},
    response::{IntoResponse, Json, Response},
    routing::get,
};
use percent_encoding::percent_decode_str;
use serde_json::json;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Implemented by whatever answers requests (the router).
pub trait RequestHandler: Send + Sync + 'static {
    fn handle_request(
        &self,
        request: PlugRequest,
    ) -> impl std::future::Future<Output = PlugReply> + Send;
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid listen address {0}")]
    InvalidAddress(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Transport server configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Port to listen on (0 for OS-assigned)
    pub port: u16,
    /// Hostname to bind to
    pub hostname: String,
    /// Largest request body accepted, in bytes
    pub max_body_bytes: usize,
    /// Connection document path (reported by /health)
    pub connections_file: Option<PathBuf>,
    /// Log every request at info instead of debug
    pub verbose_logging: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            hostname: "127.0.0.1".into(),
            max_body_bytes: 1024 * 1024,
            connections_file: None,
            verbose_logging: false,
        }
    }
}

struct AppState<H: RequestHandler> {
    handler: Arc<H>,
    config: TransportConfig,
}

/// The transport server — owns the listener task.
pub struct TransportServer {
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
    port: u16,
}

impl TransportServer {
    /// Bind and start serving with the given request handler.
    pub async fn start<H: RequestHandler>(
        config: TransportConfig,
        handler: H,
    ) -> Result<Self, TransportError> {
        Self::start_shared(config, Arc::new(handler)).await
    }

    /// Like [`Self::start`], for a handler shared with other owners.
    pub async fn start_shared<H: RequestHandler>(
        config: TransportConfig,
        handler: Arc<H>,
    ) -> Result<Self, TransportError> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let addr_text = format!("{}:{}", config.hostname, config.port);
        let addr: SocketAddr = addr_text
            .parse()
            .map_err(|_| TransportError::InvalidAddress(addr_text.clone()))?;

        let state = Arc::new(AppState {
            handler,
            config: config.clone(),
        });

        let app = Router::new()
            .route("/health", get(health_handler::<H>))
            .fallback(plug_handler::<H>)
            .with_state(state);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind { addr, source })?;
        let actual_port = listener
            .local_addr()
            .map_err(|source| TransportError::Bind { addr, source })?
            .port();

        info!("Apps transport listening on http://{}:{}", config.hostname, actual_port);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                })
                .await
                .ok();
        });

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
            port: actual_port,
        })
    }

    /// Get the actual bound port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Gracefully stop the server.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!("Apps transport server stopped");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn health_handler<H: RequestHandler>(
    State(state): State<Arc<AppState<H>>>,
) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "connectionsFile": state.config.connections_file.as_ref().map(|p| p.display().to_string()),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn plug_handler<H: RequestHandler>(
    State(state): State<Arc<AppState<H>>>,
    request: Request,
) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let (parts, body) = request.into_parts();

    let body = match to_bytes(body, state.config.max_body_bytes).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).to_string(),
        Err(e) => {
            warn!("[{request_id}] Failed to read request body: {e}");
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    let url = request_url(&parts.uri);

    let mut headers = Values::new();
    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            headers
                .entry(canonical_header(name.as_str()))
                .or_default()
                .push(value.to_string());
        }
    }

    let is_form = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

    let plug = PlugRequest {
        form: parse_query(parts.uri.query()),
        post_form: if is_form { parse_query(Some(&body)) } else { Values::new() },
        url,
        method: parts.method.as_str().to_string(),
        body,
        header: headers,
    };

    if state.config.verbose_logging {
        info!("[{request_id}] {} {}", plug.method, plug.url);
    } else {
        debug!("[{request_id}] {} {}", plug.method, plug.url);
    }

    let path = plug.path().to_string();
    let reply = state.handler.handle_request(plug).await;
    if !reply.is_handled() {
        debug!("[{request_id}] Not found: {path}");
        return not_found(&path);
    }
    into_response(reply)
}

/// Percent-decoded path plus the raw query string. A path that does not
/// decode to UTF-8 is passed through as received.
fn request_url(uri: &Uri) -> String {
    let raw = uri.path();
    let path = percent_decode_str(raw)
        .decode_utf8()
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path,
    }
}

/// Parse an urlencoded string into a multi-map. Undecodable input is empty.
fn parse_query(query: Option<&str>) -> Values {
    let mut values = Values::new();
    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return values;
    };
    let Ok(uri) = format!("/?{query}").parse::<Uri>() else {
        return values;
    };
    if let Ok(Query(pairs)) = Query::<Vec<(String, String)>>::try_from_uri(&uri) {
        for (key, value) in pairs {
            values.entry(key).or_default().push(value);
        }
    }
    values
}

/// `content-type` → `Content-Type`.
fn canonical_header(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

fn not_found(path: &str) -> Response {
    let err = ApiError::not_found(path);
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "code": err.code, "message": err.message })),
    )
        .into_response()
}

fn into_response(reply: PlugReply) -> Response {
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = Response::new(Body::from(reply.body.unwrap_or_default()));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    for (name, value) in reply.head_vals {
        match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!("Dropping invalid reply header {name}"),
        }
    }
    response
}
