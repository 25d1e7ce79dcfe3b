//! Live notification server.
//!
//! An axum server that accepts WebSocket handshakes at `/sock` and pushes
//! `{"type":"reload"}` / `{"type":"error","errors":[...]}` frames to the one
//! connected browser. Any other routes are registered by the caller.

use crate::dev::state::ConnectionSlot;
use crate::error::{CliError, Result};
use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, MethodRouter},
    Router,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

/// URL prefix of the duplex channel.
pub const SOCK_PREFIX: &str = "/sock";

/// URL of the browser reload client.
pub const RELOAD_SCRIPT_PATH: &str = "/__pie_reload__.js";

const RELOAD_SCRIPT: &str = include_str!("../../assets/dev/reload-client.js");

/// Frames pushed to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LiveEvent {
    Reload,
    Error { errors: Vec<String> },
}

/// A running server.
#[derive(Debug)]
pub struct Listening {
    pub addr: SocketAddr,
    pub task: JoinHandle<()>,
}

impl Listening {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Single-client push server.
#[derive(Clone)]
pub struct LiveServer {
    router: Router,
    slot: ConnectionSlot,
}

impl Default for LiveServer {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveServer {
    pub fn new() -> Self {
        let slot = ConnectionSlot::new();
        let router = Router::new()
            .route(SOCK_PREFIX, get(handle_upgrade))
            .with_state(slot.clone());
        Self { router, slot }
    }

    /// Register a route on the underlying HTTP server.
    pub fn on(mut self, path: &str, handler: MethodRouter) -> Self {
        self.router = self.router.route(path, handler);
        self
    }

    /// Merge a whole router; its fallback becomes the server's fallback.
    pub fn merge(mut self, app: Router) -> Self {
        self.router = self.router.merge(app);
        self
    }

    /// Bind `127.0.0.1:port` and serve in the background.
    ///
    /// Port `0` picks a free port; the bound address is in the result.
    pub async fn listen(&self, port: u16) -> Result<Listening> {
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| CliError::Server(format!("Failed to bind to {}: {}", addr, e)))?;
        let addr = listener.local_addr()?;

        let app = self.router.clone().layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                warn!("Server error: {}", e);
            }
        });

        info!("Live server listening on {}", addr);
        Ok(Listening { addr, task })
    }

    /// Tell the browser to reload. Dropped when nobody is connected.
    pub fn reload(&self, name: &str) {
        self.push(name, &LiveEvent::Reload);
    }

    /// Send compile errors to the browser. Dropped when nobody is connected.
    pub fn error(&self, name: &str, errors: &[String]) {
        self.push(
            name,
            &LiveEvent::Error {
                errors: errors.to_vec(),
            },
        );
    }

    pub fn is_connected(&self) -> bool {
        self.slot.is_active()
    }

    fn push(&self, name: &str, event: &LiveEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to serialize live event: {}", e);
                return;
            }
        };
        if self.slot.send(payload) {
            debug!(pie = name, ?event, "pushed");
        } else {
            debug!(pie = name, ?event, "no client connected, dropped");
        }
    }
}

async fn handle_upgrade(ws: WebSocketUpgrade, State(slot): State<ConnectionSlot>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, slot))
}

async fn handle_socket(socket: WebSocket, slot: ConnectionSlot) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let id = slot.replace(tx);
    info!(id, "Live client connected");

    loop {
        tokio::select! {
            outgoing = rx.recv() => {
                let Some(text) = outgoing else {
                    // Replaced by a newer connection.
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                };
                if ws_tx.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Nothing is expected upstream.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    slot.clear_if(id);
    info!(id, "Live client disconnected");
}

/// Routes serving `root` as static files, with the reload client injected
/// into HTML pages.
pub fn static_files(root: PathBuf) -> Router {
    Router::new()
        .route(RELOAD_SCRIPT_PATH, get(handle_reload_script))
        .route("/favicon.ico", get(|| async { StatusCode::NO_CONTENT }))
        .fallback(handle_request)
        .with_state(root)
}

async fn handle_reload_script() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        RELOAD_SCRIPT,
    )
}

async fn handle_request(State(root): State<PathBuf>, uri: Uri) -> Response {
    let Some(mut file_path) = resolve_request_path(&root, uri.path()) else {
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    };
    if file_path.is_dir() {
        file_path = file_path.join("index.html");
    }

    match tokio::fs::read(&file_path).await {
        Ok(content) => {
            let content_type = determine_content_type(&file_path);
            let body = inject_reload_script(&content, content_type);
            (
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CACHE_CONTROL, "no-cache"),
                ],
                Body::from(body),
            )
                .into_response()
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            (StatusCode::NOT_FOUND, format!("File not found: {}", uri.path())).into_response()
        }
        Err(e) => {
            warn!("Failed to read {}: {}", file_path.display(), e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Map a URL path under `root`. `None` if it tries to leave `root`.
fn resolve_request_path(root: &Path, url_path: &str) -> Option<PathBuf> {
    let mut out = root.to_path_buf();
    for component in Path::new(url_path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(out)
}

/// Add the reload client before `</body>`, or at the end.
fn inject_reload_script(content: &[u8], content_type: &str) -> Vec<u8> {
    if !content_type.starts_with("text/html") {
        return content.to_vec();
    }

    let html = String::from_utf8_lossy(content);
    let script_tag = format!(r#"<script src="{}"></script>"#, RELOAD_SCRIPT_PATH);

    match html.rfind("</body>") {
        Some(pos) => format!("{}  {}\n{}", &html[..pos], script_tag, &html[pos..]).into_bytes(),
        None => format!("{}\n{}", html, script_tag).into_bytes(),
    }
}

fn determine_content_type(path: &Path) -> &'static str {
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

    match extension {
        "js" | "mjs" => "application/javascript",
        "json" | "map" => "application/json",
        "html" => "text/html; charset=utf-8",
        "css" => "text/css",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_frames() {
        assert_eq!(serde_json::to_string(&LiveEvent::Reload).unwrap(), r#"{"type":"reload"}"#);
        assert_eq!(
            serde_json::to_string(&LiveEvent::Error {
                errors: vec!["bad".to_string()]
            })
            .unwrap(),
            r#"{"type":"error","errors":["bad"]}"#
        );
    }

    #[test]
    fn test_push_without_client_is_noop() {
        let server = LiveServer::new();
        assert!(!server.is_connected());
        server.reload("text-entry");
        server.error("text-entry", &["oops".to_string()]);
    }

    #[test]
    fn test_inject_reload_script_with_body() {
        let html = b"<html><body><h1>Hi</h1></body></html>";
        let result = String::from_utf8(inject_reload_script(html, "text/html; charset=utf-8")).unwrap();

        let script_pos = result.find(RELOAD_SCRIPT_PATH).unwrap();
        let body_pos = result.find("</body>").unwrap();
        assert!(script_pos < body_pos);
    }

    #[test]
    fn test_inject_reload_script_non_html() {
        let js = b"console.log(1)";
        assert_eq!(inject_reload_script(js, "application/javascript"), js.to_vec());
    }

    #[test]
    fn test_resolve_request_path_stays_in_root() {
        let root = Path::new("/w");
        assert_eq!(
            resolve_request_path(root, "/demo/index.html"),
            Some(PathBuf::from("/w/demo/index.html"))
        );
        assert_eq!(resolve_request_path(root, "/"), Some(PathBuf::from("/w")));
        assert!(resolve_request_path(root, "/../etc/passwd").is_none());
    }
}
