//! The log viewer: a loopback-only HTTP server that streams the event log to
//! browsers over a WebSocket.
mod api;
mod guard;
mod status;
mod websocket;

pub use status::ViewerStatus;
pub use websocket::LogHub;

use crate::logging::{EventLog, SubscriptionId, DEFAULT_HISTORY_SIZE};
use axum::{
    http::{header, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use parking_lot::RwLock;
use rust_embed::RustEmbed;
use std::net::Ipv4Addr;
use std::process::Stdio;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::process::Command;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{debug, error, info, warn};

#[derive(RustEmbed)]
#[folder = "web-ui/"]
struct Assets;

pub const DEFAULT_PORT: u16 = 3456;
pub const DEFAULT_MAX_PORT_RETRIES: u16 = 10;

/// Settings for the log viewer, read once at start-up.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub enabled: bool,
    /// First port tried; the next `max_port_retries - 1` ports are tried after it.
    pub base_port: u16,
    pub max_port_retries: u16,
    /// Open the viewer page in a browser once the server is up.
    pub auto_open: bool,
    pub history_size: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_port: DEFAULT_PORT,
            max_port_retries: DEFAULT_MAX_PORT_RETRIES,
            auto_open: true,
            history_size: DEFAULT_HISTORY_SIZE,
        }
    }
}

/// State shared by every request handler of a running viewer.
pub struct ViewerState {
    pub hub: Arc<LogHub>,
    pub port: u16,
    /// Flips to `true` when the viewer shuts down.
    pub shutdown: watch::Receiver<bool>,
}

struct RunningViewer {
    port: u16,
    hub: Arc<LogHub>,
    subscription: SubscriptionId,
    shutdown_tx: watch::Sender<bool>,
    server: JoinHandle<()>,
}

/// Lifecycle handle for the log viewer.
///
/// The viewer is optional: failing to start leaves it stopped and the rest of
/// the process carries on.
pub struct LogViewer {
    config: ViewerConfig,
    log: Arc<EventLog>,
    lifecycle: Mutex<()>,
    running: RwLock<Option<RunningViewer>>,
}

impl LogViewer {
    pub fn new(config: ViewerConfig, log: Arc<EventLog>) -> Self {
        Self {
            config,
            log,
            lifecycle: Mutex::new(()),
            running: RwLock::new(None),
        }
    }

    /// Starts the viewer and returns the bound port.
    ///
    /// Tries `base_port`, then each following port up to `max_port_retries`
    /// attempts. Returns the current port if already running and `None` when
    /// disabled or when no port could be bound.
    pub async fn start(&self) -> Option<u16> {
        let _lifecycle = self.lifecycle.lock().await;
        if let Some(port) = self.current_port() {
            return Some(port);
        }

        if !self.config.enabled {
            info!("[LOG-VIEWER] disabled (LOG_VIEWER=false)");
            return None;
        }

        let Some((listener, port)) =
            bind_first_free(self.config.base_port, self.config.max_port_retries).await
        else {
            let last = self
                .config
                .base_port
                .saturating_add(self.config.max_port_retries.saturating_sub(1));
            error!(
                "[LOG-VIEWER] failed to start: ports {}-{} are all in use",
                self.config.base_port, last
            );
            return None;
        };

        let hub = Arc::new(LogHub::new(self.config.history_size));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = Arc::new(ViewerState {
            hub: hub.clone(),
            port,
            shutdown: shutdown_rx.clone(),
        });
        let app = router(state);

        let subscription = self.log.subscribe(hub.clone());
        debug!(
            "[LOG-VIEWER] attached to event log ({} subscribers)",
            self.log.subscriber_count()
        );

        let mut stop = shutdown_rx;
        let server = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = stop.changed().await;
            });
            if let Err(e) = serve.await {
                error!("[LOG-VIEWER] server error: {}", e);
            }
        });

        let url = viewer_url(port);
        info!("[LOG-VIEWER] running at {}", url);
        if self.config.auto_open {
            open_browser(&url);
        }

        *self.running.write() = Some(RunningViewer {
            port,
            hub,
            subscription,
            shutdown_tx,
            server,
        });
        Some(port)
    }

    /// Stops the server, closes every observer connection and detaches from
    /// the event log. Does nothing when not running.
    pub async fn shutdown(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        let Some(running) = self.running.write().take() else {
            return;
        };

        self.log.unsubscribe(running.subscription);
        let _ = running.shutdown_tx.send(true);
        if let Err(e) = running.server.await {
            warn!("[LOG-VIEWER] server task ended abnormally: {}", e);
        }
        running.hub.clear();
        info!("[LOG-VIEWER] stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.read().is_some()
    }

    pub fn current_port(&self) -> Option<u16> {
        self.running.read().as_ref().map(|running| running.port)
    }

    pub fn current_url(&self) -> Option<String> {
        self.current_port().map(viewer_url)
    }

    /// Reports whether the viewer is up and, if `open` is set, opens it in a browser.
    pub fn status(&self, open: bool) -> ViewerStatus {
        match self.current_port() {
            Some(port) => {
                let url = viewer_url(port);
                if open {
                    open_browser(&url);
                }
                ViewerStatus::running(port, url, open)
            }
            None => ViewerStatus::stopped(),
        }
    }
}

pub fn viewer_url(port: u16) -> String {
    format!("http://localhost:{}", port)
}

/// Builds the viewer's routes.
///
/// The host check wraps everything, including the fallback, so a foreign
/// `Host` is refused before routing.
pub fn router(state: Arc<ViewerState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/api/history", get(api::get_history))
        .route("/api/info", get(api::get_info))
        .route("/ws", get(websocket::ws_handler))
        .fallback(not_found)
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("null"),
        ))
        .layer(middleware::from_fn(guard::require_local_host))
        .with_state(state)
}

async fn bind_first_free(base_port: u16, attempts: u16) -> Option<(TcpListener, u16)> {
    for offset in 0..attempts {
        let Some(port) = base_port.checked_add(offset) else {
            break;
        };
        match TcpListener::bind((Ipv4Addr::LOCALHOST, port)).await {
            Ok(listener) => {
                // Port 0 asks the OS for a free port; report the real one.
                let bound = listener.local_addr().map(|a| a.port()).unwrap_or(port);
                return Some((listener, bound));
            }
            Err(e) => debug!("[LOG-VIEWER] port {} unavailable: {}", port, e),
        }
    }
    None
}

/// Opens `url` with the platform's browser launcher, without waiting for it.
fn open_browser(url: &str) {
    let mut command = if cfg!(target_os = "macos") {
        let mut command = Command::new("open");
        command.arg(url);
        command
    } else if cfg!(target_os = "windows") {
        let mut command = Command::new("cmd");
        command.args(["/c", "start", url]);
        command
    } else {
        let mut command = Command::new("xdg-open");
        command.arg(url);
        command
    };

    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    if let Err(e) = command.spawn() {
        debug!("[LOG-VIEWER] could not open browser: {}", e);
    }
}

async fn index_handler() -> Response {
    match Assets::get("index.html") {
        Some(content) => (
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            content.data.into_owned(),
        )
            .into_response(),
        None => not_found().await,
    }
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}
