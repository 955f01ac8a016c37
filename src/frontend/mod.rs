//! Network frontends that feed the handoff queue
//!
//! A frontend runs its own tokio runtime on a dedicated thread. Request
//! handlers never touch the debugging session: they submit to the shared
//! [`HandoffQueue`] through `spawn_blocking` and translate the result into
//! their protocol's envelope.
//!
//! # Module Structure
//!
//! - `http` - plain request/response API (`/exec`, `/ask`)
//! - `mcp` - MCP tool server (`dbg_exec`, `dbg_ask`) at `/mcp`
//! - `info` - operator banners

mod http;
mod info;
mod mcp;

use std::fmt;
use std::future::IntoFuture;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, mpsc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::routing::{get, post};
use serde::Serialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use crate::error::{AgentError, Result};
use crate::handoff::{CommandKind, HandoffQueue};

pub use info::{format_http_info, format_mcp_info};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Default bind address (loopback only)
pub const DEFAULT_BIND: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Delay between answering `/shutdown` and stopping the queue
const SHUTDOWN_DELAY: Duration = Duration::from_millis(100);

/// How long open connections may linger after shutdown is requested
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

// ============================================================================
// FRONTEND SERVER
// ============================================================================

/// Which protocol a frontend speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FrontendKind {
    Http,
    Mcp,
}

impl FrontendKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Mcp => "mcp",
        }
    }
}

impl fmt::Display for FrontendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a bind address for a frontend
///
/// # Errors
/// Returns [`AgentError::InvalidConfig`] for anything that is not an IP address
pub fn parse_bind_addr(s: &str) -> Result<IpAddr> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(DEFAULT_BIND);
    }
    if s.eq_ignore_ascii_case("localhost") {
        return Ok(DEFAULT_BIND);
    }
    s.parse()
        .map_err(|_| AgentError::invalid_config(format!("Invalid bind address: {s}")))
}

/// A running frontend bound to an OS-assigned port
pub struct FrontendServer {
    kind: FrontendKind,
    addr: SocketAddr,
    cancel: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl FrontendServer {
    /// Bind `bind:0` and start serving `kind` against `queue`.
    ///
    /// Returns once the listener is bound.
    ///
    /// # Errors
    /// Returns [`AgentError::Frontend`] if the runtime cannot start or the
    /// address cannot be bound
    pub fn start(kind: FrontendKind, bind: IpAddr, queue: Arc<HandoffQueue>) -> Result<Self> {
        let cancel = CancellationToken::new();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<SocketAddr>>();

        let thread_cancel = cancel.clone();
        let thread = thread::Builder::new()
            .name(format!("dbg-agent-{kind}"))
            .spawn(move || run_frontend(kind, bind, queue, thread_cancel, ready_tx))?;

        let addr = match ready_rx.recv() {
            Ok(Ok(addr)) => addr,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(AgentError::frontend(format!(
                    "{kind} frontend exited before binding"
                )));
            }
        };

        log::info!("{kind} frontend listening on {addr}");
        Ok(Self {
            kind,
            addr,
            cancel,
            thread: Some(thread),
        })
    }

    #[must_use]
    pub fn kind(&self) -> FrontendKind {
        self.kind
    }

    /// Bound address
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `http://ip:port`
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// False once shutdown was requested
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Token that stops this frontend when cancelled
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request shutdown and wait for the serving thread to exit
    pub fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("{} frontend thread panicked", self.kind);
            }
            log::info!("{} frontend on {} stopped", self.kind, self.addr);
        }
    }
}

impl Drop for FrontendServer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for FrontendServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrontendServer")
            .field("kind", &self.kind)
            .field("addr", &self.addr)
            .field("running", &self.is_running())
            .finish()
    }
}

fn run_frontend(
    kind: FrontendKind,
    bind: IpAddr,
    queue: Arc<HandoffQueue>,
    cancel: CancellationToken,
    ready: mpsc::Sender<Result<SocketAddr>>,
) {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name(format!("dbg-agent-{kind}-worker"))
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            let _ = ready.send(Err(AgentError::frontend(format!(
                "failed to start runtime: {e}"
            ))));
            return;
        }
    };

    runtime.block_on(async move {
        let listener = match tokio::net::TcpListener::bind(SocketAddr::new(bind, 0)).await {
            Ok(listener) => listener,
            Err(e) => {
                let _ = ready.send(Err(AgentError::frontend(format!(
                    "failed to bind {bind}: {e}"
                ))));
                return;
            }
        };
        let addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                let _ = ready.send(Err(e.into()));
                return;
            }
        };

        let state = BridgeState {
            queue,
            shutdown: cancel.clone(),
        };
        let router = match kind {
            FrontendKind::Http => http::router(state),
            FrontendKind::Mcp => mcp::router(state),
        };

        if ready.send(Ok(addr)).is_err() {
            return;
        }

        let serve = axum::serve(listener, router)
            .with_graceful_shutdown(cancel.clone().cancelled_owned())
            .into_future();

        tokio::select! {
            result = serve => {
                if let Err(e) = result {
                    log::error!("{kind} frontend failed: {e}");
                }
            }
            () = async {
                cancel.cancelled().await;
                tokio::time::sleep(SHUTDOWN_GRACE).await;
            } => {
                log::warn!("{kind} frontend connections did not close in time; dropping them");
            }
        }
    });

    runtime.shutdown_timeout(SHUTDOWN_GRACE);
}

// ============================================================================
// SHARED REQUEST HANDLING
// ============================================================================

/// State shared by every route of a frontend
#[derive(Clone)]
pub(crate) struct BridgeState {
    queue: Arc<HandoffQueue>,
    shutdown: CancellationToken,
}

impl BridgeState {
    /// Submit through the queue without blocking the async runtime
    pub(crate) async fn submit(&self, kind: CommandKind, input: String) -> Result<String> {
        let queue = Arc::clone(&self.queue);
        tokio::task::spawn_blocking(move || queue.submit(kind, input))
            .await
            .map_err(|e| AgentError::frontend(format!("submission task failed: {e}")))?
    }

    /// Answer `/shutdown`: stop the queue shortly after replying
    pub(crate) fn request_shutdown(&self) {
        let queue = Arc::clone(&self.queue);
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(SHUTDOWN_DELAY).await;
            log::info!("Shutdown requested by client");
            queue.stop();
            shutdown.cancel();
        });
    }
}

/// `/status` and `/shutdown`, served by every frontend
pub(crate) fn control_routes() -> Router<BridgeState> {
    Router::new()
        .route("/status", get(status))
        .route("/shutdown", post(shutdown))
}

async fn status() -> Json<Value> {
    Json(json!({ "status": "ready", "success": true }))
}

async fn shutdown(axum::extract::State(state): axum::extract::State<BridgeState>) -> Json<Value> {
    state.request_shutdown();
    Json(json!({ "status": "stopping", "success": true }))
}
