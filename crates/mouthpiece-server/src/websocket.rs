//! Push channel: WebSocket upgrade and per-viewer reader/writer loops.
//!
//! Each viewer runs one writer loop (drains its queue into the socket, pings on
//! the heartbeat interval) and one reader loop (discards inbound text, tracks
//! liveness). Whichever loop ends first decides the disconnect reason; the
//! connection is then marked `Closed` and unregistered.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use metrics::{counter, histogram};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::task_tracker::TaskTrackerToken;
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tracing::{debug, info, trace, warn};

use crate::connection::{ClientConnection, ConnectionId};
use crate::metrics::{WS_CONNECTIONS_TOTAL, WS_CONNECTION_DURATION_SECONDS, WS_DISCONNECTIONS_TOTAL};
use crate::server::AppState;

/// Per-connection limits derived from [`ServerConfig`](crate::ServerConfig).
#[derive(Clone, Copy, Debug)]
pub struct ConnectionSettings {
    pub max_send_queue: usize,
    pub heartbeat_interval: Duration,
    pub heartbeat_timeout: Duration,
}

/// Why a viewer connection ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Close frame received or the stream ended.
    Closed,
    /// Read or write failed on the socket.
    TransportError,
    /// No inbound frame within the heartbeat timeout.
    HeartbeatTimeout,
    /// Server shutdown.
    Shutdown,
}

impl DisconnectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::TransportError => "transport_error",
            Self::HeartbeatTimeout => "heartbeat_timeout",
            Self::Shutdown => "shutdown",
        }
    }
}

/// GET /ws
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    upgrade(ws, state)
}

/// GET /. Viewers that connect to the bare origin are upgraded; plain
/// browser requests get the static index.
pub async fn root_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<AppState>,
    request: Request,
) -> Response {
    match ws {
        Ok(ws) => upgrade(ws, state),
        Err(_) => match state.static_dir.as_deref() {
            Some(dir) => match ServeDir::new(dir).oneshot(request).await {
                Ok(resp) => resp.into_response(),
                Err(never) => match never {},
            },
            None => StatusCode::NOT_FOUND.into_response(),
        },
    }
}

fn upgrade(ws: WebSocketUpgrade, state: AppState) -> Response {
    // Taken before the handshake completes so a drain started mid-upgrade
    // still waits for this viewer. Dropped with the callback if the upgrade fails.
    let session = state.shutdown.session_guard();
    ws.on_failed_upgrade(|e| warn!(error = %e, "websocket upgrade failed"))
        .on_upgrade(move |socket| handle_socket(socket, state, session))
}

/// Drive one viewer from handshake to unregister.
async fn handle_socket(socket: WebSocket, state: AppState, _session: TaskTrackerToken) {
    let (tx, rx) = mpsc::channel(state.connection.max_send_queue);
    let conn = Arc::new(ClientConnection::new(ConnectionId::new(), tx));
    conn.mark_open();
    state.registry.register(Arc::clone(&conn));
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    info!(conn_id = %conn.id, clients = state.registry.connection_count(), "viewer connected");

    let reason = run_connection(socket, &conn, rx, state.connection, state.shutdown.token()).await;

    conn.mark_closed();
    state.registry.unregister(&conn.id);
    counter!(WS_DISCONNECTIONS_TOTAL, "reason" => reason.as_str()).increment(1);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(conn.age().as_secs_f64());
    info!(
        conn_id = %conn.id,
        reason = reason.as_str(),
        clients = state.registry.connection_count(),
        "viewer disconnected"
    );
}

/// Run reader and writer until either finishes.
pub async fn run_connection(
    socket: WebSocket,
    conn: &ClientConnection,
    rx: mpsc::Receiver<Arc<String>>,
    settings: ConnectionSettings,
    shutdown: CancellationToken,
) -> DisconnectReason {
    let (sink, stream) = socket.split();
    tokio::select! {
        reason = write_loop(sink, rx, conn, settings, shutdown) => reason,
        reason = read_loop(stream, conn) => reason,
    }
}

async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Arc<String>>,
    conn: &ClientConnection,
    settings: ConnectionSettings,
    shutdown: CancellationToken,
) -> DisconnectReason {
    let mut ping_interval = tokio::time::interval(settings.heartbeat_interval);
    ping_interval.tick().await; // consume first immediate tick

    loop {
        tokio::select! {
            msg = rx.recv() => {
                let Some(text) = msg else {
                    return DisconnectReason::Closed;
                };
                if let Err(e) = sink.send(Message::Text(text.as_str().into())).await {
                    debug!(conn_id = %conn.id, error = %e, "write failed");
                    return DisconnectReason::TransportError;
                }
            }
            _ = ping_interval.tick() => {
                if conn.idle_for() >= settings.heartbeat_timeout {
                    warn!(conn_id = %conn.id, idle_secs = conn.idle_for().as_secs(), "viewer unresponsive, closing");
                    let _ = sink.send(Message::Close(None)).await;
                    return DisconnectReason::HeartbeatTimeout;
                }
                if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                    return DisconnectReason::TransportError;
                }
                trace!(conn_id = %conn.id, "sent ping");
            }
            () = shutdown.cancelled() => {
                let frame = CloseFrame {
                    code: close_code::AWAY,
                    reason: "server shutting down".into(),
                };
                let _ = sink.send(Message::Close(Some(frame))).await;
                return DisconnectReason::Shutdown;
            }
        }
    }
}

async fn read_loop(mut stream: SplitStream<WebSocket>, conn: &ClientConnection) -> DisconnectReason {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Close(_)) => return DisconnectReason::Closed,
            Ok(Message::Text(text)) => {
                conn.touch();
                debug!(conn_id = %conn.id, len = text.len(), "ignoring viewer message");
            }
            Ok(_) => conn.touch(),
            Err(e) => {
                warn!(conn_id = %conn.id, error = %e, "websocket error");
                return DisconnectReason::TransportError;
            }
        }
    }
    DisconnectReason::Closed
}
