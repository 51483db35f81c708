use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::health::health_handler;
use crate::metrics::metrics_handler;
use crate::registry::ConnectionRegistry;
use crate::shutdown::ShutdownCoordinator;
use crate::webhook::webhook_handler;
use crate::websocket::{root_handler, ws_handler, ConnectionSettings};

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConnectionRegistry>,
    pub connection: ConnectionSettings,
    pub shutdown: ShutdownCoordinator,
    pub static_dir: Option<Arc<PathBuf>>,
    pub metrics: Option<PrometheusHandle>,
    pub webhook_body_limit: usize,
}

impl AppState {
    pub fn new(config: &ServerConfig, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new()),
            connection: ConnectionSettings {
                max_send_queue: config.max_send_queue.max(1),
                heartbeat_interval: config.heartbeat_interval(),
                heartbeat_timeout: config.heartbeat_timeout(),
            },
            shutdown: ShutdownCoordinator::new(),
            static_dir: config.static_dir.clone().map(Arc::new),
            metrics,
            webhook_body_limit: config.max_webhook_body_bytes,
        }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route(
            "/api/webhook",
            post(webhook_handler).layer(DefaultBodyLimit::max(state.webhook_body_limit)),
        )
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/ws", get(ws_handler))
        .route("/", get(root_handler));

    if let Some(dir) = state.static_dir.as_deref() {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and start serving. Returns a handle to inspect and shut down the server.
pub async fn start(
    config: ServerConfig,
    metrics: Option<PrometheusHandle>,
) -> Result<ServerHandle, std::io::Error> {
    let state = AppState::new(&config, metrics);
    let router = build_router(state.clone());

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    let local_addr = listener.local_addr()?;

    let token = state.shutdown.token();
    let server = tokio::spawn(async move {
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await;
        if let Err(e) = result {
            error!(error = %e, "server error");
        }
    });

    info!(addr = %local_addr, "mouthpiece server started");

    Ok(ServerHandle {
        addr: local_addr,
        state,
        server,
    })
}

/// Handle returned by `start()`.
pub struct ServerHandle {
    addr: SocketAddr,
    state: AppState,
    server: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.state.registry
    }

    /// Stop accepting, close every viewer, and wait until all of them are
    /// unregistered. Returns `false` if `timeout` (default 10s) elapsed first.
    pub async fn shutdown(self, timeout: Option<Duration>) -> bool {
        let drained = self.state.shutdown.drain(self.server, timeout).await;
        info!(
            drained,
            clients = self.state.registry.connection_count(),
            "mouthpiece server stopped"
        );
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn config_without_static() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            static_dir: None,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn health_endpoint_reports_clients() {
        let state = AppState::new(&config_without_static(), None);
        let app = build_router(state);

        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["connectedClients"], 0);
    }

    #[tokio::test]
    async fn metrics_endpoint_renders() {
        let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
            .build_recorder()
            .handle();
        let state = AppState::new(&config_without_static(), Some(handle));
        let app = build_router(state);

        let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_endpoint_without_recorder_is_404() {
        let app = build_router(AppState::new(&config_without_static(), None));
        let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn static_files_served_from_configured_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>viewer</h1>").unwrap();
        std::fs::write(dir.path().join("avatar.svg"), "<svg/>").unwrap();

        let config = ServerConfig {
            static_dir: Some(dir.path().to_path_buf()),
            ..config_without_static()
        };
        let app = build_router(AppState::new(&config, None));

        let resp = app
            .clone()
            .oneshot(Request::builder().uri("/avatar.svg").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"<h1>viewer</h1>");
    }

    #[tokio::test]
    async fn unknown_path_without_static_dir_is_404() {
        let app = build_router(AppState::new(&config_without_static(), None));
        let resp = app
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cors_headers_present() {
        let app = build_router(AppState::new(&config_without_static(), None));
        let req = Request::builder()
            .uri("/health")
            .header("origin", "http://example.com")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert!(resp.headers().contains_key("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn start_binds_and_shuts_down() {
        let handle = start(config_without_static(), None).await.unwrap();
        assert!(handle.port() > 0);

        let url = format!("http://{}/health", handle.addr());
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), 200);
        drop(resp);

        assert!(handle.shutdown(Some(Duration::from_secs(2))).await);
        assert!(reqwest::get(&url).await.is_err());
    }
}
