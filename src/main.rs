//! # mouthpiece
//!
//! Relay binary: loads configuration, installs telemetry, and serves the
//! webhook and viewer endpoints until ctrl-c.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use mouthpiece_server::config::DEFAULT_PORT;
use mouthpiece_server::ServerConfig;
use mouthpiece_telemetry::{init_telemetry, LogFormat, TelemetryConfig};
use tracing::Level;

/// Lip-sync relay server.
#[derive(Parser, Debug)]
#[command(name = "mouthpiece", about = "Relays transcription webhooks to lip-sync viewers")]
struct Cli {
    /// Host to bind.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to bind (0 for auto-assign).
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Directory of static viewer assets.
    #[arg(long, env = "STATIC_DIR", default_value = "public")]
    static_dir: PathBuf,

    /// Disable static file serving.
    #[arg(long)]
    no_static: bool,

    /// Default log level (RUST_LOG takes precedence).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: Level,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "LOG_FORMAT", default_value = "pretty")]
    log_format: LogFormat,

    /// Outbound queue depth per viewer.
    #[arg(long, env = "MAX_SEND_QUEUE", default_value_t = 256)]
    max_send_queue: usize,

    /// Disable the Prometheus recorder and `/metrics`.
    #[arg(long)]
    no_metrics: bool,

    /// Seconds to wait for tasks on shutdown.
    #[arg(long, default_value_t = 10)]
    shutdown_timeout_secs: u64,
}

impl Cli {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            static_dir: (!self.no_static).then(|| self.static_dir.clone()),
            max_send_queue: self.max_send_queue,
            ..ServerConfig::default()
        }
    }

    fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            log_level: self.log_level,
            format: self.log_format,
            metrics_enabled: !self.no_metrics,
            ..TelemetryConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // `.env` is optional; values already in the environment win.
    let dotenv_result = dotenv::dotenv();
    let args = Cli::parse();

    let telemetry = init_telemetry(&args.telemetry_config()).context("Failed to initialize telemetry")?;
    match dotenv_result {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => tracing::debug!("no .env file"),
        Err(e) => tracing::warn!(error = %e, "failed to read .env"),
    }

    let config = args.server_config();
    if let Some(dir) = config.static_dir.as_deref() {
        if !dir.is_dir() {
            tracing::warn!(dir = %dir.display(), "static directory not found, only API routes will answer");
        }
    }

    let handle = mouthpiece_server::start(config, telemetry.metrics_handle().cloned())
        .await
        .context("Failed to bind server")?;

    tracing::info!("mouthpiece listening on http://{}", handle.addr());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    handle
        .shutdown(Some(Duration::from_secs(args.shutdown_timeout_secs)))
        .await;

    tracing::info!("Shutdown complete");
    Ok(())
}
