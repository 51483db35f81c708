//! # mouthpiece-server
//!
//! Axum HTTP + `WebSocket` server that turns voice-call transcription webhooks
//! into mouth-shape updates for every connected viewer.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `connection` | Per-viewer handle: id, lifecycle state, bounded outbound queue |
//! | `registry` | Active connection set and fan-out broadcast |
//! | `websocket` | Upgrade handling, per-connection reader/writer tasks, heartbeat |
//! | `webhook` | `POST /api/webhook` ingress |
//! | `health` | `GET /health` |
//! | `server` | Router assembly, bind, serve |
//! | `shutdown` | Cancellation token and viewer-session drain |

#![deny(unsafe_code)]

pub mod config;
pub mod connection;
pub mod error;
pub mod health;
pub mod metrics;
pub mod registry;
pub mod server;
pub mod shutdown;
pub mod webhook;
pub mod websocket;

pub use config::ServerConfig;
pub use connection::{ClientConnection, ConnectionId, ConnectionState};
pub use registry::ConnectionRegistry;
pub use server::{build_router, start, AppState, ServerHandle};
