//! Active viewer set and fan-out broadcast.
//!
//! Delivery is at-most-once and fire-and-forget: a message is serialized once,
//! the `Arc<String>` is pushed onto each open viewer's bounded queue without
//! waiting, and no acknowledgment is awaited. A failed enqueue only affects that
//! viewer. Removal from the set happens on disconnect, never as a side effect of
//! a broadcast.

use std::sync::Arc;

use dashmap::DashMap;
use metrics::{counter, gauge};
use serde::Serialize;
use tracing::{debug, warn};

use crate::connection::{ClientConnection, ConnectionId, Delivery};
use crate::metrics::{BROADCAST_RECIPIENTS_TOTAL, WS_BROADCAST_DROPS_TOTAL, WS_CONNECTIONS_ACTIVE};

/// Registry of connected viewers.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, Arc<ClientConnection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection. An entry with the same id is replaced.
    pub fn register(&self, connection: Arc<ClientConnection>) {
        let id = connection.id.clone();
        if self.connections.insert(id.clone(), connection).is_some() {
            debug!(conn_id = %id, "replaced existing connection");
        }
        gauge!(WS_CONNECTIONS_ACTIVE).set(self.connections.len() as f64);
    }

    /// Remove a connection by id. Returns `false` if it was already absent.
    pub fn unregister(&self, id: &ConnectionId) -> bool {
        let removed = self.connections.remove(id).is_some();
        if removed {
            gauge!(WS_CONNECTIONS_ACTIVE).set(self.connections.len() as f64);
        }
        removed
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    pub fn get(&self, id: &ConnectionId) -> Option<Arc<ClientConnection>> {
        self.connections.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of registered connections currently `Open`.
    pub fn open_count(&self) -> usize {
        self.connections.iter().filter(|e| e.value().is_open()).count()
    }

    /// Snapshot of the open connections.
    fn open_connections(&self) -> Vec<Arc<ClientConnection>> {
        self.connections
            .iter()
            .filter(|entry| entry.value().is_open())
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Serialize `message` once and enqueue it for every open connection.
    ///
    /// Returns the number of connections targeted, not confirmed deliveries.
    pub fn broadcast<T: Serialize>(&self, message: &T) -> usize {
        let json = match serde_json::to_string(message) {
            Ok(j) => Arc::new(j),
            Err(e) => {
                warn!(error = %e, "failed to serialize broadcast message");
                return 0;
            }
        };
        self.broadcast_raw(json)
    }

    /// Fan out an already-serialized message.
    pub fn broadcast_raw(&self, json: Arc<String>) -> usize {
        let targets = self.open_connections();
        let recipients = targets.len();

        for conn in &targets {
            match conn.send(Arc::clone(&json)) {
                Delivery::Queued => {}
                Delivery::Full => {
                    counter!(WS_BROADCAST_DROPS_TOTAL).increment(1);
                    warn!(
                        conn_id = %conn.id,
                        total_drops = conn.drop_count(),
                        "send queue full, dropping message"
                    );
                }
                Delivery::Closed => {
                    debug!(conn_id = %conn.id, "connection closed mid-broadcast, skipped");
                }
            }
        }

        counter!(BROADCAST_RECIPIENTS_TOTAL).increment(recipients as u64);
        debug!(recipients, "broadcast message");
        recipients
    }
}
