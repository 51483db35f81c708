//! `/health` endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::server::AppState;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    pub message: String,
    /// Registered viewer count.
    pub connected_clients: usize,
}

/// Build a health response from live counters.
pub fn health_check(connected_clients: usize) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        message: "Backend is running".into(),
        connected_clients,
    }
}

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health_check(state.registry.connection_count()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_ok() {
        let resp = health_check(0);
        assert_eq!(resp.status, "ok");
        assert_eq!(resp.message, "Backend is running");
    }

    #[test]
    fn serialization_uses_camel_case() {
        let resp = health_check(2);
        let parsed = serde_json::to_value(&resp).unwrap();
        assert_eq!(
            parsed,
            serde_json::json!({
                "status": "ok",
                "message": "Backend is running",
                "connectedClients": 2
            })
        );
    }
}
