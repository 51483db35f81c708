//! `POST /api/webhook`: transcription events from the voice-call provider.

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::Json;
use metrics::counter;
use mouthpiece_core::{BroadcastMessage, MouthShape, TranscriptionEvent};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::WebhookError;
use crate::metrics::{WEBHOOK_ERRORS_TOTAL, WEBHOOK_EVENTS_TOTAL};
use crate::server::AppState;

/// Synchronous acknowledgment returned to the webhook caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub status: &'static str,
    pub mouth_shape: MouthShape,
    /// Connections targeted by the broadcast.
    pub clients_notified: usize,
}

/// Body is taken as raw bytes so that any parse failure, including a missing
/// or wrong content type or an oversized body, goes through [`WebhookError`]
/// instead of axum's plain-text extractor rejections.
pub async fn webhook_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<WebhookAck>, WebhookError> {
    let event = body
        .map_err(WebhookError::from)
        .and_then(|body| TranscriptionEvent::from_slice(&body).map_err(WebhookError::from))
        .map_err(|err| {
            counter!(WEBHOOK_ERRORS_TOTAL, "error_type" => err.error_kind()).increment(1);
            warn!(error = %err, status = err.status().as_u16(), "rejected webhook payload");
            err
        })?;

    Ok(Json(relay_event(&state, event)))
}

/// Map, broadcast, and acknowledge one event.
pub fn relay_event(state: &AppState, event: TranscriptionEvent) -> WebhookAck {
    info!(
        text = event.text.as_deref().unwrap_or_default(),
        is_final = event.is_final,
        speaker = ?event.speaker,
        "webhook event"
    );

    let message = BroadcastMessage::update_mouth(event);
    let mouth_shape = message.mouth;
    let clients_notified = state.registry.broadcast(&message);

    counter!(WEBHOOK_EVENTS_TOTAL, "mouth" => mouth_shape.as_str()).increment(1);
    info!(mouth = %mouth_shape, clients_notified, "mouth shape broadcast");

    WebhookAck {
        status: "ok",
        mouth_shape,
        clients_notified,
    }
}
