use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mouthpiece_core::PayloadError;
use serde::Serialize;

/// Failures surfaced by the webhook endpoint.
///
/// Every variant answers with `{"error": "..."}`. Malformed payloads are 500,
/// which is what the voice-call provider already expects from this endpoint;
/// an unreadable body keeps axum's status (413 when over the size limit).
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("malformed payload: {0}")]
    Payload(#[from] PayloadError),

    #[error("unreadable body: {}", .0.body_text())]
    Body(#[from] BytesRejection),
}

impl WebhookError {
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Payload(e) => e.error_kind(),
            Self::Body(_) => "unreadable_body",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Payload(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Body(rejection) => rejection.status(),
        }
    }
}

/// JSON error body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_error_maps_to_500() {
        let err = WebhookError::from(PayloadError::NotAnObject("array"));
        assert_eq!(err.error_kind(), "not_an_object");
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn message_includes_cause() {
        let err = WebhookError::from(PayloadError::NotAnObject("number"));
        assert_eq!(
            err.to_string(),
            "malformed payload: expected a JSON object, got number"
        );
    }
}
