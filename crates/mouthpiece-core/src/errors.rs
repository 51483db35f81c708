/// Reasons a webhook body cannot be turned into a [`TranscriptionEvent`](crate::TranscriptionEvent).
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("invalid field: {0}")]
    InvalidField(#[source] serde_json::Error),
}

impl PayloadError {
    /// Short classification string for logging/metrics.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::InvalidJson(_) => "invalid_json",
            Self::NotAnObject(_) => "not_an_object",
            Self::InvalidField(_) => "invalid_field",
        }
    }
}
