//! Webhook input and push-channel output types.
//!
//! Field names follow the camelCase JSON used by the voice-call webhook and the
//! browser viewers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::PayloadError;
use crate::viseme::{mouth_shape, MouthShape};

/// One transcription event delivered by the voice-call webhook.
///
/// Every field is optional on the wire: a missing or `null` text stays `None`,
/// `isFinal` of any JSON type is read by its truthiness (missing is `false`), and
/// `speaker` is passed through untouched.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionEvent {
    #[serde(default, rename = "transcribedText")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "truthy")]
    pub is_final: bool,
    #[serde(default)]
    pub speaker: Option<Value>,
}

impl TranscriptionEvent {
    /// Parse a raw webhook body.
    ///
    /// The body must be a JSON object. Unknown fields are ignored. A
    /// `transcribedText` that is neither a string nor `null` is rejected.
    pub fn from_slice(body: &[u8]) -> Result<Self, PayloadError> {
        let value: Value = serde_json::from_slice(body).map_err(PayloadError::InvalidJson)?;
        Self::from_value(value)
    }

    /// Build an event from an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, PayloadError> {
        if !value.is_object() {
            return Err(PayloadError::NotAnObject(json_type_name(&value)));
        }
        serde_json::from_value(value).map_err(PayloadError::InvalidField)
    }

    /// Mouth shape for this event's text.
    pub fn mouth_shape(&self) -> MouthShape {
        mouth_shape(self.text.as_deref())
    }
}

fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(is_truthy(&Value::deserialize(deserializer)?))
}

/// Webhook senders are loose about `isFinal` (`true`, `"true"`, `1`); read it
/// the way a JavaScript condition would.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Kind of push message. Viewers switch on this tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    UpdateMouth,
}

/// Message fanned out to every connected viewer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastMessage {
    pub action: Action,
    pub mouth: MouthShape,
    pub text: Option<String>,
    pub is_final: bool,
    pub speaker: Option<Value>,
}

impl BroadcastMessage {
    /// Build the `updateMouth` message for an event.
    pub fn update_mouth(event: TranscriptionEvent) -> Self {
        let mouth = event.mouth_shape();
        Self {
            action: Action::UpdateMouth,
            mouth,
            text: event.text,
            is_final: event.is_final,
            speaker: event.speaker,
        }
    }
}

impl From<TranscriptionEvent> for BroadcastMessage {
    fn from(event: TranscriptionEvent) -> Self {
        Self::update_mouth(event)
    }
}
