//! Inbound event normalization
//!
//! This module recognizes which envelope an inbound event arrives in and
//! extracts the raw alert payload from it. Normalization never fails: any
//! shape it cannot use degrades to an empty payload and a logged warning.

use crate::core::RawPayload;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// The shapes an inbound event can take.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// A notification-service envelope (`{"Records": [{"Sns": {"Message": ...}}]}`).
    /// Holds the first record's message, which may be missing.
    Notification(Option<Value>),
    /// Any other event, used as the payload itself.
    Direct(Value),
    /// No event at all.
    Empty,
}

impl InboundEvent {
    /// Classifies an inbound event.
    ///
    /// The notification envelope is tried first; anything that does not decode
    /// as one is treated as a direct invocation.
    pub fn decode(event: Option<Value>) -> Self {
        match event {
            None | Some(Value::Null) => Self::Empty,
            Some(value) => match decode_notification(&value) {
                Some(message) => Self::Notification(message),
                None => Self::Direct(value),
            },
        }
    }

    /// Extracts the raw alert payload carried by this event.
    pub fn into_payload(self) -> RawPayload {
        match self {
            Self::Notification(message) => payload_from_message(message),
            Self::Direct(value) => payload_from_direct(value),
            Self::Empty => RawPayload::new(),
        }
    }
}

/// Normalizes an inbound event of unknown shape into a raw alert payload.
pub fn normalize_event(event: Option<Value>) -> RawPayload {
    InboundEvent::decode(event).into_payload()
}

/// Attempts to decode `value` as a notification envelope.
///
/// # Returns
/// * `Some(message)` if the first record carries an `Sns` object
/// * `None` if the value is not a notification envelope
fn decode_notification(value: &Value) -> Option<Option<Value>> {
    // Temporary structs for the parts of the envelope we care about. Only the
    // first record is decoded; the rest may hold anything.
    #[derive(Deserialize)]
    struct Envelope {
        #[serde(rename = "Records")]
        records: Vec<Value>,
    }

    #[derive(Deserialize)]
    struct Record {
        #[serde(rename = "Sns")]
        sns: Option<Notification>,
    }

    #[derive(Deserialize)]
    struct Notification {
        #[serde(rename = "Message")]
        message: Option<Value>,
    }

    let envelope = Envelope::deserialize(value).ok()?;
    let first = envelope.records.first()?;
    let notification = Record::deserialize(first).ok()?.sns?;
    Some(notification.message)
}

fn payload_from_message(message: Option<Value>) -> RawPayload {
    match message {
        Some(Value::String(text)) => match serde_json::from_str::<Value>(&text) {
            Ok(decoded) => into_mapping(decoded, "notification message"),
            Err(e) => {
                warn!(error = %e, "Failed to parse notification message");
                RawPayload::new()
            }
        },
        Some(structured) => into_mapping(structured, "notification message"),
        None => {
            warn!("Notification record carries no message");
            RawPayload::new()
        }
    }
}

fn payload_from_direct(value: Value) -> RawPayload {
    into_mapping(value, "event")
}

fn into_mapping(value: Value, origin: &str) -> RawPayload {
    match value {
        Value::Object(map) => map,
        other => {
            warn!(
                origin,
                kind = json_kind(&other),
                "Alert payload is not a JSON object, using an empty payload"
            );
            RawPayload::new()
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
