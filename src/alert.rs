//! Alert validation and construction
//!
//! Turns a raw payload into a [`CanonicalAlert`]. Validation here is advisory:
//! a deficient payload produces a [`ValidationWarning`] but still yields a
//! complete, defaulted alert.

use crate::core::{iso_timestamp, CanonicalAlert, RawPayload};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

/// The source assumed when a payload does not name one.
pub const DEFAULT_SOURCE: &str = "aws-cloudwatch-alarm";
pub const DEFAULT_ALARM_NAME: &str = "unknown-alarm";
pub const DEFAULT_ACCOUNT: &str = "unknown";
pub const DEFAULT_REGION: &str = "unknown";
pub const DEFAULT_STATE: &str = "UNKNOWN";

/// A non-fatal problem found in a raw payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    #[error("Payload is undefined or null")]
    MissingPayload,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

/// Checks a payload for the fields its source conventionally requires.
///
/// Only CloudWatch alarm payloads are held to a requirement (`alarm_name`);
/// every other shape passes. The requirement is met by the same lookup the
/// builder uses, so a native `AlarmName` satisfies it.
pub fn validate_payload(payload: Option<&RawPayload>) -> Option<ValidationWarning> {
    let Some(raw) = payload else {
        return Some(ValidationWarning::MissingPayload);
    };

    let is_alarm = raw.get("source").and_then(Value::as_str) == Some(DEFAULT_SOURCE);
    let fields = PayloadFields { payload };
    if is_alarm && fields.get("alarm_name", Some("AlarmName")).is_none() {
        return Some(ValidationWarning::MissingField("alarm_name"));
    }

    None
}

/// Builds a canonical alert from a raw payload, defaulting every missing field.
///
/// A field that is missing or falsy (`null`, `false`, `0`, `""`) falls back to
/// the native CloudWatch key of the same meaning (`AlarmName`, `NewStateValue`,
/// ...) and then to its default. Present values are carried unchanged, whatever
/// their JSON type. `timestamp` is always `now`.
///
/// # Arguments
/// * `payload` - The raw payload, if any
/// * `now` - The processing time, used for `timestamp` and as the fallback
///   `state_change_time`
pub fn build_alert(payload: Option<&RawPayload>, now: DateTime<Utc>) -> CanonicalAlert {
    let fields = PayloadFields { payload };
    let processed_at = iso_timestamp(now);

    let trigger = fields.value_or("trigger", Some("Trigger"), Value::Object(Map::new()));
    let log_group = fields
        .get("log_group", None)
        .cloned()
        .or_else(|| lambda_log_group(&trigger).map(Value::String))
        .unwrap_or_else(|| Value::from(""));

    CanonicalAlert {
        source: fields.value_or("source", None, DEFAULT_SOURCE),
        alarm_name: fields.value_or("alarm_name", Some("AlarmName"), DEFAULT_ALARM_NAME),
        alarm_description: fields.value_or("alarm_description", Some("AlarmDescription"), ""),
        aws_account_id: fields.value_or("aws_account_id", Some("AWSAccountId"), DEFAULT_ACCOUNT),
        region: fields.value_or("region", Some("Region"), DEFAULT_REGION),
        state: fields.value_or("state", Some("NewStateValue"), DEFAULT_STATE),
        state_reason: fields.value_or("state_reason", Some("NewStateReason"), ""),
        state_change_time: fields.value_or(
            "state_change_time",
            Some("StateChangeTime"),
            processed_at.as_str(),
        ),
        trigger,
        log_group,
        error_logs: fields.value_or("error_logs", None, ""),
        timestamp: processed_at,
    }
}

/// Validates and builds in one step.
pub fn prepare_alert(
    payload: Option<&RawPayload>,
    now: DateTime<Utc>,
) -> (CanonicalAlert, Option<ValidationWarning>) {
    (build_alert(payload, now), validate_payload(payload))
}

/// Field lookup over an optional payload with native-key fallback.
struct PayloadFields<'a> {
    payload: Option<&'a RawPayload>,
}

impl<'a> PayloadFields<'a> {
    fn get(&self, key: &str, native: Option<&str>) -> Option<&'a Value> {
        let payload = self.payload?;
        payload
            .get(key)
            .filter(|v| is_truthy(v))
            .or_else(|| native.and_then(|k| payload.get(k)).filter(|v| is_truthy(v)))
    }

    fn value_or(&self, key: &str, native: Option<&str>, default: impl Into<Value>) -> Value {
        match self.get(key, native) {
            Some(value) => value.clone(),
            None => default.into(),
        }
    }
}

/// Derives the log group of the Lambda function an alarm watches, if its
/// trigger has a `FunctionName` dimension.
fn lambda_log_group(trigger: &Value) -> Option<String> {
    let dimensions = trigger
        .get("Dimensions")
        .or_else(|| trigger.get("dimensions"))?
        .as_array()?;

    dimensions
        .iter()
        .find(|dim| dim.get("name").and_then(Value::as_str) == Some("FunctionName"))
        .and_then(|dim| dim.get("value").and_then(Value::as_str))
        .filter(|name| !name.is_empty())
        .map(|name| format!("/aws/lambda/{}", name))
}

/// Loose truthiness: `null`, `false`, zero and the empty string are falsy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
