//! Core domain types and service traits for the alert dispatcher
//!
//! This module defines the records that flow through one invocation of the
//! pipeline and the trait contract that the orchestrator uses to reach the
//! webhook.

use crate::dispatch::DispatchError;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// The untyped alert payload extracted from an inbound event.
pub type RawPayload = Map<String, Value>;

/// Formats a point in time the way every timestamp in this crate is rendered:
/// ISO 8601, UTC, millisecond precision (e.g. `2024-05-01T12:00:00.000Z`).
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A fully-defaulted alert record, ready to be sent to the webhook.
///
/// Every field is always populated and never `null`. Values present in the
/// raw payload are carried as they arrived; defaults are strings (and `{}` for
/// `trigger`). See [`crate::alert::build_alert`] for the default of each field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalAlert {
    pub source: Value,
    pub alarm_name: Value,
    pub alarm_description: Value,
    pub aws_account_id: Value,
    pub region: Value,
    pub state: Value,
    pub state_reason: Value,
    /// When the alarm changed state. Falls back to processing time.
    pub state_change_time: Value,
    pub trigger: Value,
    pub log_group: Value,
    pub error_logs: Value,
    /// When this record was built, not when the alarm fired.
    pub timestamp: String,
}

/// The result of a single delivery attempt to the webhook.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOutcome {
    /// HTTP status returned by the endpoint
    pub status_code: u16,
    /// The full response body
    pub body: String,
    /// Set only when the endpoint answered with a non-2xx status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl DispatchOutcome {
    /// Returns `true` if the endpoint accepted the alert with a 2xx status.
    pub fn is_success(&self) -> bool {
        self.warning.is_none()
    }
}

/// The single value returned to the caller of one invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResult {
    pub status_code: u16,
    /// A JSON-encoded message object
    pub body: String,
}

impl InvocationResult {
    /// Wraps a completed delivery attempt, whatever status the endpoint returned.
    pub fn success(outcome: &DispatchOutcome) -> Self {
        Self {
            status_code: 200,
            body: json!({
                "message": "Alert processed successfully",
                "result": outcome,
            })
            .to_string(),
        }
    }

    /// Reports a failure internal to the pipeline.
    pub fn failure(error: &str, at: DateTime<Utc>) -> Self {
        Self {
            status_code: 500,
            body: json!({
                "message": "Alert processing failed",
                "error": error,
                "timestamp": iso_timestamp(at),
            })
            .to_string(),
        }
    }

    /// Decodes `body` back into a JSON value.
    pub fn body_json(&self) -> serde_json::Result<Value> {
        serde_json::from_str(&self.body)
    }
}

// =============================================================================
// Service Traits
// =============================================================================

/// Delivers canonical alerts to a notification endpoint
#[async_trait]
pub trait AlertDispatcher: Send + Sync {
    /// Sends one alert and reports how the endpoint answered
    ///
    /// # Arguments
    /// * `alert` - The alert to deliver
    ///
    /// # Returns
    /// * `Ok(DispatchOutcome)` once a response was fully received, including
    ///   non-2xx responses
    /// * `Err` for transport failures and timeouts
    async fn dispatch(&self, alert: &CanonicalAlert) -> Result<DispatchOutcome, DispatchError>;
}
