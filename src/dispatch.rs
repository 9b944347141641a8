//! Webhook delivery of canonical alerts.

use crate::config::WebhookConfig;
use crate::core::{AlertDispatcher, CanonicalAlert, DispatchOutcome};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{StatusCode, Url};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

/// Attached to an outcome when the endpoint answers with a non-2xx status.
pub const NON_SUCCESS_WARNING: &str = "Non-success status received";

/// A failure to deliver an alert at all.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Webhook request failed")]
    Transport(#[source] reqwest::Error),

    #[error("Failed to encode alert")]
    Encode(#[from] serde_json::Error),
}

impl DispatchError {
    /// Returns `true` if the request was aborted at the deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Sends alerts to a single webhook endpoint over HTTP(S).
pub struct WebhookDispatcher {
    client: reqwest::Client,
    endpoint: Url,
    timeout: Duration,
}

impl WebhookDispatcher {
    /// Creates a dispatcher for the configured endpoint.
    pub fn new(config: &WebhookConfig) -> anyhow::Result<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .with_context(|| format!("Invalid webhook endpoint: {}", config.endpoint))?;
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            timeout: config.timeout(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends the request and reads the whole response.
    async fn send(&self, body: Vec<u8>) -> Result<DispatchOutcome, DispatchError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_LENGTH, body.len())
            .body(body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Webhook request error");
                DispatchError::Transport(e)
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            error!(error = %e, status = %status, "Failed to read webhook response body");
            DispatchError::Transport(e)
        })?;

        Ok(classify(status, text))
    }
}

#[async_trait]
impl AlertDispatcher for WebhookDispatcher {
    /// POSTs the alert and classifies the response.
    ///
    /// The whole exchange is bounded by the configured timeout. When it elapses
    /// the in-flight request is dropped, which closes its connection.
    #[instrument(skip(self, alert), fields(alarm_name = %alert.alarm_name))]
    async fn dispatch(&self, alert: &CanonicalAlert) -> Result<DispatchOutcome, DispatchError> {
        let body = serde_json::to_vec(alert)?;
        let timeout_ms = self.timeout.as_millis() as u64;

        let start = Instant::now();
        let result = match tokio::time::timeout(self.timeout, self.send(body)).await {
            Ok(result) => result,
            Err(_) => {
                error!(timeout_ms, "Webhook request timed out, aborting");
                Err(DispatchError::Timeout { timeout_ms })
            }
        };
        metrics::histogram!("webhook_dispatch_duration_seconds")
            .record(start.elapsed().as_secs_f64());

        match &result {
            Ok(outcome) if outcome.is_success() => {
                metrics::counter!("webhook_deliveries").increment(1)
            }
            Ok(_) => metrics::counter!("webhook_rejections").increment(1),
            Err(_) => metrics::counter!("webhook_failures").increment(1),
        }
        result
    }
}

/// Maps a completed response to an outcome. Non-2xx is not a failure.
fn classify(status: StatusCode, body: String) -> DispatchOutcome {
    let warning = if status.is_success() {
        info!(status = %status, "Webhook accepted alert");
        None
    } else {
        warn!(
            status = %status,
            body = %body,
            "Webhook returned non-success status"
        );
        Some(NON_SUCCESS_WARNING.to_string())
    };

    DispatchOutcome {
        status_code: status.as_u16(),
        body,
        warning,
    }
}
