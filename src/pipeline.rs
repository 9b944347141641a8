//! The per-invocation pipeline: normalize, build, dispatch, report.
//!
//! [`AlertPipeline::handle`] is the boundary the caller sees. Whatever happens
//! inside, it returns a well-formed [`InvocationResult`].

use crate::alert::prepare_alert;
use crate::core::{AlertDispatcher, DispatchOutcome, InvocationResult};
use crate::dispatch::DispatchError;
use crate::event::normalize_event;
use chrono::Utc;
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Runs one alert event through the pipeline.
///
/// Invocations share nothing but the dispatcher, so one pipeline can serve any
/// number of concurrent invocations.
pub struct AlertPipeline<D: AlertDispatcher + ?Sized> {
    dispatcher: Arc<D>,
}

impl<D: AlertDispatcher + ?Sized> AlertPipeline<D> {
    pub fn new(dispatcher: Arc<D>) -> Self {
        Self { dispatcher }
    }

    /// Handles one inbound event and never fails.
    ///
    /// A delivery the endpoint rejected still maps to status 200; only
    /// transport failures, timeouts and panics map to 500.
    pub async fn handle(&self, event: Option<Value>) -> InvocationResult {
        let processed = AssertUnwindSafe(self.process(event)).catch_unwind().await;

        let error = match processed {
            Ok(Ok(outcome)) => {
                info!(
                    status = outcome.status_code,
                    warning = outcome.warning.as_deref().unwrap_or("none"),
                    "Alert processed successfully"
                );
                return InvocationResult::success(&outcome);
            }
            Ok(Err(e)) => error_chain(e),
            Err(panic) => format!("Unexpected fault: {}", panic_message(panic.as_ref())),
        };

        error!(error = %error, "Error processing alert");
        InvocationResult::failure(&error, Utc::now())
    }

    async fn process(&self, event: Option<Value>) -> Result<DispatchOutcome, DispatchError> {
        match &event {
            Some(event) => info!(event = %event, "Received event"),
            None => info!("Received empty event"),
        }
        metrics::counter!("alerts_received").increment(1);

        let payload = normalize_event(event);
        let (alert, warning) = prepare_alert(Some(&payload), Utc::now());
        if let Some(warning) = warning {
            // Processing continues with the defaulted alert.
            warn!(warning = %warning, "Payload validation warning");
            metrics::counter!("alert_validation_warnings").increment(1);
        }

        self.dispatcher.dispatch(&alert).await
    }
}

/// Renders an error with all of its causes, outermost first.
fn error_chain(err: DispatchError) -> String {
    format!("{:#}", anyhow::Error::new(err))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
