//! Alert Dispatcher
//!
//! Runs a single invocation: reads an alert event, delivers it to the
//! configured webhook and prints the invocation result as JSON on stdout.

use alert_dispatcher::{cli::Cli, config::Config, telemetry, AlertPipeline, WebhookDispatcher};
use anyhow::Result;
use clap::Parser;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configuration is resolved once, before any event is handled.
    let config = Config::load(&cli).unwrap_or_else(|err| {
        init_logging("info");
        error!("Failed to load configuration: {:#}", err);
        std::process::exit(1);
    });

    init_logging(&config.log_level);

    info!(
        endpoint = %config.webhook.endpoint,
        timeout_ms = config.webhook.timeout_ms,
        user_agent = %config.webhook.user_agent,
        "Alert dispatcher configured"
    );

    let metrics = telemetry::install()?;

    let dispatcher = Arc::new(WebhookDispatcher::new(&config.webhook)?);
    let pipeline = AlertPipeline::new(dispatcher);

    let event = read_event(&cli).await;
    let result = pipeline.handle(event).await;
    metrics.log_snapshot();

    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}

/// Logs go to stderr so stdout carries only the invocation result.
fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Reads the inbound event from `--event` or stdin.
///
/// Empty or unreadable input is an absent event; the pipeline handles that.
async fn read_event(cli: &Cli) -> Option<Value> {
    let raw = match &cli.event {
        Some(path) => match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read event file");
                return None;
            }
        },
        None => {
            let mut raw = String::new();
            if let Err(e) = tokio::io::stdin().read_to_string(&mut raw).await {
                warn!(error = %e, "Failed to read event from stdin");
                return None;
            }
            raw
        }
    };

    if raw.trim().is_empty() {
        return None;
    }

    match serde_json::from_str(&raw) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(error = %e, "Event is not valid JSON, treating it as absent");
            None
        }
    }
}
