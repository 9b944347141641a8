//! Configuration management for the alert dispatcher
//!
//! This module defines the `Config` struct, resolved once at process start and
//! handed to the dispatcher. It uses the `figment` crate to layer built-in
//! defaults, an optional TOML file, environment variables and command-line
//! flags.

use crate::cli::Cli;
use anyhow::{bail, Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://kilo-webhook.example.com/alerts";
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level used when `RUST_LOG` is not set.
    pub log_level: String,
    /// Where and how alerts are delivered.
    pub webhook: WebhookConfig,
}

/// Configuration for webhook delivery.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WebhookConfig {
    /// The URL alerts are POSTed to.
    pub endpoint: String,
    /// Wall-clock bound on one delivery, in milliseconds. Zero means the default.
    pub timeout_ms: u64,
    /// The `User-Agent` header sent with each delivery.
    pub user_agent: String,
}

impl WebhookConfig {
    /// Returns the delivery timeout.
    pub fn timeout(&self) -> Duration {
        match self.timeout_ms {
            0 => Duration::from_millis(DEFAULT_TIMEOUT_MS),
            ms => Duration::from_millis(ms),
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: concat!("alert-dispatcher/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            webhook: WebhookConfig::default(),
        }
    }
}

impl Config {
    /// Loads the configuration, layering (lowest to highest precedence):
    /// defaults, the TOML file named by `--config`, the `WEBHOOK_ENDPOINT` and
    /// `TIMEOUT_MS` variables, `ALERT_DISPATCHER_*` variables, and CLI flags.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(path) = &cli.config {
            if !path.exists() {
                bail!("Config file not found at specified path: {}", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }

        let mut config: Config = figment
            .merge(bare_env())
            // e.g. ALERT_DISPATCHER_WEBHOOK__TIMEOUT_MS=2000
            .merge(Env::prefixed("ALERT_DISPATCHER_").split("__"))
            .merge(cli.clone())
            .extract()?;

        config.resolve()?;
        Ok(config)
    }

    /// Checks the endpoint and fills in defaults for zeroed values.
    fn resolve(&mut self) -> Result<()> {
        let url = reqwest::Url::parse(&self.webhook.endpoint)
            .with_context(|| format!("Invalid webhook endpoint: {}", self.webhook.endpoint))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!(
                "Webhook endpoint must use http or https, got: {}",
                url.scheme()
            );
        }
        if url.host_str().is_none() {
            bail!("Webhook endpoint has no host: {}", self.webhook.endpoint);
        }

        if self.webhook.timeout_ms == 0 {
            self.webhook.timeout_ms = DEFAULT_TIMEOUT_MS;
        }
        Ok(())
    }
}

/// The unprefixed variables the dispatcher has always been configured with.
fn bare_env() -> Env {
    Env::raw()
        .only(&["WEBHOOK_ENDPOINT", "TIMEOUT_MS"])
        .map(|key| match key.as_str().to_ascii_lowercase().as_str() {
            "webhook_endpoint" => "webhook.endpoint".into(),
            "timeout_ms" => "webhook.timeout_ms".into(),
            other => other.to_string().into(),
        })
}
