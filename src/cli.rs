//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using the
//! `clap` crate. The configuration flags are merged on top of the TOML file and
//! environment variables; `--event` names the input of the single invocation.

use clap::Parser;
use figment::{
    value::{Dict, Map, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Normalizes one alert event and delivers it to the configured webhook.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to the inbound event JSON. Read from stdin when omitted.
    #[arg(short, long, value_name = "FILE")]
    pub event: Option<PathBuf>,

    /// Webhook URL to deliver the alert to.
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Delivery timeout in milliseconds.
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Log level used when RUST_LOG is not set.
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        let mut webhook = Dict::new();
        if let Some(endpoint) = &self.endpoint {
            webhook.insert("endpoint".into(), Value::from(endpoint.clone()));
        }
        if let Some(timeout) = self.timeout_ms {
            webhook.insert("timeout_ms".into(), Value::from(timeout));
        }
        if !webhook.is_empty() {
            dict.insert("webhook".into(), Value::from(webhook));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
