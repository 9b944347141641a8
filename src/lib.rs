//! Alert dispatcher - delivers alarm notifications to a webhook
//!
//! This library normalizes an inbound alert event, builds a fully-defaulted
//! canonical alert from it and POSTs that alert to a single configured
//! webhook, always reporting back a well-formed invocation result.

pub mod alert;
pub mod cli;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod event;
pub mod pipeline;
pub mod telemetry;

// Re-export core types for convenience
pub use crate::core::*;
pub use dispatch::{DispatchError, WebhookDispatcher};
pub use pipeline::AlertPipeline;
