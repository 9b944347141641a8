//! Shared setup for the integration tests.
#![allow(dead_code)]

use alert_dispatcher::config::WebhookConfig;
use alert_dispatcher::{AlertPipeline, WebhookDispatcher};
use std::net::TcpListener;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::sync::oneshot;

/// Builds a webhook configuration pointing at `endpoint`.
pub fn webhook_config(endpoint: impl Into<String>, timeout_ms: u64) -> WebhookConfig {
    WebhookConfig {
        endpoint: endpoint.into(),
        timeout_ms,
        ..Default::default()
    }
}

/// Creates a pipeline that delivers to `endpoint` with a real HTTP dispatcher.
pub fn pipeline_for(endpoint: impl Into<String>, timeout_ms: u64) -> AlertPipeline<WebhookDispatcher> {
    let dispatcher = WebhookDispatcher::new(&webhook_config(endpoint, timeout_ms)).unwrap();
    AlertPipeline::new(Arc::new(dispatcher))
}

/// Returns a URL on a local port that nothing is listening on.
pub fn refused_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/alerts", port)
}

/// Starts an endpoint that accepts one connection, reads the request and never
/// answers.
///
/// The receiver fires once the client has closed that connection.
pub async fn stalled_endpoint() -> (String, oneshot::Receiver<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (closed_tx, closed_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        loop {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => continue,
            }
        }
        let _ = closed_tx.send(());
    });

    (format!("http://127.0.0.1:{}/alerts", port), closed_rx)
}
