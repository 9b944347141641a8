//! End-to-end tests of one invocation against a mock webhook.

use serde_json::{json, Value};
use std::time::{Duration, Instant};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::{pipeline_for, refused_endpoint, stalled_endpoint};

fn echo(req: &Request) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_bytes(req.body.clone())
}

#[tokio::test]
async fn test_notification_event_is_delivered_and_echoed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/alerts"))
        .and(body_partial_json(json!({ "alarm_name": "cpu-high" })))
        .respond_with(echo)
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = pipeline_for(format!("{}/alerts", server.uri()), 2000);
    let event = json!({ "Records": [{ "Sns": { "Message": "{\"alarm_name\":\"cpu-high\"}" } }] });

    let result = pipeline.handle(Some(event)).await;

    assert_eq!(result.status_code, 200);
    let body = result.body_json().unwrap();
    assert_eq!(body["message"], "Alert processed successfully");
    assert_eq!(body["result"]["statusCode"], 200);
    assert!(body["result"].get("warning").is_none());

    // The endpoint echoed the canonical alert back to us.
    let echoed: Value = serde_json::from_str(body["result"]["body"].as_str().unwrap()).unwrap();
    assert_eq!(echoed["alarm_name"], "cpu-high");
    assert_eq!(echoed["source"], "aws-cloudwatch-alarm");
    assert_eq!(echoed["state"], "UNKNOWN");
    assert_eq!(echoed["trigger"], json!({}));
}

#[tokio::test]
async fn test_unreachable_endpoint_maps_to_500() {
    let pipeline = pipeline_for(refused_endpoint(), 2000);

    let result = pipeline.handle(Some(json!({}))).await;

    assert_eq!(result.status_code, 500);
    let body = result.body_json().unwrap();
    assert_eq!(body["message"], "Alert processing failed");

    let error = body["error"].as_str().unwrap();
    assert!(error.starts_with("Webhook request failed"), "unexpected error: {}", error);
    assert!(error.to_lowercase().contains("connect"), "unexpected error: {}", error);

    let timestamp = body["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
}

#[tokio::test]
async fn test_rejected_delivery_still_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/alerts"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such hook"))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = pipeline_for(format!("{}/alerts", server.uri()), 2000);

    let result = pipeline.handle(Some(json!({ "alarm_name": "disk-full" }))).await;

    assert_eq!(result.status_code, 200);
    let body = result.body_json().unwrap();
    assert_eq!(
        body["result"],
        json!({
            "statusCode": 404,
            "body": "no such hook",
            "warning": "Non-success status received",
        })
    );
}

#[tokio::test]
async fn test_slow_endpoint_times_out_promptly() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let pipeline = pipeline_for(format!("{}/alerts", server.uri()), 300);

    let start = Instant::now();
    let result = pipeline.handle(Some(json!({ "alarm_name": "slow" }))).await;
    let elapsed = start.elapsed();

    assert_eq!(result.status_code, 500);
    let body = result.body_json().unwrap();
    assert_eq!(body["error"], "Request timeout after 300ms");
    assert!(
        elapsed < Duration::from_secs(3),
        "invocation should end at the deadline, took {:?}",
        elapsed
    );
}

#[tokio::test]
async fn test_timeout_closes_the_connection() {
    let (endpoint, closed) = stalled_endpoint().await;
    let pipeline = pipeline_for(endpoint, 300);

    let result = pipeline.handle(Some(json!({ "alarm_name": "stalled" }))).await;
    assert_eq!(result.status_code, 500);
    assert_eq!(result.body_json().unwrap()["error"], "Request timeout after 300ms");

    // The server only sees EOF if the aborted request released its socket.
    tokio::time::timeout(Duration::from_secs(2), closed)
        .await
        .expect("connection should be closed once the request is aborted")
        .unwrap();
}

#[tokio::test]
async fn test_native_cloudwatch_alarm_is_translated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "alarm_name": "checkout-errors",
            "state": "ALARM",
            "aws_account_id": "123456789012",
            "log_group": "/aws/lambda/checkout",
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let message = json!({
        "AlarmName": "checkout-errors",
        "AWSAccountId": "123456789012",
        "NewStateValue": "ALARM",
        "Trigger": {
            "MetricName": "Errors",
            "Dimensions": [{ "name": "FunctionName", "value": "checkout" }],
        },
    });
    let event = json!({ "Records": [{ "Sns": { "Message": message.to_string() } }] });

    let result = pipeline_for(format!("{}/alerts", server.uri()), 2000)
        .handle(Some(event))
        .await;

    assert_eq!(result.status_code, 200);
}

#[tokio::test]
async fn test_absent_event_delivers_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "source": "aws-cloudwatch-alarm",
            "alarm_name": "unknown-alarm",
            "region": "unknown",
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let result = pipeline_for(format!("{}/alerts", server.uri()), 2000)
        .handle(None)
        .await;

    assert_eq!(result.status_code, 200);
    let body = result.body_json().unwrap();
    assert_eq!(body["result"], json!({ "statusCode": 204, "body": "" }));
}
