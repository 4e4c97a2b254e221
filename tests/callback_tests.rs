use std::time::Duration;

use domainsync::callback::{log_pointer, CallbackEnvelope, CallbackReporter, Status};
use domainsync::execution::{ExecutionLog, Step};
use domainsync::request::CustomResourceEvent;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn event() -> CustomResourceEvent {
    serde_json::from_value(json!({
        "RequestType": "Create",
        "StackId": "arn:aws:cloudformation:us-east-1:123456789012:stack/demo/1",
        "RequestId": "req-1",
        "LogicalResourceId": "SearchSetup",
        "ResponseURL": "https://example.invalid/cb",
        "ResourceProperties": {}
    }))
    .unwrap()
}

fn envelope(log: &ExecutionLog) -> CallbackEnvelope {
    CallbackEnvelope::new(
        &event(),
        Status::from_verdict(log.succeeded()),
        log_pointer("2024/01/01/[$LATEST]abc"),
        "phys-1".to_string(),
        log,
    )
}

#[test]
fn envelope_uses_orchestrator_field_names() {
    let mut log = ExecutionLog::new();
    log.push(Step::IndexPattern, true);
    log.push(Step::Dashboard, false);

    let value = serde_json::to_value(envelope(&log)).unwrap();

    assert_eq!(value["Status"], "FAILED");
    assert_eq!(
        value["Reason"],
        "See the details in CloudWatch Log Stream: 2024/01/01/[$LATEST]abc"
    );
    assert_eq!(value["PhysicalResourceId"], "phys-1");
    assert_eq!(
        value["StackId"],
        "arn:aws:cloudformation:us-east-1:123456789012:stack/demo/1"
    );
    assert_eq!(value["RequestId"], "req-1");
    assert_eq!(value["LogicalResourceId"], "SearchSetup");
    assert_eq!(value["NoEcho"], false);
    assert_eq!(
        value["Data"]["executions"],
        json!([{ "set_index_pattern": true }, { "set_dashboard": false }])
    );
}

#[test]
fn empty_log_reports_success() {
    let value = serde_json::to_value(envelope(&ExecutionLog::new())).unwrap();
    assert_eq!(value["Status"], "SUCCESS");
    assert_eq!(value["Data"], json!({ "executions": [], "skipped": [] }));
}

#[tokio::test]
async fn send_puts_body_with_empty_content_type_and_exact_length() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/cb"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let env = envelope(&ExecutionLog::new());
    let reporter = CallbackReporter::new(Duration::from_secs(5)).unwrap();
    let status = reporter
        .send(&format!("{}/cb", server.uri()), &env)
        .await
        .unwrap();
    assert!(status.is_success());

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let req = &received[0];
    let expected = serde_json::to_string(&env).unwrap();
    assert_eq!(req.body, expected.as_bytes());
    let content_type = req.headers.get("content-type");
    assert!(content_type.map_or(true, |v| v.is_empty()));
    assert_eq!(
        req.headers
            .get("content-length")
            .and_then(|v| v.to_str().ok()),
        Some(expected.len().to_string().as_str())
    );
}

#[tokio::test]
async fn send_returns_non_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let reporter = CallbackReporter::new(Duration::from_secs(5)).unwrap();
    let status = reporter
        .send(&server.uri(), &envelope(&ExecutionLog::new()))
        .await
        .unwrap();
    assert_eq!(status.as_u16(), 403);
}
