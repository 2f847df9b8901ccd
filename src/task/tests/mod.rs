use super::http::{HttpDesc, HttpTask};
use super::{MeasurementTask, TaskDescriptor, TaskSchedule, build_task};
use crate::config::ProbeConfig;
use crate::context::{Clock, RunContext, StaticDevice};
use crate::error::Error;
use crate::report::MetricValue;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{any, body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn http_desc(pairs: &[(&str, &str)]) -> HttpDesc {
    HttpDesc::parse(
        TaskSchedule {
            key: Some("test-task".to_string()),
            ..Default::default()
        },
        Some(&params(pairs)),
    )
    .unwrap()
}

fn decoded_body(result: &crate::report::MeasurementResult) -> Vec<u8> {
    let encoded = result
        .field("body")
        .and_then(MetricValue::as_text)
        .expect("success record must carry a body field");
    BASE64.decode(encoded).unwrap()
}

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// -------------------------------------------------------------------------
// End-to-end scenarios against a mock server
// -------------------------------------------------------------------------

#[tokio::test]
async fn status_200_populates_every_result_field() {
    let server = MockServer::start().await;
    let body = vec![b'a'; 500];
    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(&server)
        .await;

    let timestamp = Utc.with_ymd_and_hms(2024, 5, 14, 9, 30, 0).unwrap();
    let mut ctx = RunContext::new(ProbeConfig::default());
    ctx.clock = Arc::new(FixedClock(timestamp));
    ctx.device = Arc::new(StaticDevice::new("test-device"));

    let desc = http_desc(&[("url", &format!("{}/data", server.uri()))]);
    let result = HttpTask::new(desc).unwrap().execute(&ctx).await.unwrap();

    assert!(result.success);
    assert_eq!(result.device_id, "test-device");
    assert_eq!(result.timestamp, timestamp);
    assert_eq!(result.task_key.as_deref(), Some("test-task"));

    assert_eq!(
        result.field("code").and_then(MetricValue::as_integer),
        Some(200)
    );
    assert_eq!(
        result.field("body_len").and_then(MetricValue::as_integer),
        Some(500)
    );
    assert_eq!(decoded_body(&result).len(), 500);

    let time_ms = result
        .field("time_ms")
        .and_then(MetricValue::as_integer)
        .unwrap();
    assert!(time_ms >= 0);

    let headers_len = result
        .field("headers_len")
        .and_then(MetricValue::as_integer)
        .unwrap();
    let headers_text = result
        .field("headers")
        .and_then(MetricValue::as_text)
        .unwrap();
    assert!(headers_len > 0);
    assert!(headers_text.contains("content-length"));
    assert!(headers_text.ends_with("\r\n"));

    let names: Vec<&str> = result.fields().map(|(n, _)| n.as_str()).collect();
    assert_eq!(
        names,
        ["code", "time_ms", "headers_len", "body_len", "headers", "body"]
    );
}

#[tokio::test]
async fn large_body_is_counted_in_full_but_captured_to_the_cap() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/big"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 3000]))
        .mount(&server)
        .await;

    let ctx = RunContext::new(ProbeConfig::default());
    let desc = http_desc(&[("url", &format!("{}/big", server.uri()))]);
    let result = HttpTask::new(desc).unwrap().execute(&ctx).await.unwrap();

    assert_eq!(
        result.field("body_len").and_then(MetricValue::as_integer),
        Some(3000)
    );
    assert_eq!(decoded_body(&result).len(), 1024);
}

#[tokio::test]
async fn malformed_header_line_aborts_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let ctx = RunContext::new(ProbeConfig::default());
    let desc = http_desc(&[
        ("url", &server.uri()),
        ("headers", "Bad-Header-Line"),
    ]);
    let err = HttpTask::new(desc).unwrap().execute(&ctx).await.unwrap_err();

    assert!(matches!(err, Error::MalformedHeader { line } if line == "Bad-Header-Line"));
}

#[tokio::test]
async fn status_404_yields_a_code_only_record_without_failing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_bytes(vec![b'e'; 100]))
        .mount(&server)
        .await;

    let ctx = RunContext::new(ProbeConfig::default());
    let desc = http_desc(&[("url", &format!("{}/missing", server.uri()))]);
    let result = HttpTask::new(desc).unwrap().execute(&ctx).await.unwrap();

    assert!(!result.success);
    assert_eq!(
        result.field("code").and_then(MetricValue::as_integer),
        Some(404)
    );
    assert_eq!(result.fields().count(), 1, "non-200 records carry only the code");
}

#[tokio::test]
async fn connection_refused_fails_with_an_aggregated_transport_error() {
    // Bind a port, then free it so the connect is refused
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let ctx = RunContext::new(ProbeConfig::default());
    let desc = http_desc(&[("url", &format!("http://{addr}"))]);
    let err = HttpTask::new(desc).unwrap().execute(&ctx).await.unwrap_err();

    match err {
        Error::Measurement { task_type, message } => {
            assert_eq!(task_type, "http");
            assert!(!message.is_empty());
        }
        other => panic!("expected a measurement failure, got {other:?}"),
    }
}

#[tokio::test]
async fn unsupported_method_is_refused_before_any_network_io() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let ctx = RunContext::new(ProbeConfig::default());
    let desc = http_desc(&[("url", &server.uri()), ("method", "delete")]);
    let err = HttpTask::new(desc).unwrap().execute(&ctx).await.unwrap_err();

    assert!(matches!(err, Error::UnsupportedMethod { method } if method == "delete"));
}

#[tokio::test]
async fn redirects_are_recorded_not_followed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/moved"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/elsewhere"))
        .mount(&server)
        .await;
    Mock::given(path("/elsewhere"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let ctx = RunContext::new(ProbeConfig::default());
    let desc = http_desc(&[("url", &format!("{}/moved", server.uri()))]);
    let result = HttpTask::new(desc).unwrap().execute(&ctx).await.unwrap();

    assert!(!result.success);
    assert_eq!(
        result.field("code").and_then(MetricValue::as_integer),
        Some(301)
    );
}

#[tokio::test]
async fn valid_header_lines_reach_the_server_unmodified() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/echo"))
        .and(header("X-Probe-Test", "abc"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = RunContext::new(ProbeConfig::default());
    let desc = http_desc(&[
        ("url", &format!("{}/echo", server.uri())),
        ("headers", "X-Probe-Test:abc"),
    ]);
    let result = HttpTask::new(desc).unwrap().execute(&ctx).await.unwrap();

    assert!(result.success);
}

#[tokio::test]
async fn post_sends_the_descriptor_body_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/submit"))
        .and(body_string("name=probe&run=1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = RunContext::new(ProbeConfig::default());
    let desc = http_desc(&[
        ("url", &format!("{}/submit", server.uri())),
        ("method", "post"),
        ("body", "name=probe&run=1"),
    ]);
    let result = HttpTask::new(desc).unwrap().execute(&ctx).await.unwrap();

    assert!(result.success);
}

#[tokio::test]
async fn head_request_succeeds_with_an_empty_capture() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/probe"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let ctx = RunContext::new(ProbeConfig::default());
    let desc = http_desc(&[
        ("url", &format!("{}/probe", server.uri())),
        ("method", "head"),
    ]);
    let result = HttpTask::new(desc).unwrap().execute(&ctx).await.unwrap();

    assert!(result.success);
    assert_eq!(
        result.field("body_len").and_then(MetricValue::as_integer),
        Some(0)
    );
    assert!(decoded_body(&result).is_empty());
}

// -------------------------------------------------------------------------
// Caps, progress, cancellation, deadlines
// -------------------------------------------------------------------------

#[tokio::test]
async fn response_cap_stops_the_read_loop_and_still_completes_cleanly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/huge"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'h'; 10_000]))
        .mount(&server)
        .await;

    let config = ProbeConfig {
        max_response_bytes: 2048,
        ..Default::default()
    };
    let ctx = RunContext::new(config);
    let desc = http_desc(&[("url", &format!("{}/huge", server.uri()))]);
    let result = HttpTask::new(desc).unwrap().execute(&ctx).await.unwrap();

    assert!(result.success);
    let body_len = result
        .field("body_len")
        .and_then(MetricValue::as_integer)
        .unwrap();
    assert!(
        body_len > 2048,
        "the loop stops only after the total crosses the cap, got {body_len}"
    );
    assert_eq!(decoded_body(&result).len(), 1024);
}

#[tokio::test]
async fn progress_is_monotonic_and_clamped_to_the_configured_ceiling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/steady"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b's'; 64 * 1024]))
        .mount(&server)
        .await;

    let config = ProbeConfig {
        max_progress_percent: 90,
        ..Default::default()
    };
    let ctx = RunContext::new(config);
    let mut progress = ctx.progress.subscribe();

    let desc = http_desc(&[("url", &format!("{}/steady", server.uri()))]);
    let result = HttpTask::new(desc).unwrap().execute(&ctx).await.unwrap();
    assert!(result.success);

    let mut updates = Vec::new();
    loop {
        match progress.try_recv() {
            Ok(update) => updates.push(update),
            // A lagged subscriber misses updates, it never blocks the run
            Err(tokio::sync::broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    assert!(!updates.is_empty(), "at least one progress update per read chunk");

    let mut last = 0;
    for update in &updates {
        assert_eq!(update.task_key.as_deref(), Some("test-task"));
        assert!(update.percent >= last, "progress must never decrease");
        assert!(update.percent <= 90, "progress must respect the ceiling");
        last = update.percent;
    }
    assert_eq!(
        updates.last().map(|u| u.percent),
        Some(90),
        "a fully read body reports the clamped ceiling"
    );
}

#[tokio::test]
async fn cancelled_run_terminates_without_a_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200).set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let ctx = RunContext::new(ProbeConfig::default());
    ctx.cancel.cancel();

    let desc = http_desc(&[("url", &format!("{}/slow", server.uri()))]);
    let err = HttpTask::new(desc).unwrap().execute(&ctx).await.unwrap_err();

    assert!(matches!(err, Error::Cancelled));
}

#[tokio::test]
async fn deadline_overrun_fails_as_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stalled"))
        .respond_with(
            ResponseTemplate::new(200).set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let config = ProbeConfig {
        request_timeout: Duration::from_millis(200),
        ..Default::default()
    };
    let ctx = RunContext::new(config);
    let desc = http_desc(&[("url", &format!("{}/stalled", server.uri()))]);
    let err = HttpTask::new(desc).unwrap().execute(&ctx).await.unwrap_err();

    assert!(matches!(err, Error::Measurement { .. }));
}

// -------------------------------------------------------------------------
// Variant dispatch
// -------------------------------------------------------------------------

#[test]
fn build_task_resolves_the_http_variant() {
    let descriptor = TaskDescriptor {
        task_type: "http".to_string(),
        schedule: TaskSchedule::default(),
        parameters: Some(params(&[("url", "example.com")])),
    };
    let task = tokio_test::assert_ok!(build_task(&descriptor));

    assert_eq!(task.type_name(), "http");
    assert!(task.describe().contains("http://example.com"));
}

#[test]
fn build_task_rejects_unknown_task_types() {
    let descriptor = TaskDescriptor {
        task_type: "ping".to_string(),
        schedule: TaskSchedule::default(),
        parameters: Some(params(&[("url", "example.com")])),
    };
    let err = build_task(&descriptor).unwrap_err();

    assert!(matches!(err, Error::UnsupportedTaskType { task_type } if task_type == "ping"));
}

#[test]
fn build_task_propagates_descriptor_validation() {
    let descriptor = TaskDescriptor {
        task_type: "http".to_string(),
        schedule: TaskSchedule::default(),
        parameters: None,
    };
    let err = build_task(&descriptor).unwrap_err();

    assert!(matches!(err, Error::InvalidParameter { .. }));
}

#[tokio::test]
async fn cloned_task_runs_with_the_same_configuration() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/twice"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b't'; 32]))
        .expect(2)
        .mount(&server)
        .await;

    let ctx = RunContext::new(ProbeConfig::default());
    let desc = http_desc(&[("url", &format!("{}/twice", server.uri()))]);
    let task = HttpTask::new(desc).unwrap();
    let clone = task.clone_task();

    let first = task.execute(&ctx).await.unwrap();
    let second = clone.execute(&ctx).await.unwrap();

    assert!(first.success);
    assert!(second.success);
    assert_eq!(
        first.field("body_len").and_then(MetricValue::as_integer),
        second.field("body_len").and_then(MetricValue::as_integer),
    );
}
