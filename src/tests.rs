//! End-to-end tests against a mock HTTP server.

use crate::client::ClientConfig;
use crate::{CloseReason, DroneClient, DroneError, Payload, QueryOptions, RequestFailure};
use mockito::Matcher;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn fast_client(server: &mockito::ServerGuard, token: Option<&str>) -> DroneClient {
    DroneClient::with_config(
        ClientConfig::new(server.url(), token, None::<&str>)
            .with_reconnect_delay(Duration::from_millis(5))
            .with_max_reconnect_delay(Duration::from_millis(20)),
    )
}

async fn closed_within(handle: &crate::SubscriptionHandle) -> CloseReason {
    tokio::time::timeout(Duration::from_secs(5), handle.closed())
        .await
        .expect("subscription did not close")
}

#[tokio::test]
async fn test_get_self_sends_credentials() {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/user")
        .match_header("authorization", "Bearer password")
        .match_header("x-csrf-token", Matcher::Missing)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"login":"octocat","admin":true}"#)
        .create_async()
        .await;

    let client = DroneClient::new(server.url(), Some("password"), Some("123456"));
    let user = assert_ok!(client.get_self().await);

    assert_eq!(user, Payload::Json(json!({"login": "octocat", "admin": true})));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_create_secret_sends_csrf_and_json() {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/repos/octocat/hello-world/secrets")
        .match_header("authorization", "Bearer password")
        .match_header("x-csrf-token", "123456")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({"name": "docker_password", "value": "hunter2"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":1,"name":"docker_password"}"#)
        .create_async()
        .await;

    let client = DroneClient::new(server.url(), Some("password"), Some("123456"));
    let created = assert_ok!(
        client
            .create_secret(
                "octocat",
                "hello-world",
                &json!({"name": "docker_password", "value": "hunter2"}),
            )
            .await
    );

    assert_eq!(created.as_json().unwrap()["id"], 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_build_feed_query_string() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/user/feed")
        .match_query(Matcher::UrlEncoded("latest".into(), "true".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("[]")
        .create_async()
        .await;

    let client = DroneClient::new(server.url(), None, None);
    let feed = assert_ok!(
        client
            .get_build_feed(&QueryOptions::new().with("latest", true))
            .await
    );

    assert_eq!(feed, Payload::Json(json!([])));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_failure_reaches_error_sink() {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/user")
        .with_status(403)
        .with_body("Not Authorized")
        .create_async()
        .await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let client = DroneClient::new(server.url(), Some("expired"), None).with_error_sink({
        let seen = seen.clone();
        move |failure: &RequestFailure| seen.lock().push(failure.clone())
    });

    let err = assert_err!(client.get_self().await);

    assert_eq!(err.status(), Some(403));
    assert_eq!(
        *seen.lock(),
        vec![RequestFailure::new(403, "Not Authorized")]
    );
}

#[tokio::test]
async fn test_text_response() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/repos/octocat/hello-world/files/42/2/coverage.out")
        .match_query(Matcher::UrlEncoded("raw".into(), "true".into()))
        .with_status(200)
        .with_header("content-type", "text/plain")
        .with_body("mode: set\n")
        .create_async()
        .await;

    let client = DroneClient::new(server.url(), None, None);
    let artifact = assert_ok!(
        client
            .get_artifact("octocat", "hello-world", 42, 2, "coverage.out")
            .await
    );

    assert_eq!(artifact, Payload::Text("mode: set\n".into()));
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let client = DroneClient::new("http://127.0.0.1:1", None, None);

    let err = assert_err!(client.get_self().await);

    assert!(matches!(err, DroneError::Transport(_)));
}

#[tokio::test]
async fn test_client_from_context() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/user")
        .match_header("authorization", "Bearer from-context")
        .with_status(200)
        .create_async()
        .await;

    let context: HashMap<String, String> = [
        ("DRONE_SERVER".to_string(), server.url()),
        ("DRONE_TOKEN".to_string(), "from-context".to_string()),
    ]
    .into_iter()
    .collect();

    let client = DroneClient::from_context(&context);
    assert_ok!(client.get_self().await);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_log_stream_until_eof() {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Regex(r"^/stream/logs/octocat/hello-world/42/2".into()))
        .match_query(Matcher::UrlEncoded("access_token".into(), "password".into()))
        .match_header("accept", "text/event-stream")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body("data: {\"pos\":0,\"out\":\"+ make\"}\n\ndata: {\"pos\":1,\"out\":\"ok\"}\n\nevent: error\ndata: eof\n\n")
        .create_async()
        .await;

    let lines = Arc::new(Mutex::new(Vec::new()));
    let client = fast_client(&server, Some("password"));
    let handle = client.stream_logs("octocat", "hello-world", 42, 2, {
        let lines = lines.clone();
        move |line: Value| lines.lock().push(line)
    });

    assert_eq!(closed_within(&handle).await, CloseReason::EndOfStream);
    assert_eq!(
        *lines.lock(),
        vec![
            json!({"pos": 0, "out": "+ make"}),
            json!({"pos": 1, "out": "ok"})
        ]
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_log_stream_survives_invalid_utf8() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/stream/logs/octocat/hello-world/42/2")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(b"data: {\"pos\":0}\n\ndata: \xFF\n\ndata: {\"pos\":1}\n\nevent: error\ndata: eof\n\n".to_vec())
        .create_async()
        .await;

    let lines = Arc::new(Mutex::new(Vec::new()));
    let client = fast_client(&server, None);
    let handle = client.stream_logs("octocat", "hello-world", 42, 2, {
        let lines = lines.clone();
        move |line: Value| lines.lock().push(line)
    });

    assert_eq!(closed_within(&handle).await, CloseReason::EndOfStream);
    assert_eq!(*lines.lock(), vec![json!({"pos": 0}), json!({"pos": 1})]);
}

#[tokio::test]
async fn test_event_feed_reconnects_after_drop() {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/stream/events")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body("data: {\"type\":\"build\"}\n\n")
        .expect_at_least(2)
        .create_async()
        .await;

    let count = Arc::new(Mutex::new(0usize));
    let client = fast_client(&server, None);
    let handle = client.on_events({
        let count = count.clone();
        move |_: Value| *count.lock() += 1
    });

    tokio::time::timeout(Duration::from_secs(5), async {
        while *count.lock() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("feed did not reconnect");

    handle.close();
    assert_eq!(closed_within(&handle).await, CloseReason::ClosedByCaller);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_rejected_stream_fails() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/stream/events")
        .with_status(401)
        .with_body("Unauthorized")
        .create_async()
        .await;

    let client = fast_client(&server, None);
    let handle = client.on_events(|_: Value| {});

    assert_eq!(closed_within(&handle).await, CloseReason::Failed);
}

#[tokio::test]
async fn test_wrong_content_type_stream_fails() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/stream/events")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("<html></html>")
        .create_async()
        .await;

    let client = fast_client(&server, None);
    let handle = client.on_events(|_: Value| {});

    assert_eq!(closed_within(&handle).await, CloseReason::Failed);
}
