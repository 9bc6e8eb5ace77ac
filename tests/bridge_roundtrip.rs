//! End-to-end exchanges through a live listener.

use std::collections::HashSet;
use std::io::Write;
use std::time::Duration;

use http_bridge::{RequestId, ResponseData};
use reqwest::StatusCode;

mod common;

#[tokio::test]
async fn query_and_headers_reach_the_handler() {
    let mut bridge = common::start_bridge(|_| {}).await;
    let pending = tokio::spawn(
        common::client()
            .get(bridge.url("/foo?x=1&tag=a&tag=b"))
            .header("X-Client", "integration")
            .send(),
    );

    let event = bridge.next_event().await;
    assert_eq!(event.method, "GET");
    assert_eq!(event.path, "/foo?x=1&tag=a&tag=b");
    assert_eq!(event.body, None);

    let params = event.params_map().unwrap();
    assert_eq!(params.get("x").map(String::as_str), Some("1"));
    assert_eq!(params.get("tag").map(String::as_str), Some("a,b"));
    let headers = event.headers_map().unwrap();
    assert_eq!(headers.get("x-client").map(String::as_str), Some("integration"));

    let response = ResponseData::new(201, "Created")
        .with_content_type("text/plain")
        .with_header("X", "Y")
        .with_body("hi");
    assert!(bridge.server.respond(&event.request_id, response));

    let res = pending.await.unwrap().unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(res.headers()["x"], "Y");
    assert_eq!(res.headers()["content-type"], "text/plain");
    assert_eq!(res.text().await.unwrap(), "hi");

    bridge.server.stop().await.unwrap();
}

#[tokio::test]
async fn post_body_is_forwarded() {
    let mut bridge = common::start_bridge(|_| {}).await;
    let pending = tokio::spawn(
        common::client()
            .post(bridge.url("/submit"))
            .body(r#"{"name":"bridge"}"#)
            .send(),
    );

    let event = bridge.next_event().await;
    assert_eq!(event.method, "POST");
    assert_eq!(event.body.as_deref(), Some(r#"{"name":"bridge"}"#));

    bridge.server.respond(&event.request_id, ResponseData::default());
    let res = pending.await.unwrap().unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "application/json");

    bridge.server.stop().await.unwrap();
}

#[tokio::test]
async fn file_takes_precedence_over_body() {
    let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    file.write_all(b"ABC").unwrap();
    let path = file.path().to_string_lossy().into_owned();

    let mut bridge = common::start_bridge(|_| {}).await;
    let pending = tokio::spawn(common::client().get(bridge.url("/download")).send());

    let event = bridge.next_event().await;
    let response = ResponseData::default().with_body("ignored").with_file(format!("file://{}", path));
    assert!(bridge.server.respond(&event.request_id, response));

    let res = pending.await.unwrap().unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-length"], "3");
    assert!(res.headers()["content-type"].to_str().unwrap().starts_with("text/plain"));
    assert_eq!(res.text().await.unwrap(), "ABC");

    bridge.server.stop().await.unwrap();
}

#[tokio::test]
async fn missing_file_yields_404() {
    let mut bridge = common::start_bridge(|_| {}).await;
    let pending = tokio::spawn(common::client().get(bridge.url("/download")).send());

    let event = bridge.next_event().await;
    let response = ResponseData::default()
        .with_body("ignored")
        .with_file("/definitely/not/here.bin");
    bridge.server.respond(&event.request_id, response);

    let res = pending.await.unwrap().unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.text().await.unwrap(), "");

    bridge.server.stop().await.unwrap();
}

#[tokio::test]
async fn unanswered_request_times_out_with_408() {
    let mut bridge = common::start_bridge(|config| config.timeouts.response_secs = 1).await;
    let pending = tokio::spawn(common::client().get(bridge.url("/slow")).send());

    let event = bridge.next_event().await;
    let res = pending.await.unwrap().unwrap();
    assert_eq!(res.status(), StatusCode::REQUEST_TIMEOUT);
    assert_eq!(res.headers()["content-type"], "application/json");
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, serde_json::json!({"error": "Request timeout"}));

    assert!(!bridge.server.respond(&event.request_id, ResponseData::default()));
    assert_eq!(bridge.server.pending(), 0);

    bridge.server.stop().await.unwrap();
}

#[tokio::test]
async fn respond_to_unknown_id_is_ignored() {
    let bridge = common::start_bridge(|_| {}).await;
    assert!(!bridge.server.respond(&RequestId::from("never-issued"), ResponseData::default()));
    bridge.server.stop().await.unwrap();
}

#[tokio::test]
async fn second_respond_for_same_id_is_ignored() {
    let mut bridge = common::start_bridge(|_| {}).await;
    let pending = tokio::spawn(common::client().get(bridge.url("/once")).send());

    let event = bridge.next_event().await;
    assert!(bridge.server.respond(&event.request_id, ResponseData::default().with_body("first")));
    assert!(!bridge.server.respond(&event.request_id, ResponseData::default().with_body("second")));

    let res = pending.await.unwrap().unwrap();
    assert_eq!(res.text().await.unwrap(), "first");

    bridge.server.stop().await.unwrap();
}

#[tokio::test]
async fn concurrent_requests_get_their_own_responses() {
    const REQUESTS: usize = 150;

    let bridge = common::start_bridge(|_| {}).await;
    let common::TestBridge {
        server,
        mut events,
        base_url,
    } = bridge;

    let responder = {
        let sink = server.completion_sink();
        tokio::spawn(async move {
            let mut seen = HashSet::new();
            while seen.len() < REQUESTS {
                let Some(event) = events.recv().await else { break };
                assert!(seen.insert(event.request_id.clone()), "duplicate request id");
                // Answer out of order to exercise correlation.
                let sink = sink.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(fastrand::u64(0..20))).await;
                    sink.respond(&event.request_id, ResponseData::default().with_body(event.path));
                });
            }
            seen.len()
        })
    };

    let client = common::client();
    let mut requests = Vec::with_capacity(REQUESTS);
    for i in 0..REQUESTS {
        let path = format!("/item/{}", i);
        let send = client.get(format!("{}{}", base_url, path)).send();
        requests.push(tokio::spawn(async move {
            let res = send.await.unwrap();
            (path, res.text().await.unwrap())
        }));
    }

    for request in requests {
        let (path, body) = request.await.unwrap();
        assert_eq!(body, path);
    }
    assert_eq!(responder.await.unwrap(), REQUESTS);
    assert_eq!(server.pending(), 0);

    server.stop().await.unwrap();
}
