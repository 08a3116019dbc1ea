//! Endpoint tests driven through the router with `tower::ServiceExt::oneshot`

use super::*;
use crate::broker::BrokerSettings;
use crate::queue::QueueManager;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;

fn test_broker() -> Broker {
    Broker::new(
        QueueManager::new(),
        BrokerSettings {
            longpoll_window: Duration::from_millis(50),
            longpoll_tick: Duration::from_millis(10),
            ..BrokerSettings::default()
        },
    )
}

async fn post_raw(app: &Router, body: impl Into<Body>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .body(body.into())
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, serde_json::from_slice(&bytes).expect("json"))
}

async fn post(app: &Router, body: Value) -> Value {
    let (status, value) = post_raw(app, body.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    value
}

#[tokio::test]
async fn test_send_receive_remove_over_the_endpoint() {
    let app = build_router(test_broker());

    let sent = post(
        &app,
        json!({"queueId": "q", "api": "send", "data": {"id": "m1", "groupId": "g1", "contents": {"n": 1}}}),
    )
    .await;
    assert_eq!(sent, json!({"statusCode": 0}));

    let received = post(&app, json!({"queueId": "q", "api": "receive", "owner": "A"})).await;
    assert_eq!(received["statusCode"], 0);
    assert_eq!(received["result"][0]["id"], "m1");
    assert_eq!(received["result"][0]["sequenceNumber"], 1);
    assert_eq!(received["result"][0]["contents"], json!({"n": 1}));

    let removed = post(
        &app,
        json!({"queueId": "q", "api": "remove", "data": received["result"][0].clone()}),
    )
    .await;
    assert_eq!(removed, json!({"statusCode": 0}));
}

#[tokio::test]
async fn test_claim_conflict_reports_generic_failure() {
    let app = build_router(test_broker());
    let claim = |owner: &str| {
        json!({"queueId": "q", "api": "claim", "data": {"owner": owner, "groupId": "g1"}})
    };

    assert_eq!(post(&app, claim("A")).await["statusCode"], 0);
    assert_eq!(
        post(&app, claim("B")).await,
        json!({"statusCode": 1, "error": "failure"})
    );
}

#[tokio::test]
async fn test_malformed_requests_fail_without_touching_engine() {
    let broker = test_broker();
    let app = build_router(broker.clone());

    let (status, body) = post_raw(&app, "{ not json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["statusCode"], 1);

    let rejected = [
        json!({"api": "receive", "owner": "A"}),
        json!({"queueId": "q"}),
        json!({"queueId": "q", "api": "purge"}),
        json!({"queueId": "q", "api": "setOptions"}),
        json!({"queueId": "q", "api": "claim", "data": {"groupId": "g1"}}),
        json!({"queueId": "q", "api": "send"}),
        json!({"queueId": "q", "api": "receive"}),
        json!({"queueId": "q", "api": "remove", "data": {"id": "m1"}}),
        json!(["q", "receive", null, "A"]),
        json!(["q", "claim", {"owner": "A", "groupId": "g1"}]),
    ];
    for body in rejected {
        assert_eq!(post(&app, body.clone()).await["statusCode"], 1, "{}", body);
    }

    assert!(broker.stats().unwrap().queues.is_empty());
}

#[tokio::test]
async fn test_remove_on_unknown_queue_fails() {
    let app = build_router(test_broker());

    let response = post(
        &app,
        json!({"queueId": "never", "api": "remove", "data": {"id": "m1", "groupId": "g1"}}),
    )
    .await;

    assert_eq!(response["statusCode"], 1);
}

#[tokio::test]
async fn test_set_options_lowercase_spelling_disables_longpoll() {
    let app = build_router(test_broker());

    let response = post(
        &app,
        json!({"queueId": "q", "api": "setoptions", "data": {"longpoll": false}}),
    )
    .await;
    assert_eq!(response["statusCode"], 0);

    let received = post(&app, json!({"queueId": "q", "api": "receive", "owner": "A"})).await;
    assert_eq!(received, json!({"statusCode": 0, "result": []}));
}

#[tokio::test]
async fn test_empty_longpoll_receive_answers_after_window() {
    let app = build_router(test_broker());

    let received = tokio::time::timeout(
        Duration::from_secs(2),
        post(&app, json!({"queueId": "q", "api": "receive", "owner": "A"})),
    )
    .await
    .expect("long-poll should end after its window");

    assert_eq!(received, json!({"statusCode": 0, "result": []}));
}

#[tokio::test]
async fn test_dispatch_without_router() {
    let broker = test_broker();
    let body = json!({"queueId": "q", "api": "claim", "data": {"owner": "A", "groupId": "g1"}});

    let response = dispatch(&broker, body.to_string().as_bytes()).await;

    assert!(response.is_ok());
    assert_eq!(broker.stats().unwrap().queue("q").unwrap().owned_groups, 1);
}
