mod common;

use mockito::Matcher;
use pmu_rs::{ExecError, HttpCall, Method, RequestExecutor};
use serde_json::json;
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_execute_returns_body_on_success() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/rest/client/7/programme/17102026")
        .match_header("accept", "application/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"programme":{"reunions":[]}}"#)
        .create_async()
        .await;

    let executor = RequestExecutor::new().unwrap();
    let call = HttpCall::get(format!("{}/rest/client/7/programme/17102026", server.url()));
    let body = executor.execute(&call, Duration::from_secs(5)).await.unwrap();

    assert_eq!(body.status, 200);
    assert_eq!(body.json().unwrap(), json!({"programme": {"reunions": []}}));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_execute_sends_query_and_json_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/betting/manual-bets")
        .match_query(Matcher::UrlEncoded("date".into(), "2026-10-17".into()))
        .match_body(Matcher::PartialJson(json!({"race_id": 42})))
        .with_status(201)
        .with_body(r#"{"success":true}"#)
        .create_async()
        .await;

    let executor = RequestExecutor::new().unwrap();
    let call = HttpCall {
        method: Method::Post,
        url: format!("{}/api/betting/manual-bets", server.url()),
        query: vec![("date".to_string(), "2026-10-17".to_string())],
        body: Some(json!({"race_id": 42, "stake": 5})),
        accept_invalid_certs: false,
    };
    let body = executor.execute(&call, Duration::from_secs(5)).await.unwrap();

    assert_eq!(body.status, 201);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_non_success_status_keeps_body() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/races/42/value-bets")
        .with_status(422)
        .with_body(r#"{"error":"no odds available yet"}"#)
        .create_async()
        .await;

    let executor = RequestExecutor::new().unwrap();
    let call = HttpCall::get(format!("{}/api/races/42/value-bets", server.url()));
    let err = executor.execute(&call, Duration::from_secs(5)).await.unwrap_err();

    assert_eq!(
        err,
        ExecError::HttpStatus {
            status: 422,
            body: r#"{"error":"no odds available yet"}"#.to_string(),
        }
    );
    assert_eq!(err.user_message(), "no odds available yet");
}

#[tokio::test]
async fn test_timeout_is_distinct_from_transport() {
    let url = common::silent_upstream().await;
    let executor = RequestExecutor::new().unwrap();
    let call = HttpCall::get(format!("{url}/rest/client/7/programme/17102026"));

    let started = Instant::now();
    let err = executor
        .execute(&call, Duration::from_millis(150))
        .await
        .unwrap_err();

    assert_eq!(err, ExecError::Timeout { timeout_ms: 150 });
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_connection_refused_is_transport() {
    let executor = RequestExecutor::new().unwrap();
    let call = HttpCall::get(format!("{}/api/daily/top-bets", common::refused_upstream()));

    let err = executor.execute(&call, Duration::from_secs(5)).await.unwrap_err();
    assert!(matches!(err, ExecError::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn test_executor_does_not_retry() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/daily/top-bets")
        .with_status(503)
        .expect(1)
        .create_async()
        .await;

    let executor = RequestExecutor::new().unwrap();
    let call = HttpCall::get(format!("{}/api/daily/top-bets", server.url()));
    let err = executor.execute(&call, Duration::from_secs(5)).await.unwrap_err();

    assert!(matches!(err, ExecError::HttpStatus { status: 503, .. }));
    mock.assert_async().await;
}
