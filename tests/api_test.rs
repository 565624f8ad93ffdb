//! HTTP API tests against the router served on an ephemeral port.

mod common;

use std::path::PathBuf;

use common::{client, spawn_server};
use serde_json::{json, Value};

fn no_engine() -> PathBuf {
    PathBuf::from("/nonexistent/stockfish")
}

#[tokio::test]
async fn test_health() {
    let base = spawn_server(no_engine()).await;
    let res = client().get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_static_ui_served_at_root() {
    let base = spawn_server(no_engine()).await;
    let res = client().get(format!("{base}/")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let html = res.text().await.unwrap();
    assert!(html.contains("/api/analyze"));
}

#[tokio::test]
async fn test_empty_pgn_is_bad_request() {
    let base = spawn_server(no_engine()).await;
    let res = client()
        .post(format!("{base}/api/analyze"))
        .json(&json!({ "pgn": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_pgn_without_moves_is_bad_request() {
    let base = spawn_server(no_engine()).await;
    let res = client()
        .post(format!("{base}/api/analyze"))
        .json(&json!({ "pgn": "[Event \"Nothing\"]\n\n*" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid PGN: no moves found in PGN");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let base = spawn_server(no_engine()).await;
    let res = client()
        .post(format!("{base}/api/analyze"))
        .header("content-type", "application/json")
        .body("{\"pgn\": ")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_missing_engine_is_service_unavailable() {
    let base = spawn_server(no_engine()).await;
    let res = client()
        .post(format!("{base}/api/analyze"))
        .json(&json!({ "pgn": "1. e4 e5 *" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 503);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "analysis engine unavailable" }));
}

#[cfg(unix)]
#[tokio::test]
async fn test_analyze_with_fake_engine() {
    let dir = tempfile::tempdir().unwrap();
    let base = spawn_server(common::fake_engine(dir.path())).await;

    let pgn = "[White \"Alice\"]\n[Black \"Bob\"]\n\n1. e4 e5 2. Nf3 Nc6 *";
    let res = client()
        .post(format!("{base}/api/analyze"))
        .json(&json!({ "pgn": pgn }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();

    assert_eq!(body["game_info"]["white"], "Alice");
    assert_eq!(body["game_info"]["event"], "Unknown");
    let moves = body["moves"].as_array().unwrap();
    assert_eq!(moves.len(), 4);
    assert_eq!(moves[0]["move"], "e4");
    assert_eq!(moves[0]["uci"], "e2e4");
    assert_eq!(moves[0]["player"], "White");
    assert_eq!(moves[3]["notation"], "2. Nf3 Nc6");
    // +0.20 for whoever is to move: every move hands over the same edge
    for m in moves {
        assert_eq!(m["quality"], "good move");
        assert_eq!(m["delta"], -40);
    }
    assert_eq!(moves[0]["evaluation"], "-0.20");
    assert!(body["errors"].as_array().unwrap().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_concurrent_requests_use_separate_engines() {
    let dir = tempfile::tempdir().unwrap();
    let base = spawn_server(common::fake_engine(dir.path())).await;
    let http = client();

    let requests = (0..4).map(|_| {
        http.post(format!("{base}/api/analyze"))
            .json(&json!({ "pgn": "1. d4 d5 2. c4 e6 *" }))
            .send()
    });
    let responses = futures::future::join_all(requests).await;

    let mut bodies = Vec::new();
    for res in responses {
        let res = res.unwrap();
        assert_eq!(res.status(), 200);
        bodies.push(res.json::<Value>().await.unwrap());
    }
    assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));
}
