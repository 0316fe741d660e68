//! End-to-end runs of the HTTP transport against a stub gateway function.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use plaza_client::{Client, Entity, Filterable, GatewayConfig, ProxyError, Row};
use serde_json::{json, Value};

#[derive(Clone, Default)]
struct Seen {
    bodies: Arc<Mutex<Vec<Value>>>,
    auth: Arc<Mutex<Vec<Option<String>>>>,
}

async fn gateway(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    seen.bodies.lock().unwrap().push(body.clone());
    seen.auth.lock().unwrap().push(
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );

    let table = body["table"].as_str().unwrap_or_default();
    let action = body["action"].as_str().unwrap_or_default();
    match (table, action) {
        ("reports", _) => (
            StatusCode::BAD_REQUEST,
            json!({"data": null, "error": "permission denied for table reports"}).to_string(),
        ),
        ("polls", _) => (StatusCode::BAD_GATEWAY, "upstream unavailable".into()),
        ("likes", _) => (
            StatusCode::OK,
            json!({"data": [{"id": "l1"}], "error": "duplicate key value"}).to_string(),
        ),
        (_, "insert") => (
            StatusCode::OK,
            json!({"data": [body["data"].clone()], "error": null}).to_string(),
        ),
        (_, "select") => (
            StatusCode::OK,
            json!({"data": [{"id": "p1", "content": "first"}], "error": null}).to_string(),
        ),
        _ => (StatusCode::OK, json!({"data": null, "error": null}).to_string()),
    }
}

async fn spawn_gateway() -> (SocketAddr, Seen) {
    let seen = Seen::default();
    let app = Router::new()
        .route("/functions/v1/db-proxy", post(gateway))
        .with_state(seen.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, seen)
}

fn client_for(addr: SocketAddr) -> Client {
    let config = GatewayConfig::new(format!("http://{addr}")).with_token("anon-key");
    Client::from_config(&config).unwrap()
}

#[tokio::test]
async fn select_round_trips_over_http() {
    let (addr, seen) = spawn_gateway().await;
    let client = client_for(addr);

    let rows = client
        .table(Entity::Posts)
        .eq("room_id", "r1")
        .order("created_at", false)
        .limit(10)
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["content"], json!("first"));

    let bodies = seen.bodies.lock().unwrap().clone();
    assert_eq!(bodies.len(), 1);
    assert_eq!(
        bodies[0],
        json!({
            "action": "select",
            "table": "posts",
            "filters": {"room_id": {"eq": "r1"}},
            "options": {
                "columns": "*",
                "order": [{"column": "created_at", "ascending": false}],
                "limit": 10
            }
        })
    );
    assert_eq!(
        seen.auth.lock().unwrap()[0].as_deref(),
        Some("Bearer anon-key")
    );
}

#[tokio::test]
async fn insert_returns_the_defaulted_row() {
    let (addr, _seen) = spawn_gateway().await;
    let client = client_for(addr);

    let mut row = Row::new();
    row.insert("content".into(), json!("hi"));
    let inserted = client.table(Entity::Comments).insert(row).await.unwrap();

    assert_eq!(inserted.len(), 1);
    assert_eq!(inserted[0]["content"], json!("hi"));
    assert!(inserted[0]["id"].is_string());
    assert_eq!(inserted[0]["updated_at"], inserted[0]["created_at"]);
}

#[tokio::test]
async fn delete_with_null_data_yields_no_rows() {
    let (addr, _seen) = spawn_gateway().await;
    let client = client_for(addr);
    let rows = client.table(Entity::Posts).delete().eq("id", "p1").await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn error_envelope_on_failed_status_is_a_gateway_error() {
    let (addr, _seen) = spawn_gateway().await;
    let client = client_for(addr);
    let err = client.table(Entity::Reports).select("*").await.unwrap_err();
    assert_eq!(
        err,
        ProxyError::Gateway("permission denied for table reports".into())
    );
}

#[tokio::test]
async fn error_envelope_on_success_status_still_fails() {
    let (addr, _seen) = spawn_gateway().await;
    let client = client_for(addr);
    let err = client.table(Entity::Likes).single().await.unwrap_err();
    assert_eq!(err.to_string(), "duplicate key value");
}

#[tokio::test]
async fn unparseable_failure_is_a_transport_error() {
    let (addr, _seen) = spawn_gateway().await;
    let client = client_for(addr);
    let err = client.table(Entity::Polls).select("*").await.unwrap_err();
    assert!(matches!(err, ProxyError::Transport(_)), "{err:?}");
}

#[tokio::test]
async fn unreachable_gateway_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(addr);
    let err = client.table(Entity::Posts).select("*").await.unwrap_err();
    assert!(matches!(err, ProxyError::Transport(_)), "{err:?}");
}
