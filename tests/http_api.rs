use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use chrono::NaiveDate;
use ledger_server::services::FixedClock;
use ledger_server::{LedgerEngine, LedgerPolicy, MemoryStorage, app};
use serde_json::{Value, json};
use tower::ServiceExt;

const A: &str = "1234567890";
const B: &str = "0987654321";

fn router() -> Router {
    let engine = LedgerEngine::new(
        MemoryStorage::new(Duration::from_millis(500)),
        LedgerPolicy::default(),
    )
    .with_clock(FixedClock(NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()));
    app::router(Arc::new(engine))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn open(app: &Router, number: &str) {
    let (status, _) = call(
        app,
        Method::POST,
        "/api/v1/accounts",
        Some(json!({ "account_number": number })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap()
}

#[tokio::test]
async fn health_reports_backend() {
    let app = router();
    let (status, body) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "memory");
}

#[tokio::test]
async fn account_lifecycle() {
    let app = router();
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/accounts",
        Some(json!({ "account_number": A })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["account_number"], A);
    assert_eq!(body["balance"], "0.00");
    assert!(body.get("version").is_none());

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/accounts",
        Some(json!({ "account_number": A })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "account_already_exists");

    let (status, body) = call(&app, Method::GET, &format!("/api/v1/accounts/{A}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["account_number"], A);

    let (status, _) = call(&app, Method::DELETE, &format!("/api/v1/accounts/{A}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = call(&app, Method::GET, &format!("/api/v1/accounts/{A}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "account_not_found");
}

#[tokio::test]
async fn malformed_account_number_is_a_bad_request() {
    let app = router();
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/accounts",
        Some(json!({ "account_number": "12-34" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "invalid_request");
}

#[tokio::test]
async fn money_movement_over_http() {
    let app = router();
    open(&app, A).await;
    open(&app, B).await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/transactions/deposit",
        Some(json!({ "account_number": A, "amount": "500000" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transaction_type"], "DEPOSIT");
    assert_eq!(body["balance_after"], "500000.00");
    assert_eq!(body["description"], "Deposit");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/transactions/withdraw",
        Some(json!({ "account_number": A, "amount": "100000" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance_after"], "400000.00");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/transactions/transfer",
        Some(json!({
            "source_account_number": A,
            "target_account_number": B,
            "amount": "100000"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fee"], "1000.00");
    assert_eq!(body["total_deduction"], "101000.00");
    assert_eq!(body["source_balance_after"], "299000.00");
    assert_eq!(body["target_balance_after"], "100000.00");

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/api/v1/transactions/history/{A}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["transaction_type"], "TRANSFER_OUT");
    assert_eq!(rows[0]["description"], format!("Transfer to {B}"));
    assert_eq!(rows[2]["transaction_type"], "DEPOSIT");

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/api/v1/transactions/history/{A}?page=1&size=2"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["transaction_type"], "DEPOSIT");
}

#[tokio::test]
async fn business_failures_map_to_error_bodies() {
    let app = router();
    open(&app, A).await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/transactions/withdraw",
        Some(json!({ "account_number": A, "amount": "1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "insufficient_balance");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/transactions/deposit",
        Some(json!({ "account_number": A })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "invalid_amount");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/transactions/deposit",
        Some(json!({ "account_number": A, "amount": "-3" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "invalid_amount");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/transactions/transfer",
        Some(json!({
            "source_account_number": A,
            "target_account_number": A,
            "amount": "10"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "same_account_transfer");

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/api/v1/transactions/history/{B}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "account_not_found");
}
