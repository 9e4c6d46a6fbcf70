//! HTTP surface driven through the router with `oneshot`

mod common;

use axum::Router;
use axum::body::Body;
use common::{Harness, snapshot};
use http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;
use umbra_edge::api::build_app;

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let h = Harness::new(1);
    let app = build_app(h.state.clone());

    let (status, body) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store_code"], "STORE01");
    assert_eq!(body["terminal"], 1);

    let (status, body) = call(&app, Method::GET, "/health/detailed", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["database"]["status"], "ok");
    assert_eq!(body["checks"]["resend"]["pending"], 0);
}

#[tokio::test]
async fn test_generate_before_closing_returns_data_not_ready() {
    let h = Harness::new(1);
    let app = build_app(h.state.clone());

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/reports/ayala/generate",
        Some(json!({ "date": "2024-05-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 4001);
    assert_eq!(body["details"]["store_code"], "STORE01");
}

#[tokio::test]
async fn test_invalid_date_is_rejected() {
    let h = Harness::new(1);
    let app = build_app(h.state.clone());

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/reports/robinson/generate",
        Some(json!({ "date": "05/01/2024" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["expected"], "YYYY-MM-DD");
}

#[tokio::test]
async fn test_eod_ingest_then_robinson_flow() {
    let h = Harness::new(1);
    let app = build_app(h.state.clone());

    let payload = serde_json::to_value(snapshot(1)).unwrap();
    let (status, _) = call(&app, Method::POST, "/api/eod", Some(payload)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, Method::GET, "/api/eod/STORE01/2024-05-01", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["last_si"], 3);

    let (status, _) = call(&app, Method::GET, "/api/eod/STORE01/2024-05-02", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/reports/robinson/generate",
        Some(json!({ "date": "2024-05-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["batch_number"], 1);
    assert_eq!(body["data"]["remote_synced"], true);
    assert_eq!(body["message"], "Report generated and delivered");

    let (_, body) = call(&app, Method::GET, "/api/ledger/STORE01/2024-05-01", None).await;
    assert_eq!(body["data"]["batch_log"]["batch_number"], 2);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/reports/robinson/resend",
        Some(json!({ "date": "2024-05-01", "batch": 7 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 4003);

    let (status, body) = call(&app, Method::GET, "/api/deliveries?sent=true", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["kind"], "robinson_batch");
}

#[tokio::test]
async fn test_ledger_endpoints() {
    let h = Harness::new(1);
    let app = build_app(h.state.clone());

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/ledger/hour-range",
        Some(json!({ "date": "2024-05-01", "hour": 9, "count": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["start"], 1);
    assert_eq!(body["data"]["end"], 5);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/ledger/hour-range",
        Some(json!({ "date": "2024-05-01", "hour": 24, "count": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/ledger/hour-range",
        Some(json!({ "date": "2024-05-01", "hour": 10, "count": u64::MAX })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["hour"], 10);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/ledger/reprint",
        Some(json!({
            "date": "2024-05-01",
            "kind": "RECEIPT",
            "si_number": 2,
            "amount": "150.00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["reprints"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["batch_number"], 1);

    let (_, body) = call(&app, Method::GET, "/api/ledger/STORE01/2024-05-01", None).await;
    assert_eq!(body["data"]["hour_ranges"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_manual_resend_trigger() {
    let h = Harness::new(1);
    let app = build_app(h.state.clone());

    let (status, body) = call(&app, Method::POST, "/api/deliveries/resend", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["started"], true);

    h.state.coordinator.shutdown().await;
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let h = Harness::new(1);
    let app = build_app(h.state.clone());

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let id = response.headers().get("x-request-id").unwrap();
    assert_eq!(id.to_str().unwrap().len(), 36);
}
