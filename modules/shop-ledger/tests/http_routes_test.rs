mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use common::*;
use http_body_util::BodyExt;
use serde_json::Value;
use shop_ledger_rs::metrics::Metrics;
use shop_ledger_rs::models::EntityType;
use shop_ledger_rs::{router, AppState};
use std::sync::Arc;
use tower::ServiceExt;

async fn app() -> Router {
    let store = new_store();
    seed_customer_85(&store, 1).await;
    store.add_entity(EntityType::Customer, 2, "Riverside School").await;

    let metrics = Arc::new(Metrics::new().unwrap());
    let state = Arc::new(AppState::new(stores(&store), 2, 5, metrics));
    router(state)
}

async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

fn json(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["service"], "shop-ledger-rs");
    assert_eq!(body["store"], "inmemory");
    assert_eq!(body["recalc_concurrency"], 2);
}

#[tokio::test]
async fn test_recalculate_then_read_snapshot() {
    let app = app().await;

    let (status, _) = send(&app, "GET", "/api/balances/customer/1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "POST", "/api/balances/customer/1/recalculate").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["balance"], "85");

    let (status, body) = send(&app, "GET", "/api/balances/customer/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["entity_type"], "customer");
}

#[tokio::test]
async fn test_recalculate_unknown_entity_is_404() {
    let app = app().await;
    let (status, body) = send(&app, "POST", "/api/balances/supplier/9/recalculate").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["error"], "supplier 9 not found");
}

#[tokio::test]
async fn test_unknown_entity_type_is_400() {
    let app = app().await;
    let (status, _) = send(&app, "GET", "/api/balances/vendor/1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_batch_recalculation_summary() {
    let app = app().await;
    let (status, body) = send(&app, "POST", "/api/balances/customers/recalculate").await;
    assert_eq!(status, StatusCode::OK);

    let summary = json(&body);
    assert_eq!(summary["total"], 2);
    assert_eq!(summary["succeeded"], 2);
    assert_eq!(summary["failed"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_report_with_preset() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/api/reports/sales-summary?preset=thisMonth").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["invoice_count"], 0);
}

#[tokio::test]
async fn test_report_rejects_inverted_dates() {
    let app = app().await;
    let (status, body) = send(
        &app,
        "GET",
        "/api/reports/sales-trend?start_date=2024-03-10&end_date=2024-03-01",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().contains("after"));
}

#[tokio::test]
async fn test_report_rejects_dates_outside_supported_years() {
    let app = app().await;
    let (status, body) = send(
        &app,
        "GET",
        "/api/reports/sales-summary?start_date=-262143-01-01&end_date=-262143-01-02",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().contains("supported years"));
}

#[tokio::test]
async fn test_report_rejects_too_many_daily_buckets() {
    let app = app().await;
    let (status, _) = send(
        &app,
        "GET",
        "/api/reports/sales-trend?start_date=1900-01-01&end_date=9999-12-31&period=daily",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_report_is_400() {
    let app = app().await;
    let (status, _) = send(&app, "GET", "/api/reports/balance-sheet?preset=today").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_export_csv_sets_download_headers() {
    let app = app().await;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/reports/debt-summary/export?format=csv&start_date=2024-03-01&end_date=2024-03-31")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"debt-summary_20240301_20240331.csv\""
    );
}

#[tokio::test]
async fn test_export_pdf_is_400() {
    let app = app().await;
    let (status, _) = send(
        &app,
        "GET",
        "/api/reports/sales-summary/export?format=pdf&preset=today",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metrics_count_requests() {
    let app = app().await;
    send(&app, "POST", "/api/balances/customer/1/recalculate").await;
    send(&app, "GET", "/api/reports/inventory?preset=today").await;

    let (status, body) = send(&app, "GET", "/metrics").await;
    let text = String::from_utf8(body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("recalculations_total{entity_type=\"customer\",result=\"ok\"} 1"));
    assert!(text.contains("report_queries_total{report=\"inventory\",result=\"ok\"} 1"));
}
