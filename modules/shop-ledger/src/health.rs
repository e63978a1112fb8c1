use axum::{extract::State, Json};
use serde_json::Value;
use std::sync::Arc;

use crate::routes::AppState;

/// Health check endpoint handler
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "shop-ledger-rs",
        "version": env!("CARGO_PKG_VERSION"),
        "store": state.store_type.as_str(),
        "recalc_concurrency": state.recalculator.concurrency()
    }))
}
