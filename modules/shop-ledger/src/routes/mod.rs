//! HTTP surface
//!
//! Handlers translate `LedgerError` into status codes with a
//! `{ "error": "..." }` body: not found is 404, invalid arguments are 400, and
//! storage failures are 500.

pub mod balances;
pub mod reports;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::config::StoreType;
use crate::error::LedgerError;
use crate::health::health;
use crate::metrics::Metrics;
use crate::repos::Stores;
use crate::services::batch_recalculator::BatchRecalculator;
use crate::services::export::ExportError;
use crate::services::reports::ReportEngine;

/// Shared handler state
pub struct AppState {
    pub stores: Stores,
    pub recalculator: BatchRecalculator,
    pub reports: ReportEngine,
    pub metrics: Arc<Metrics>,
    pub store_type: StoreType,
}

impl AppState {
    pub fn new(
        stores: Stores,
        recalc_concurrency: usize,
        report_default_limit: usize,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            recalculator: BatchRecalculator::new(
                stores.ledger.clone(),
                stores.snapshots.clone(),
                recalc_concurrency,
            ),
            reports: ReportEngine::with_default_limit(stores.clone(), report_default_limit),
            stores,
            metrics,
            store_type: StoreType::InMemory,
        }
    }

    /// Record which backend serves the stores, as reported by the health check
    pub fn with_store_type(mut self, store_type: StoreType) -> Self {
        self.store_type = store_type;
        self
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/metrics", get(metrics_handler))
        .route(
            "/api/balances/{entity_type}/recalculate",
            post(balances::recalculate_all),
        )
        .route(
            "/api/balances/{entity_type}/{entity_id}",
            get(balances::get_balance),
        )
        .route(
            "/api/balances/{entity_type}/{entity_id}/recalculate",
            post(balances::recalculate_one),
        )
        .route("/api/reports/{report}", get(reports::get_report))
        .route("/api/reports/{report}/export", get(reports::export_report))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let body = state.metrics.render().map_err(|e| ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: format!("Failed to render metrics: {}", e),
    })?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error response wrapper for proper HTTP error handling
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let status = match &err {
            LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
            LedgerError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            LedgerError::Storage(_) => {
                tracing::error!(error = %err, "Storage failure while serving request");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        ApiError {
            status,
            message: err.to_string(),
        }
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Query(e) => e.into(),
            other => {
                tracing::error!(error = %other, "Report export failed");
                ApiError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: other.to_string(),
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityType;

    #[test]
    fn test_error_status_mapping() {
        let not_found: ApiError = LedgerError::NotFound {
            entity_type: EntityType::Customer,
            entity_id: 7,
        }
        .into();
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);
        assert_eq!(not_found.message, "customer 7 not found");

        let invalid: ApiError = LedgerError::InvalidArgument("bad".to_string()).into();
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

        let wrapped: ApiError =
            ExportError::Query(LedgerError::InvalidArgument("x".to_string())).into();
        assert_eq!(wrapped.status, StatusCode::BAD_REQUEST);
    }
}
