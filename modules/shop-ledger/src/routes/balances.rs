//! Balance snapshot routes

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::error::LedgerError;
use crate::models::{BalanceSnapshot, EntityType};
use crate::services::balance_aggregator;
use crate::services::batch_recalculator::BatchSummary;

/// Handler for GET /api/balances/{entity_type}/{entity_id}
///
/// Returns the cached snapshot; it may be stale until the next recalculation.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    Path((entity_type, entity_id)): Path<(String, i64)>,
) -> Result<Json<BalanceSnapshot>, ApiError> {
    let entity_type: EntityType = entity_type.parse()?;

    let snapshot = state
        .stores
        .snapshots
        .get_snapshot(entity_type, entity_id)
        .await
        .map_err(LedgerError::from)?
        .ok_or(LedgerError::NotFound {
            entity_type,
            entity_id,
        })?;

    Ok(Json(snapshot))
}

/// Handler for POST /api/balances/{entity_type}/{entity_id}/recalculate
pub async fn recalculate_one(
    State(state): State<Arc<AppState>>,
    Path((entity_type, entity_id)): Path<(String, i64)>,
) -> Result<Json<BalanceSnapshot>, ApiError> {
    let entity_type: EntityType = entity_type.parse()?;

    let result = balance_aggregator::recalculate(
        state.stores.ledger.as_ref(),
        state.stores.snapshots.as_ref(),
        entity_type,
        entity_id,
    )
    .await;
    state
        .metrics
        .record_recalculation(entity_type, result.is_ok());

    let snapshot = result?;
    tracing::info!(
        entity_type = %entity_type,
        entity_id = entity_id,
        balance = %snapshot.balance,
        "Balance recalculated on request"
    );
    Ok(Json(snapshot))
}

/// Handler for POST /api/balances/{entity_type}/recalculate
///
/// Runs the whole batch before responding. Per-entity failures are reported in
/// the summary with a 200; only failing to list the entities is an error.
pub async fn recalculate_all(
    State(state): State<Arc<AppState>>,
    Path(entity_type): Path<String>,
) -> Result<Json<BatchSummary>, ApiError> {
    let entity_type: EntityType = entity_type.parse()?;

    let summary = state.recalculator.recalculate_all(entity_type).await?;
    state.metrics.record_batch(&summary);

    Ok(Json(summary))
}
