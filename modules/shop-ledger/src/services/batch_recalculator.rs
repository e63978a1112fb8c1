//! Batch Recalculator
//!
//! Rebuilds the snapshot of every entity of one kind. Each entity is its own
//! atomic upsert, so a failure (or a timeout) part way through never rolls back
//! entities that already finished. Per-entity failures are collected into the
//! summary instead of aborting the batch.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::LedgerResult;
use crate::models::EntityType;
use crate::repos::{LedgerStore, SnapshotStore};
use crate::services::balance_aggregator;

/// Default number of entities recalculated at once
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Emitted once per finished entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub current: usize,
    pub total: usize,
    pub entity_id: i64,
    pub ok: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityFailure {
    pub entity_id: i64,
    pub code: String,
    pub error: String,
}

/// Outcome of a batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub run_id: Uuid,
    pub entity_type: EntityType,
    pub total: usize,
    pub succeeded: usize,
    /// Sorted by entity id
    pub failed: Vec<EntityFailure>,
}

impl BatchSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Clone)]
pub struct BatchRecalculator {
    ledger: Arc<dyn LedgerStore>,
    snapshots: Arc<dyn SnapshotStore>,
    concurrency: usize,
}

impl BatchRecalculator {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        snapshots: Arc<dyn SnapshotStore>,
        concurrency: usize,
    ) -> Self {
        Self {
            ledger,
            snapshots,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub async fn recalculate_all(&self, entity_type: EntityType) -> LedgerResult<BatchSummary> {
        self.recalculate_all_with_progress(entity_type, None).await
    }

    /// Recalculate every entity of `entity_type`
    ///
    /// Progress is pushed into an unbounded channel so a slow listener never
    /// stalls the batch; a dropped receiver is ignored.
    ///
    /// # Errors
    /// Only a failure to enumerate the entities fails the whole call. Anything
    /// that goes wrong for a single entity ends up in `BatchSummary::failed`.
    pub async fn recalculate_all_with_progress(
        &self,
        entity_type: EntityType,
        progress: Option<mpsc::UnboundedSender<BatchProgress>>,
    ) -> LedgerResult<BatchSummary> {
        let run_id = Uuid::new_v4();
        let entities = self.ledger.list_entities(entity_type).await?;
        let total = entities.len();

        tracing::info!(
            run_id = %run_id,
            entity_type = %entity_type,
            total = total,
            concurrency = self.concurrency,
            "Starting balance recalculation batch"
        );

        let ledger = self.ledger.as_ref();
        let snapshots = self.snapshots.as_ref();

        let mut results = stream::iter(entities)
            .map(|entity| async move {
                let result =
                    balance_aggregator::recalculate(ledger, snapshots, entity_type, entity.id)
                        .await;
                (entity.id, result)
            })
            .buffer_unordered(self.concurrency);

        let mut current = 0;
        let mut succeeded = 0;
        let mut failed = Vec::new();

        while let Some((entity_id, result)) = results.next().await {
            current += 1;
            let ok = result.is_ok();

            match result {
                Ok(snapshot) => {
                    succeeded += 1;
                    tracing::debug!(
                        run_id = %run_id,
                        entity_id = entity_id,
                        balance = %snapshot.balance,
                        "Recalculated balance"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        run_id = %run_id,
                        entity_type = %entity_type,
                        entity_id = entity_id,
                        error = %e,
                        "Balance recalculation failed for entity"
                    );
                    failed.push(EntityFailure {
                        entity_id,
                        code: e.code().to_string(),
                        error: e.to_string(),
                    });
                }
            }

            if let Some(tx) = &progress {
                let _ = tx.send(BatchProgress {
                    current,
                    total,
                    entity_id,
                    ok,
                });
            }
        }

        failed.sort_by_key(|f| f.entity_id);

        tracing::info!(
            run_id = %run_id,
            entity_type = %entity_type,
            succeeded = succeeded,
            failed = failed.len(),
            "Balance recalculation batch finished"
        );

        Ok(BatchSummary {
            run_id,
            entity_type,
            total,
            succeeded,
            failed,
        })
    }
}
