//! Storage interfaces consumed by the core
//!
//! The ledger is read-only from the core's point of view. Snapshots are the only
//! thing the core writes. Each backend implements all three traits; the core only
//! ever sees `Arc<dyn …>` and never branches on the storage technology.

pub mod memory;
pub mod pg;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::sync::Arc;
use thiserror::Error;

use crate::models::{
    BalanceSnapshot, Entity, EntityScope, EntityType, Expense, Invoice, LedgerEntry, Product,
};

pub use memory::InMemoryStore;
pub use pg::PgStore;

/// Errors raised by a storage backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Append-only ledger of financial events
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// All entities of a kind, ordered by id
    async fn list_entities(&self, entity_type: EntityType) -> StoreResult<Vec<Entity>>;

    async fn find_entity(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> StoreResult<Option<Entity>>;

    /// Full history of one entity, ordered by `occurred_at` then `id`
    async fn list_entries(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> StoreResult<Vec<LedgerEntry>>;

    /// Entries with `start <= occurred_at <= end`, ordered by `occurred_at` then `id`
    async fn list_entries_in_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        scope: Option<&EntityScope>,
    ) -> StoreResult<Vec<LedgerEntry>>;
}

/// Cached balance rollups
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Atomically insert or replace the snapshot for one entity
    async fn upsert_snapshot(&self, snapshot: &BalanceSnapshot) -> StoreResult<()>;

    async fn get_snapshot(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> StoreResult<Option<BalanceSnapshot>>;

    async fn list_snapshots(&self, entity_type: EntityType) -> StoreResult<Vec<BalanceSnapshot>>;
}

/// Product, invoice, and expense records used by reports
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_products(&self) -> StoreResult<Vec<Product>>;

    /// Invoices with `start <= issued_at <= end`, lines included
    async fn list_invoices_in_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StoreResult<Vec<Invoice>>;

    /// Invoices issued at or before `as_of` that still carry an outstanding amount
    async fn list_open_invoices(&self, as_of: NaiveDateTime) -> StoreResult<Vec<Invoice>>;

    async fn list_expenses_in_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StoreResult<Vec<Expense>>;
}

/// Handles to every store the core needs
#[derive(Clone)]
pub struct Stores {
    pub ledger: Arc<dyn LedgerStore>,
    pub snapshots: Arc<dyn SnapshotStore>,
    pub catalog: Arc<dyn CatalogStore>,
}

impl Stores {
    /// Use one backend for all three roles
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: LedgerStore + SnapshotStore + CatalogStore + 'static,
    {
        Self {
            ledger: backend.clone(),
            snapshots: backend.clone(),
            catalog: backend,
        }
    }
}
