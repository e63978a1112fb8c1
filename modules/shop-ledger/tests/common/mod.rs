//! Common test utilities for shop ledger integration tests
//!
//! Everything runs against `InMemoryStore`; no database is needed.
//! `FailingLedgerStore` wraps a store and makes ledger reads fail for chosen
//! entity ids, which is how per-entity batch failures are exercised.
//! `CountingLedgerStore` holds each history read open briefly and records how
//! many were in flight at once.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use shop_ledger_rs::models::{
    Entity, EntityScope, EntityType, EntryKind, Expense, Invoice, InvoiceLine, LedgerEntry,
    Product,
};
use shop_ledger_rs::repos::{InMemoryStore, LedgerStore, StoreError, StoreResult, Stores};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn at(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    date.and_hms_opt(hour, minute, 0).unwrap()
}

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn money(units: i64) -> Decimal {
    Decimal::from(units)
}

/// `cents(12345)` is 123.45
pub fn cents(value: i64) -> Decimal {
    Decimal::new(value, 2)
}

pub fn new_store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::new())
}

pub fn stores(store: &Arc<InMemoryStore>) -> Stores {
    Stores::from_backend(store.clone())
}

/// Seed one customer with sale 100, payment -40, sale 25 (balance 85)
pub async fn seed_customer_85(store: &InMemoryStore, customer_id: i64) {
    store
        .add_entity(EntityType::Customer, customer_id, "Northside Cafe")
        .await;
    let day = ymd(2024, 3, 1);
    store
        .record(EntityType::Customer, customer_id, EntryKind::Sale, money(100), at(day, 9, 0))
        .await;
    store
        .record(EntityType::Customer, customer_id, EntryKind::Payment, money(-40), at(day, 12, 0))
        .await;
    store
        .record(EntityType::Customer, customer_id, EntryKind::Sale, money(25), at(day, 15, 0))
        .await;
}

pub fn product(id: i64, name: &str, category: &str, quantity: i64, reorder_level: i64) -> Product {
    Product {
        id,
        name: name.to_string(),
        category: category.to_string(),
        quantity,
        reorder_level,
        cost_price: money(2),
        sale_price: money(5),
    }
}

pub fn line(product_id: i64, quantity: i64, unit_price: i64, unit_cost: i64) -> InvoiceLine {
    InvoiceLine {
        product_id,
        quantity,
        unit_price: money(unit_price),
        unit_cost: money(unit_cost),
    }
}

pub fn invoice(
    id: i64,
    customer_id: i64,
    issued_at: NaiveDateTime,
    due_date: NaiveDate,
    paid: i64,
    lines: Vec<InvoiceLine>,
) -> Invoice {
    Invoice {
        id,
        customer_id,
        number: format!("INV-{:04}", id),
        issued_at,
        due_date,
        total: lines.iter().map(InvoiceLine::revenue).sum(),
        paid_amount: money(paid),
        lines,
    }
}

pub fn expense(id: i64, category: &str, amount: i64, occurred_at: NaiveDateTime) -> Expense {
    Expense {
        id,
        category: category.to_string(),
        amount: money(amount),
        occurred_at,
        cash_account_id: Some(1),
    }
}

/// Ledger store wrapper whose `list_entries` fails for chosen entity ids
pub struct FailingLedgerStore {
    inner: Arc<InMemoryStore>,
    failing: HashSet<i64>,
}

impl FailingLedgerStore {
    pub fn new(inner: Arc<InMemoryStore>, failing: &[i64]) -> Self {
        Self {
            inner,
            failing: failing.iter().copied().collect(),
        }
    }
}

#[async_trait]
impl LedgerStore for FailingLedgerStore {
    async fn list_entities(&self, entity_type: EntityType) -> StoreResult<Vec<Entity>> {
        self.inner.list_entities(entity_type).await
    }

    async fn find_entity(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> StoreResult<Option<Entity>> {
        self.inner.find_entity(entity_type, entity_id).await
    }

    async fn list_entries(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> StoreResult<Vec<LedgerEntry>> {
        if self.failing.contains(&entity_id) {
            return Err(StoreError::Unavailable(format!(
                "ledger read refused for {} {}",
                entity_type, entity_id
            )));
        }
        self.inner.list_entries(entity_type, entity_id).await
    }

    async fn list_entries_in_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        scope: Option<&EntityScope>,
    ) -> StoreResult<Vec<LedgerEntry>> {
        self.inner.list_entries_in_range(start, end, scope).await
    }
}

/// Ledger store wrapper that tracks concurrent `list_entries` calls
pub struct CountingLedgerStore {
    inner: Arc<InMemoryStore>,
    hold: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl CountingLedgerStore {
    pub fn new(inner: Arc<InMemoryStore>, hold: Duration) -> Self {
        Self {
            inner,
            hold,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Most `list_entries` calls observed running at the same time
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerStore for CountingLedgerStore {
    async fn list_entities(&self, entity_type: EntityType) -> StoreResult<Vec<Entity>> {
        self.inner.list_entities(entity_type).await
    }

    async fn find_entity(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> StoreResult<Option<Entity>> {
        self.inner.find_entity(entity_type, entity_id).await
    }

    async fn list_entries(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> StoreResult<Vec<LedgerEntry>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.hold).await;
        let entries = self.inner.list_entries(entity_type, entity_id).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        entries
    }

    async fn list_entries_in_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        scope: Option<&EntityScope>,
    ) -> StoreResult<Vec<LedgerEntry>> {
        self.inner.list_entries_in_range(start, end, scope).await
    }
}
