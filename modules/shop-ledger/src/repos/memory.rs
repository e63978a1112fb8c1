//! In-memory store for tests and local development
//!
//! All state lives behind one `RwLock`, so every snapshot upsert is a single
//! atomic map insert and readers never observe a half-written snapshot.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::{CatalogStore, LedgerStore, SnapshotStore, StoreResult};
use crate::models::{
    BalanceSnapshot, Entity, EntityScope, EntityType, EntryKind, Expense, Invoice, LedgerEntry,
    Product,
};

#[derive(Default)]
struct Inner {
    entities: BTreeMap<(EntityType, i64), Entity>,
    entries: Vec<LedgerEntry>,
    snapshots: HashMap<(EntityType, i64), BalanceSnapshot>,
    products: BTreeMap<i64, Product>,
    invoices: BTreeMap<i64, Invoice>,
    expenses: BTreeMap<i64, Expense>,
}

/// Store implementation backed by process memory
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_entity(&self, entity_type: EntityType, id: i64, name: &str) {
        let mut inner = self.inner.write().await;
        inner.entities.insert(
            (entity_type, id),
            Entity {
                id,
                entity_type,
                name: name.to_string(),
            },
        );
    }

    /// Append an entry with an explicit id
    pub async fn append_entry(&self, entry: LedgerEntry) {
        self.inner.write().await.entries.push(entry);
    }

    /// Append an entry, assigning the next free id
    pub async fn record(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        kind: EntryKind,
        amount: Decimal,
        occurred_at: NaiveDateTime,
    ) -> LedgerEntry {
        let mut inner = self.inner.write().await;
        let id = inner.entries.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        let entry = LedgerEntry {
            id,
            entity_type,
            entity_id,
            kind,
            amount,
            occurred_at,
            related_invoice_id: None,
        };
        inner.entries.push(entry.clone());
        entry
    }

    pub async fn add_product(&self, product: Product) {
        self.inner.write().await.products.insert(product.id, product);
    }

    pub async fn add_invoice(&self, invoice: Invoice) {
        self.inner.write().await.invoices.insert(invoice.id, invoice);
    }

    pub async fn add_expense(&self, expense: Expense) {
        self.inner.write().await.expenses.insert(expense.id, expense);
    }
}

fn sort_entries(entries: &mut [LedgerEntry]) {
    entries.sort_by(|a, b| {
        a.occurred_at
            .cmp(&b.occurred_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn list_entities(&self, entity_type: EntityType) -> StoreResult<Vec<Entity>> {
        let inner = self.inner.read().await;
        Ok(inner
            .entities
            .values()
            .filter(|e| e.entity_type == entity_type)
            .cloned()
            .collect())
    }

    async fn find_entity(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> StoreResult<Option<Entity>> {
        let inner = self.inner.read().await;
        Ok(inner.entities.get(&(entity_type, entity_id)).cloned())
    }

    async fn list_entries(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> StoreResult<Vec<LedgerEntry>> {
        let inner = self.inner.read().await;
        let mut entries: Vec<LedgerEntry> = inner
            .entries
            .iter()
            .filter(|e| e.entity_type == entity_type && e.entity_id == entity_id)
            .cloned()
            .collect();
        sort_entries(&mut entries);
        Ok(entries)
    }

    async fn list_entries_in_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        scope: Option<&EntityScope>,
    ) -> StoreResult<Vec<LedgerEntry>> {
        let inner = self.inner.read().await;
        let mut entries: Vec<LedgerEntry> = inner
            .entries
            .iter()
            .filter(|e| e.occurred_at >= start && e.occurred_at <= end)
            .filter(|e| scope.map_or(true, |s| s.matches(e.entity_type, e.entity_id)))
            .cloned()
            .collect();
        sort_entries(&mut entries);
        Ok(entries)
    }
}

#[async_trait]
impl SnapshotStore for InMemoryStore {
    async fn upsert_snapshot(&self, snapshot: &BalanceSnapshot) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner
            .snapshots
            .insert((snapshot.entity_type, snapshot.entity_id), snapshot.clone());
        Ok(())
    }

    async fn get_snapshot(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> StoreResult<Option<BalanceSnapshot>> {
        let inner = self.inner.read().await;
        Ok(inner.snapshots.get(&(entity_type, entity_id)).cloned())
    }

    async fn list_snapshots(&self, entity_type: EntityType) -> StoreResult<Vec<BalanceSnapshot>> {
        let inner = self.inner.read().await;
        let mut snapshots: Vec<BalanceSnapshot> = inner
            .snapshots
            .values()
            .filter(|s| s.entity_type == entity_type)
            .cloned()
            .collect();
        snapshots.sort_by_key(|s| s.entity_id);
        Ok(snapshots)
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        Ok(self.inner.read().await.products.values().cloned().collect())
    }

    async fn list_invoices_in_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StoreResult<Vec<Invoice>> {
        let inner = self.inner.read().await;
        Ok(inner
            .invoices
            .values()
            .filter(|i| i.issued_at >= start && i.issued_at <= end)
            .cloned()
            .collect())
    }

    async fn list_open_invoices(&self, as_of: NaiveDateTime) -> StoreResult<Vec<Invoice>> {
        let inner = self.inner.read().await;
        Ok(inner
            .invoices
            .values()
            .filter(|i| i.issued_at <= as_of && i.outstanding() > Decimal::ZERO)
            .cloned()
            .collect())
    }

    async fn list_expenses_in_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StoreResult<Vec<Expense>> {
        let inner = self.inner.read().await;
        Ok(inner
            .expenses
            .values()
            .filter(|e| e.occurred_at >= start && e.occurred_at <= end)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_entries_come_back_in_time_then_id_order() {
        let store = InMemoryStore::new();
        for (id, day) in [(3, 2), (1, 5), (2, 2)] {
            store
                .append_entry(LedgerEntry {
                    id,
                    entity_type: EntityType::Customer,
                    entity_id: 7,
                    kind: EntryKind::Sale,
                    amount: Decimal::from(10),
                    occurred_at: at(day, 9),
                    related_invoice_id: None,
                })
                .await;
        }

        let ids: Vec<i64> = store
            .list_entries(EntityType::Customer, 7)
            .await
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();

        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn test_range_query_is_inclusive_and_scoped() {
        let store = InMemoryStore::new();
        store
            .record(EntityType::Customer, 1, EntryKind::Sale, Decimal::from(5), at(1, 0))
            .await;
        store
            .record(EntityType::Customer, 2, EntryKind::Sale, Decimal::from(7), at(3, 0))
            .await;
        store
            .record(EntityType::Supplier, 1, EntryKind::Purchase, Decimal::from(9), at(3, 0))
            .await;

        let all = store
            .list_entries_in_range(at(1, 0), at(3, 0), None)
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let scope = EntityScope::entity(EntityType::Customer, 2);
        let scoped = store
            .list_entries_in_range(at(1, 0), at(3, 0), Some(&scope))
            .await
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].amount, Decimal::from(7));
    }
}
