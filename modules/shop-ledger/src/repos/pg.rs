//! Postgres-backed store
//!
//! Enum columns are stored as TEXT and parsed on read; a value that does not
//! parse is reported as `StoreError::Corrupt` rather than silently skipped.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;

use super::{CatalogStore, LedgerStore, SnapshotStore, StoreError, StoreResult};
use crate::models::{
    BalanceSnapshot, Entity, EntityScope, EntityType, EntryKind, Expense, Invoice, InvoiceLine,
    LedgerEntry, Product,
};

/// Store implementation backed by a Postgres pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(Debug, FromRow)]
struct EntityRow {
    id: i64,
    entity_type: String,
    name: String,
}

#[derive(Debug, FromRow)]
struct EntryRow {
    id: i64,
    entity_type: String,
    entity_id: i64,
    kind: String,
    amount: Decimal,
    occurred_at: NaiveDateTime,
    related_invoice_id: Option<i64>,
}

#[derive(Debug, FromRow)]
struct SnapshotRow {
    entity_type: String,
    entity_id: i64,
    balance: Decimal,
    last_recalculated_at: NaiveDateTime,
}

#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: i64,
    customer_id: i64,
    number: String,
    issued_at: NaiveDateTime,
    due_date: NaiveDate,
    total: Decimal,
    paid_amount: Decimal,
}

#[derive(Debug, FromRow)]
struct InvoiceLineRow {
    invoice_id: i64,
    product_id: i64,
    quantity: i64,
    unit_price: Decimal,
    unit_cost: Decimal,
}

fn parse_entity_type(raw: &str) -> StoreResult<EntityType> {
    raw.parse()
        .map_err(|_| StoreError::Corrupt(format!("entity_type '{}'", raw)))
}

fn parse_kind(raw: &str) -> StoreResult<EntryKind> {
    raw.parse()
        .map_err(|_| StoreError::Corrupt(format!("entry kind '{}'", raw)))
}

impl TryFrom<EntityRow> for Entity {
    type Error = StoreError;

    fn try_from(row: EntityRow) -> StoreResult<Self> {
        Ok(Entity {
            id: row.id,
            entity_type: parse_entity_type(&row.entity_type)?,
            name: row.name,
        })
    }
}

impl TryFrom<EntryRow> for LedgerEntry {
    type Error = StoreError;

    fn try_from(row: EntryRow) -> StoreResult<Self> {
        Ok(LedgerEntry {
            id: row.id,
            entity_type: parse_entity_type(&row.entity_type)?,
            entity_id: row.entity_id,
            kind: parse_kind(&row.kind)?,
            amount: row.amount,
            occurred_at: row.occurred_at,
            related_invoice_id: row.related_invoice_id,
        })
    }
}

impl TryFrom<SnapshotRow> for BalanceSnapshot {
    type Error = StoreError;

    fn try_from(row: SnapshotRow) -> StoreResult<Self> {
        Ok(BalanceSnapshot {
            entity_id: row.entity_id,
            entity_type: parse_entity_type(&row.entity_type)?,
            balance: row.balance,
            last_recalculated_at: row.last_recalculated_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

impl PgStore {
    /// Attach lines to invoice headers, preserving header order
    async fn with_lines(&self, headers: Vec<InvoiceRow>) -> StoreResult<Vec<Invoice>> {
        if headers.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = headers.iter().map(|h| h.id).collect();
        let rows = sqlx::query_as::<_, InvoiceLineRow>(
            r#"
            SELECT invoice_id, product_id, quantity, unit_price, unit_cost
            FROM invoice_lines
            WHERE invoice_id = ANY($1)
            ORDER BY invoice_id, line_no
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut lines: HashMap<i64, Vec<InvoiceLine>> = HashMap::new();
        for row in rows {
            lines.entry(row.invoice_id).or_default().push(InvoiceLine {
                product_id: row.product_id,
                quantity: row.quantity,
                unit_price: row.unit_price,
                unit_cost: row.unit_cost,
            });
        }

        Ok(headers
            .into_iter()
            .map(|h| Invoice {
                lines: lines.remove(&h.id).unwrap_or_default(),
                id: h.id,
                customer_id: h.customer_id,
                number: h.number,
                issued_at: h.issued_at,
                due_date: h.due_date,
                total: h.total,
                paid_amount: h.paid_amount,
            })
            .collect())
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn list_entities(&self, entity_type: EntityType) -> StoreResult<Vec<Entity>> {
        let rows = sqlx::query_as::<_, EntityRow>(
            r#"
            SELECT id, entity_type, name
            FROM entities
            WHERE entity_type = $1
            ORDER BY id
            "#,
        )
        .bind(entity_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn find_entity(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> StoreResult<Option<Entity>> {
        let row = sqlx::query_as::<_, EntityRow>(
            r#"
            SELECT id, entity_type, name
            FROM entities
            WHERE entity_type = $1 AND id = $2
            "#,
        )
        .bind(entity_type.as_str())
        .bind(entity_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Entity::try_from).transpose()
    }

    async fn list_entries(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> StoreResult<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, EntryRow>(
            r#"
            SELECT id, entity_type, entity_id, kind, amount, occurred_at, related_invoice_id
            FROM ledger_entries
            WHERE entity_type = $1 AND entity_id = $2
            ORDER BY occurred_at ASC, id ASC
            "#,
        )
        .bind(entity_type.as_str())
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn list_entries_in_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        scope: Option<&EntityScope>,
    ) -> StoreResult<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, EntryRow>(
            r#"
            SELECT id, entity_type, entity_id, kind, amount, occurred_at, related_invoice_id
            FROM ledger_entries
            WHERE occurred_at >= $1
              AND occurred_at <= $2
              AND ($3::TEXT IS NULL OR entity_type = $3)
              AND ($4::BIGINT IS NULL OR entity_id = $4)
            ORDER BY occurred_at ASC, id ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(scope.map(|s| s.entity_type.as_str()))
        .bind(scope.and_then(|s| s.entity_id))
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }
}

#[async_trait]
impl SnapshotStore for PgStore {
    async fn upsert_snapshot(&self, snapshot: &BalanceSnapshot) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO balance_snapshots (entity_type, entity_id, balance, last_recalculated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (entity_type, entity_id)
            DO UPDATE SET
                balance = EXCLUDED.balance,
                last_recalculated_at = EXCLUDED.last_recalculated_at
            "#,
        )
        .bind(snapshot.entity_type.as_str())
        .bind(snapshot.entity_id)
        .bind(snapshot.balance)
        .bind(snapshot.last_recalculated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_snapshot(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> StoreResult<Option<BalanceSnapshot>> {
        let row = sqlx::query_as::<_, SnapshotRow>(
            r#"
            SELECT entity_type, entity_id, balance, last_recalculated_at
            FROM balance_snapshots
            WHERE entity_type = $1 AND entity_id = $2
            "#,
        )
        .bind(entity_type.as_str())
        .bind(entity_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(BalanceSnapshot::try_from).transpose()
    }

    async fn list_snapshots(&self, entity_type: EntityType) -> StoreResult<Vec<BalanceSnapshot>> {
        let rows = sqlx::query_as::<_, SnapshotRow>(
            r#"
            SELECT entity_type, entity_id, balance, last_recalculated_at
            FROM balance_snapshots
            WHERE entity_type = $1
            ORDER BY entity_id
            "#,
        )
        .bind(entity_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, (i64, String, String, i64, i64, Decimal, Decimal)>(
            r#"
            SELECT id, name, category, quantity, reorder_level, cost_price, sale_price
            FROM products
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, name, category, quantity, reorder_level, cost_price, sale_price)| Product {
                    id,
                    name,
                    category,
                    quantity,
                    reorder_level,
                    cost_price,
                    sale_price,
                },
            )
            .collect())
    }

    async fn list_invoices_in_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StoreResult<Vec<Invoice>> {
        let headers = sqlx::query_as::<_, InvoiceRow>(
            r#"
            SELECT id, customer_id, number, issued_at, due_date, total, paid_amount
            FROM invoices
            WHERE issued_at >= $1 AND issued_at <= $2
            ORDER BY id
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        self.with_lines(headers).await
    }

    async fn list_open_invoices(&self, as_of: NaiveDateTime) -> StoreResult<Vec<Invoice>> {
        let headers = sqlx::query_as::<_, InvoiceRow>(
            r#"
            SELECT id, customer_id, number, issued_at, due_date, total, paid_amount
            FROM invoices
            WHERE issued_at <= $1 AND total > paid_amount
            ORDER BY id
            "#,
        )
        .bind(as_of)
        .fetch_all(&self.pool)
        .await?;

        self.with_lines(headers).await
    }

    async fn list_expenses_in_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StoreResult<Vec<Expense>> {
        let rows = sqlx::query_as::<_, (i64, String, Decimal, NaiveDateTime, Option<i64>)>(
            r#"
            SELECT id, category, amount, occurred_at, cash_account_id
            FROM expenses
            WHERE occurred_at >= $1 AND occurred_at <= $2
            ORDER BY id
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, category, amount, occurred_at, cash_account_id)| Expense {
                id,
                category,
                amount,
                occurred_at,
                cash_account_id,
            })
            .collect())
    }
}
