//! Receivables and payables
//!
//! Debt aging works from open invoices as of the end of the filter window.
//! Debt summary reads the cached balance snapshots, so it is only as fresh as
//! the last recalculation; `oldest_recalculated_at` says how stale it may be.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::calc::{top_n, AgingBucket};
use super::{ReportEngine, ReportFilter};
use crate::error::LedgerResult;
use crate::models::{BalanceSnapshot, Entity, EntityType, Invoice};
use crate::services::export::{Cell, Dataset, Tabular};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgedInvoice {
    pub invoice_id: i64,
    pub number: String,
    pub customer_id: i64,
    pub customer: String,
    pub due_date: NaiveDate,
    pub days_overdue: i64,
    pub outstanding: Decimal,
    pub bucket: AgingBucket,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketTotal {
    pub bucket: AgingBucket,
    pub count: usize,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerDebt {
    pub customer_id: i64,
    pub customer: String,
    pub current: Decimal,
    pub overdue: Decimal,
    pub critical: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebtAging {
    pub as_of: NaiveDate,
    pub total_outstanding: Decimal,
    /// Always current, overdue, critical, in that order
    pub buckets: Vec<BucketTotal>,
    pub by_customer: Vec<CustomerDebt>,
    /// Most overdue first
    pub invoices: Vec<AgedInvoice>,
}

pub fn build_debt_aging(
    as_of: NaiveDate,
    open_invoices: &[Invoice],
    names: &HashMap<i64, String>,
) -> DebtAging {
    let name_of = |id: i64| {
        names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("Customer #{}", id))
    };

    let mut invoices: Vec<AgedInvoice> = open_invoices
        .iter()
        .filter(|i| i.outstanding() > Decimal::ZERO)
        .map(|i| {
            let days_overdue = (as_of - i.due_date).num_days();
            AgedInvoice {
                invoice_id: i.id,
                number: i.number.clone(),
                customer_id: i.customer_id,
                customer: name_of(i.customer_id),
                due_date: i.due_date,
                days_overdue,
                outstanding: i.outstanding(),
                bucket: AgingBucket::from_days_overdue(days_overdue),
            }
        })
        .collect();
    invoices.sort_by(|a, b| {
        b.days_overdue
            .cmp(&a.days_overdue)
            .then_with(|| a.invoice_id.cmp(&b.invoice_id))
    });

    let mut buckets: BTreeMap<AgingBucket, (usize, Decimal)> = [
        AgingBucket::Current,
        AgingBucket::Overdue,
        AgingBucket::Critical,
    ]
    .into_iter()
    .map(|b| (b, (0, Decimal::ZERO)))
    .collect();
    let mut customers: BTreeMap<i64, CustomerDebt> = BTreeMap::new();

    for invoice in &invoices {
        let bucket = buckets
            .entry(invoice.bucket)
            .or_insert((0, Decimal::ZERO));
        bucket.0 += 1;
        bucket.1 += invoice.outstanding;

        let debt = customers
            .entry(invoice.customer_id)
            .or_insert_with(|| CustomerDebt {
                customer_id: invoice.customer_id,
                customer: invoice.customer.clone(),
                current: Decimal::ZERO,
                overdue: Decimal::ZERO,
                critical: Decimal::ZERO,
                total: Decimal::ZERO,
            });
        match invoice.bucket {
            AgingBucket::Current => debt.current += invoice.outstanding,
            AgingBucket::Overdue => debt.overdue += invoice.outstanding,
            AgingBucket::Critical => debt.critical += invoice.outstanding,
        }
        debt.total += invoice.outstanding;
    }

    let by_customer: Vec<CustomerDebt> = customers.into_values().collect();
    let count = by_customer.len();

    DebtAging {
        as_of,
        total_outstanding: invoices.iter().map(|i| i.outstanding).sum(),
        buckets: buckets
            .into_iter()
            .map(|(bucket, (count, amount))| BucketTotal {
                bucket,
                count,
                amount,
            })
            .collect(),
        by_customer: top_n(by_customer, |c| c.total, count),
        invoices,
    }
}

impl Tabular for DebtAging {
    fn to_dataset(&self) -> Dataset {
        let mut dataset = Dataset::new(
            format!("Debt aging as of {}", self.as_of),
            &[
                "invoice",
                "customer",
                "due_date",
                "days_overdue",
                "bucket",
                "outstanding",
            ],
        );
        for i in &self.invoices {
            dataset.push(vec![
                Cell::text(i.number.clone()),
                Cell::text(i.customer.clone()),
                Cell::Date(i.due_date),
                Cell::Integer(i.days_overdue),
                Cell::text(i.bucket.as_str()),
                Cell::Money(i.outstanding),
            ]);
        }
        dataset
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartyBalance {
    pub entity_id: i64,
    pub name: String,
    pub balance: Decimal,
    pub last_recalculated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebtSummary {
    /// Sum of positive customer balances
    pub receivables: Decimal,
    /// Sum of positive supplier balances
    pub payables: Decimal,
    pub net_position: Decimal,
    pub debtor_count: usize,
    pub creditor_count: usize,
    pub top_debtors: Vec<PartyBalance>,
    pub top_creditors: Vec<PartyBalance>,
    pub oldest_recalculated_at: Option<NaiveDateTime>,
    /// Entities that have never been recalculated
    pub missing_snapshots: usize,
}

fn owing(snapshots: &[BalanceSnapshot], entities: &[Entity]) -> Vec<PartyBalance> {
    let names: HashMap<i64, &str> = entities.iter().map(|e| (e.id, e.name.as_str())).collect();
    let mut parties: Vec<PartyBalance> = snapshots
        .iter()
        .filter(|s| s.balance > Decimal::ZERO)
        .map(|s| PartyBalance {
            entity_id: s.entity_id,
            name: names
                .get(&s.entity_id)
                .map(|n| n.to_string())
                .unwrap_or_else(|| format!("{} #{}", s.entity_type, s.entity_id)),
            balance: s.balance,
            last_recalculated_at: s.last_recalculated_at,
        })
        .collect();
    parties.sort_by_key(|p| p.entity_id);
    parties
}

fn missing(snapshots: &[BalanceSnapshot], entities: &[Entity]) -> usize {
    entities
        .iter()
        .filter(|e| !snapshots.iter().any(|s| s.entity_id == e.id))
        .count()
}

pub fn build_debt_summary(
    customer_snapshots: &[BalanceSnapshot],
    supplier_snapshots: &[BalanceSnapshot],
    customers: &[Entity],
    suppliers: &[Entity],
    limit: usize,
) -> DebtSummary {
    let debtors = owing(customer_snapshots, customers);
    let creditors = owing(supplier_snapshots, suppliers);

    let receivables: Decimal = debtors.iter().map(|p| p.balance).sum();
    let payables: Decimal = creditors.iter().map(|p| p.balance).sum();

    DebtSummary {
        receivables,
        payables,
        net_position: receivables - payables,
        debtor_count: debtors.len(),
        creditor_count: creditors.len(),
        top_debtors: top_n(debtors, |p| p.balance, limit),
        top_creditors: top_n(creditors, |p| p.balance, limit),
        oldest_recalculated_at: customer_snapshots
            .iter()
            .chain(supplier_snapshots)
            .map(|s| s.last_recalculated_at)
            .min(),
        missing_snapshots: missing(customer_snapshots, customers)
            + missing(supplier_snapshots, suppliers),
    }
}

impl Tabular for DebtSummary {
    fn to_dataset(&self) -> Dataset {
        let mut dataset = Dataset::new(
            "Debt summary",
            &["side", "entity_id", "name", "balance", "last_recalculated_at"],
        );
        let sides = [
            ("receivable", &self.top_debtors),
            ("payable", &self.top_creditors),
        ];
        for (side, parties) in sides {
            for p in parties {
                dataset.push(vec![
                    Cell::text(side),
                    Cell::Integer(p.entity_id),
                    Cell::text(p.name.clone()),
                    Cell::Money(p.balance),
                    Cell::text(p.last_recalculated_at.format("%Y-%m-%d %H:%M:%S").to_string()),
                ]);
            }
        }
        dataset
    }
}

impl ReportEngine {
    pub async fn debt_aging(&self, filter: &ReportFilter) -> LedgerResult<DebtAging> {
        let scope = filter.scope_for(EntityType::Customer)?;
        let mut open = self
            .stores
            .catalog
            .list_open_invoices(filter.end())
            .await?;
        if let Some(scope) = scope {
            open.retain(|i| scope.matches(EntityType::Customer, i.customer_id));
        }
        let names = self.customer_names().await?;
        Ok(build_debt_aging(filter.end().date(), &open, &names))
    }

    pub async fn debt_summary(&self, limit: Option<usize>) -> LedgerResult<DebtSummary> {
        let snapshots = &self.stores.snapshots;
        let ledger = &self.stores.ledger;

        let customer_snapshots = snapshots.list_snapshots(EntityType::Customer).await?;
        let supplier_snapshots = snapshots.list_snapshots(EntityType::Supplier).await?;
        let customers = ledger.list_entities(EntityType::Customer).await?;
        let suppliers = ledger.list_entities(EntityType::Supplier).await?;

        let summary = build_debt_summary(
            &customer_snapshots,
            &supplier_snapshots,
            &customers,
            &suppliers,
            self.limit(limit),
        );
        if summary.missing_snapshots > 0 {
            tracing::warn!(
                missing = summary.missing_snapshots,
                "Debt summary includes entities without a balance snapshot"
            );
        }
        Ok(summary)
    }
}
