//! Cash-flow summary over cash-account ledger entries
//!
//! Positive amounts are inflows and negative amounts are outflows. The opening
//! balance is the signed sum of every cash entry before the window, so
//! `closing = opening + net` always holds.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::{ReportEngine, ReportFilter};
use crate::error::LedgerResult;
use crate::models::{EntityScope, EntityType, EntryKind, LedgerEntry};
use crate::services::export::{Cell, Dataset, Tabular};
use crate::services::period_resolver::{start_of_day, DateRange, Granularity};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Flow {
    pub inflow: Decimal,
    pub outflow: Decimal,
    pub net: Decimal,
}

impl Flow {
    fn add(&mut self, amount: Decimal) {
        if amount.is_sign_negative() {
            self.outflow += -amount;
        } else {
            self.inflow += amount;
        }
        self.net += amount;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountFlow {
    pub account_id: i64,
    pub name: String,
    #[serde(flatten)]
    pub flow: Flow,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KindFlow {
    pub kind: EntryKind,
    #[serde(flatten)]
    pub flow: Flow,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowPoint {
    pub bucket_start: NaiveDate,
    pub label: String,
    #[serde(flatten)]
    pub flow: Flow,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashFlowSummary {
    pub range: DateRange,
    pub period: Granularity,
    pub opening_balance: Decimal,
    pub inflow: Decimal,
    pub outflow: Decimal,
    pub net: Decimal,
    pub closing_balance: Decimal,
    pub by_account: Vec<AccountFlow>,
    pub by_kind: Vec<KindFlow>,
    pub series: Vec<FlowPoint>,
}

/// `opening_entries` precede the window; `entries` fall inside it
pub fn build_cash_flow(
    range: DateRange,
    period: Granularity,
    opening_entries: &[LedgerEntry],
    entries: &[LedgerEntry],
    account_names: &HashMap<i64, String>,
) -> CashFlowSummary {
    let opening_balance: Decimal = opening_entries.iter().map(|e| e.amount).sum();

    let mut total = Flow::default();
    let mut accounts: BTreeMap<i64, Flow> = BTreeMap::new();
    let mut kinds: BTreeMap<EntryKind, Flow> = BTreeMap::new();
    let mut buckets: BTreeMap<NaiveDate, Flow> = period
        .buckets(&range)
        .into_iter()
        .map(|start| (start, Flow::default()))
        .collect();

    for entry in entries {
        total.add(entry.amount);
        accounts.entry(entry.entity_id).or_default().add(entry.amount);
        kinds.entry(entry.kind).or_default().add(entry.amount);
        buckets
            .entry(period.bucket_start(entry.occurred_at.date()))
            .or_default()
            .add(entry.amount);
    }

    CashFlowSummary {
        range,
        period,
        opening_balance,
        inflow: total.inflow,
        outflow: total.outflow,
        net: total.net,
        closing_balance: opening_balance + total.net,
        by_account: accounts
            .into_iter()
            .map(|(account_id, flow)| AccountFlow {
                account_id,
                name: account_names
                    .get(&account_id)
                    .cloned()
                    .unwrap_or_else(|| format!("Account #{}", account_id)),
                flow,
            })
            .collect(),
        by_kind: kinds
            .into_iter()
            .map(|(kind, flow)| KindFlow { kind, flow })
            .collect(),
        series: buckets
            .into_iter()
            .map(|(start, flow)| FlowPoint {
                bucket_start: start,
                label: period.label(start),
                flow,
            })
            .collect(),
    }
}

impl Tabular for CashFlowSummary {
    fn to_dataset(&self) -> Dataset {
        let mut dataset = Dataset::new(
            format!("Cash flow ({})", self.period),
            &["period", "inflow", "outflow", "net"],
        );
        dataset.push(vec![
            Cell::text("Opening balance"),
            Cell::Empty,
            Cell::Empty,
            Cell::Money(self.opening_balance),
        ]);
        for point in &self.series {
            dataset.push(vec![
                Cell::text(point.label.clone()),
                Cell::Money(point.flow.inflow),
                Cell::Money(point.flow.outflow),
                Cell::Money(point.flow.net),
            ]);
        }
        dataset.push(vec![
            Cell::text("Closing balance"),
            Cell::Money(self.inflow),
            Cell::Money(self.outflow),
            Cell::Money(self.closing_balance),
        ]);
        dataset
    }
}

/// Earliest instant the opening balance looks back to
fn ledger_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1900, 1, 1)
        .map(start_of_day)
        .unwrap_or_default()
}

impl ReportEngine {
    pub async fn cash_flow_summary(&self, filter: &ReportFilter) -> LedgerResult<CashFlowSummary> {
        let scope = filter
            .scope_for(EntityType::CashAccount)?
            .unwrap_or_else(|| EntityScope::of_type(EntityType::CashAccount));

        let entries = self
            .stores
            .ledger
            .list_entries_in_range(filter.start(), filter.end(), Some(&scope))
            .await?;

        let opening_end = filter.start() - Duration::milliseconds(1);
        let opening_entries = self
            .stores
            .ledger
            .list_entries_in_range(ledger_epoch(), opening_end, Some(&scope))
            .await?;

        let account_names: HashMap<i64, String> = self
            .stores
            .ledger
            .list_entities(EntityType::CashAccount)
            .await?
            .into_iter()
            .map(|e| (e.id, e.name))
            .collect();

        Ok(build_cash_flow(
            filter.range(),
            filter.period(),
            &opening_entries,
            &entries,
            &account_names,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::period_resolver::end_of_day;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn entry(id: i64, account: i64, kind: EntryKind, amount: i64, d: u32) -> LedgerEntry {
        LedgerEntry {
            id,
            entity_type: EntityType::CashAccount,
            entity_id: account,
            kind,
            amount: Decimal::from(amount),
            occurred_at: day(d).and_hms_opt(9, 0, 0).unwrap(),
            related_invoice_id: None,
        }
    }

    fn range() -> DateRange {
        DateRange::new(start_of_day(day(10)), end_of_day(day(12))).unwrap()
    }

    #[test]
    fn test_closing_is_opening_plus_net() {
        let opening = vec![entry(1, 1, EntryKind::Adjustment, 500, 1)];
        let entries = vec![
            entry(2, 1, EntryKind::Payment, 200, 10),
            entry(3, 1, EntryKind::Expense, -80, 11),
            entry(4, 2, EntryKind::Withdrawal, -20, 12),
        ];

        let summary = build_cash_flow(
            range(),
            Granularity::Daily,
            &opening,
            &entries,
            &HashMap::new(),
        );

        assert_eq!(summary.opening_balance, Decimal::from(500));
        assert_eq!(summary.inflow, Decimal::from(200));
        assert_eq!(summary.outflow, Decimal::from(100));
        assert_eq!(summary.net, Decimal::from(100));
        assert_eq!(summary.closing_balance, Decimal::from(600));
    }

    #[test]
    fn test_breakdowns_partition_the_window() {
        let entries = vec![
            entry(1, 1, EntryKind::Payment, 200, 10),
            entry(2, 2, EntryKind::Payment, 50, 10),
            entry(3, 1, EntryKind::Expense, -80, 12),
        ];
        let names = HashMap::from([(1, "Till".to_string())]);

        let summary = build_cash_flow(range(), Granularity::Daily, &[], &entries, &names);

        assert_eq!(summary.by_account.len(), 2);
        assert_eq!(summary.by_account[0].name, "Till");
        assert_eq!(summary.by_account[1].name, "Account #2");

        let account_net: Decimal = summary.by_account.iter().map(|a| a.flow.net).sum();
        let kind_net: Decimal = summary.by_kind.iter().map(|k| k.flow.net).sum();
        let series_net: Decimal = summary.series.iter().map(|p| p.flow.net).sum();
        assert_eq!(account_net, summary.net);
        assert_eq!(kind_net, summary.net);
        assert_eq!(series_net, summary.net);

        assert_eq!(summary.series.len(), 3);
        assert_eq!(summary.series[1].flow, Flow::default());
    }

    #[test]
    fn test_empty_window_keeps_opening_balance() {
        let opening = vec![entry(1, 1, EntryKind::Adjustment, 75, 1)];
        let summary = build_cash_flow(range(), Granularity::Weekly, &opening, &[], &HashMap::new());

        assert_eq!(summary.net, Decimal::ZERO);
        assert_eq!(summary.closing_balance, Decimal::from(75));
        assert!(summary.by_kind.is_empty());
    }
}
