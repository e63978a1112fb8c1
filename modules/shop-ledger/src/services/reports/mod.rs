//! Report Query Engine
//!
//! Read-only aggregates over the ledger and catalog for a validated
//! `ReportFilter`. Each report has a pure `build_*` function that does the
//! arithmetic and an async `ReportEngine` method that loads the inputs.
//! Amounts are never rounded here; rounding happens at display/export time.

pub mod calc;
pub mod cash_flow;
pub mod dashboard;
pub mod debt;
pub mod expenses;
pub mod filter;
pub mod inventory;
pub mod sales;
pub mod statements;

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{LedgerError, LedgerResult};
use crate::repos::Stores;
use crate::services::export::{Dataset, ExportError, ExportFormat, Tabular};

pub use calc::{AgingBucket, StockStatus};
pub use cash_flow::CashFlowSummary;
pub use dashboard::Dashboard;
pub use debt::{DebtAging, DebtSummary};
pub use expenses::ExpenseBreakdown;
pub use filter::{ReportFilter, ReportQuery};
pub use inventory::InventorySummary;
pub use sales::{CategoryBreakdown, SalesSummary, SalesTrend, TopCustomers, TopProducts};
pub use statements::ProfitAndLoss;

/// Default row cap for ranked reports
pub const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    SalesSummary,
    SalesTrend,
    SalesByCategory,
    TopProducts,
    TopCustomers,
    Inventory,
    CashFlow,
    Expenses,
    DebtAging,
    DebtSummary,
    ProfitAndLoss,
    Dashboard,
}

impl ReportKind {
    pub const ALL: [ReportKind; 12] = [
        ReportKind::SalesSummary,
        ReportKind::SalesTrend,
        ReportKind::SalesByCategory,
        ReportKind::TopProducts,
        ReportKind::TopCustomers,
        ReportKind::Inventory,
        ReportKind::CashFlow,
        ReportKind::Expenses,
        ReportKind::DebtAging,
        ReportKind::DebtSummary,
        ReportKind::ProfitAndLoss,
        ReportKind::Dashboard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::SalesSummary => "sales-summary",
            ReportKind::SalesTrend => "sales-trend",
            ReportKind::SalesByCategory => "sales-by-category",
            ReportKind::TopProducts => "top-products",
            ReportKind::TopCustomers => "top-customers",
            ReportKind::Inventory => "inventory",
            ReportKind::CashFlow => "cash-flow",
            ReportKind::Expenses => "expenses",
            ReportKind::DebtAging => "debt-aging",
            ReportKind::DebtSummary => "debt-summary",
            ReportKind::ProfitAndLoss => "profit-and-loss",
            ReportKind::Dashboard => "dashboard",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_ascii_lowercase().replace('_', "-");
        ReportKind::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| LedgerError::InvalidArgument(format!("unknown report: {}", s)))
    }
}

/// Any report result, serialized as the report itself
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReportOutput {
    SalesSummary(SalesSummary),
    SalesTrend(SalesTrend),
    SalesByCategory(CategoryBreakdown),
    TopProducts(TopProducts),
    TopCustomers(TopCustomers),
    Inventory(InventorySummary),
    CashFlow(CashFlowSummary),
    Expenses(ExpenseBreakdown),
    DebtAging(DebtAging),
    DebtSummary(DebtSummary),
    ProfitAndLoss(ProfitAndLoss),
    Dashboard(Dashboard),
}

impl Tabular for ReportOutput {
    fn to_dataset(&self) -> Dataset {
        match self {
            ReportOutput::SalesSummary(r) => r.to_dataset(),
            ReportOutput::SalesTrend(r) => r.to_dataset(),
            ReportOutput::SalesByCategory(r) => r.to_dataset(),
            ReportOutput::TopProducts(r) => r.to_dataset(),
            ReportOutput::TopCustomers(r) => r.to_dataset(),
            ReportOutput::Inventory(r) => r.to_dataset(),
            ReportOutput::CashFlow(r) => r.to_dataset(),
            ReportOutput::Expenses(r) => r.to_dataset(),
            ReportOutput::DebtAging(r) => r.to_dataset(),
            ReportOutput::DebtSummary(r) => r.to_dataset(),
            ReportOutput::ProfitAndLoss(r) => r.to_dataset(),
            ReportOutput::Dashboard(r) => r.to_dataset(),
        }
    }
}

#[derive(Clone)]
pub struct ReportEngine {
    stores: Stores,
    default_limit: usize,
}

impl ReportEngine {
    pub fn new(stores: Stores) -> Self {
        Self::with_default_limit(stores, DEFAULT_LIMIT)
    }

    pub fn with_default_limit(stores: Stores, default_limit: usize) -> Self {
        Self {
            stores,
            default_limit: default_limit.max(1),
        }
    }

    pub fn default_limit(&self) -> usize {
        self.default_limit
    }

    pub(crate) fn limit(&self, requested: Option<usize>) -> usize {
        requested.filter(|n| *n > 0).unwrap_or(self.default_limit)
    }

    /// Run a report by kind
    pub async fn run(
        &self,
        kind: ReportKind,
        filter: &ReportFilter,
        limit: Option<usize>,
    ) -> LedgerResult<ReportOutput> {
        let output = match kind {
            ReportKind::SalesSummary => ReportOutput::SalesSummary(self.sales_summary(filter).await?),
            ReportKind::SalesTrend => ReportOutput::SalesTrend(self.sales_trend(filter).await?),
            ReportKind::SalesByCategory => {
                ReportOutput::SalesByCategory(self.sales_by_category(filter).await?)
            }
            ReportKind::TopProducts => {
                ReportOutput::TopProducts(self.top_products(filter, limit).await?)
            }
            ReportKind::TopCustomers => {
                ReportOutput::TopCustomers(self.top_customers(filter, limit).await?)
            }
            ReportKind::Inventory => ReportOutput::Inventory(self.inventory_summary().await?),
            ReportKind::CashFlow => ReportOutput::CashFlow(self.cash_flow_summary(filter).await?),
            ReportKind::Expenses => ReportOutput::Expenses(self.expense_breakdown(filter).await?),
            ReportKind::DebtAging => ReportOutput::DebtAging(self.debt_aging(filter).await?),
            ReportKind::DebtSummary => {
                ReportOutput::DebtSummary(self.debt_summary(limit).await?)
            }
            ReportKind::ProfitAndLoss => {
                ReportOutput::ProfitAndLoss(self.profit_and_loss(filter).await?)
            }
            ReportKind::Dashboard => ReportOutput::Dashboard(self.dashboard(filter, limit).await?),
        };

        tracing::debug!(report = %kind, start = %filter.start(), end = %filter.end(), "Report computed");
        Ok(output)
    }

    pub async fn dataset(
        &self,
        kind: ReportKind,
        filter: &ReportFilter,
        limit: Option<usize>,
    ) -> LedgerResult<Dataset> {
        Ok(self.run(kind, filter, limit).await?.to_dataset())
    }

    /// Run a report and serialize it with the adapter for `format`
    pub async fn export(
        &self,
        kind: ReportKind,
        format: ExportFormat,
        filter: &ReportFilter,
        limit: Option<usize>,
    ) -> Result<Vec<u8>, ExportError> {
        let dataset = self.dataset(kind, filter, limit).await?;
        if dataset.rows.is_empty() {
            tracing::warn!(report = %kind, start = %filter.start(), end = %filter.end(), "Exporting empty report");
        }
        let bytes = format.adapter().export(&dataset)?;
        tracing::info!(
            report = %kind,
            format = %format,
            rows = dataset.rows.len(),
            bytes = bytes.len(),
            "Report exported"
        );
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_kind_parsing() {
        assert_eq!("sales-summary".parse::<ReportKind>().unwrap(), ReportKind::SalesSummary);
        assert_eq!("PROFIT_AND_LOSS".parse::<ReportKind>().unwrap(), ReportKind::ProfitAndLoss);
        assert!("balance-sheet".parse::<ReportKind>().is_err());
    }

    #[test]
    fn test_report_kind_round_trips_every_name() {
        for kind in ReportKind::ALL {
            assert_eq!(kind.as_str().parse::<ReportKind>().unwrap(), kind);
        }
    }
}
