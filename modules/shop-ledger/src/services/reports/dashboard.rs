use rust_decimal::Decimal;
use serde::Serialize;

use super::{ReportEngine, ReportFilter};
use crate::error::LedgerResult;
use crate::services::export::{Cell, Dataset, Tabular};
use crate::services::period_resolver::DateRange;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub range: DateRange,
    pub revenue: Decimal,
    pub invoice_count: usize,
    pub revenue_growth: Decimal,
    pub cash_net: Decimal,
    pub cash_closing_balance: Decimal,
    pub receivables: Decimal,
    pub payables: Decimal,
    pub low_stock: usize,
    pub out_of_stock: usize,
}

impl Tabular for Dashboard {
    fn to_dataset(&self) -> Dataset {
        let mut dataset = Dataset::new("Dashboard", &["metric", "value"]);
        let rows = [
            ("Revenue", Cell::Money(self.revenue)),
            ("Invoices", Cell::Integer(self.invoice_count as i64)),
            ("Revenue growth %", Cell::Percent(self.revenue_growth)),
            ("Net cash flow", Cell::Money(self.cash_net)),
            ("Cash on hand", Cell::Money(self.cash_closing_balance)),
            ("Receivables", Cell::Money(self.receivables)),
            ("Payables", Cell::Money(self.payables)),
            ("Low stock items", Cell::Integer(self.low_stock as i64)),
            ("Out of stock items", Cell::Integer(self.out_of_stock as i64)),
        ];
        for (metric, value) in rows {
            dataset.push(vec![Cell::text(metric), value]);
        }
        dataset
    }
}

impl ReportEngine {
    /// Headline figures from the sales, cash-flow, debt, and inventory reports
    ///
    /// Entity scope does not apply here; the dashboard is always business-wide.
    pub async fn dashboard(
        &self,
        filter: &ReportFilter,
        limit: Option<usize>,
    ) -> LedgerResult<Dashboard> {
        let unscoped = ReportFilter::new(filter.start(), filter.end(), filter.period(), None)?;

        let sales = self.sales_summary(&unscoped).await?;
        let cash = self.cash_flow_summary(&unscoped).await?;
        let debt = self.debt_summary(limit).await?;
        let inventory = self.inventory_summary().await?;

        Ok(Dashboard {
            range: unscoped.range(),
            revenue: sales.revenue,
            invoice_count: sales.invoice_count,
            revenue_growth: sales.revenue_growth,
            cash_net: cash.net,
            cash_closing_balance: cash.closing_balance,
            receivables: debt.receivables,
            payables: debt.payables,
            low_stock: inventory.low_stock,
            out_of_stock: inventory.out_of_stock,
        })
    }
}
