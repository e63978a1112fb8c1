use rust_decimal::Decimal;
use serde::Serialize;

use super::calc::{growth, share_percent};
use super::{ReportEngine, ReportFilter};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Expense, Invoice, InvoiceLine};
use crate::services::export::{Cell, Dataset, Tabular};
use crate::services::period_resolver::DateRange;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProfitFigures {
    pub revenue: Decimal,
    pub cost_of_goods_sold: Decimal,
    pub gross_profit: Decimal,
    pub operating_expenses: Decimal,
    pub net_profit: Decimal,
}

impl ProfitFigures {
    /// Revenue is the invoiced total; cost of goods is per line at unit cost
    pub fn compute(invoices: &[Invoice], expenses: &[Expense]) -> Self {
        let revenue: Decimal = invoices.iter().map(|i| i.total).sum();
        let cost_of_goods_sold: Decimal = invoices
            .iter()
            .flat_map(|i| i.lines.iter())
            .map(InvoiceLine::cost)
            .sum();
        let operating_expenses: Decimal = expenses.iter().map(|e| e.amount).sum();
        let gross_profit = revenue - cost_of_goods_sold;

        Self {
            revenue,
            cost_of_goods_sold,
            gross_profit,
            operating_expenses,
            net_profit: gross_profit - operating_expenses,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfitAndLoss {
    pub range: DateRange,
    #[serde(flatten)]
    pub figures: ProfitFigures,
    pub gross_margin: Decimal,
    pub net_margin: Decimal,
    pub previous_net_profit: Decimal,
    pub net_profit_growth: Decimal,
}

pub fn build_profit_and_loss(
    range: DateRange,
    current: ProfitFigures,
    previous: ProfitFigures,
) -> ProfitAndLoss {
    ProfitAndLoss {
        range,
        figures: current,
        gross_margin: share_percent(current.gross_profit, current.revenue),
        net_margin: share_percent(current.net_profit, current.revenue),
        previous_net_profit: previous.net_profit,
        net_profit_growth: growth(current.net_profit, previous.net_profit),
    }
}

impl Tabular for ProfitAndLoss {
    fn to_dataset(&self) -> Dataset {
        let f = &self.figures;
        let mut dataset = Dataset::new("Profit and loss", &["line", "amount"]);
        let lines = [
            ("Revenue", Cell::Money(f.revenue)),
            ("Cost of goods sold", Cell::Money(f.cost_of_goods_sold)),
            ("Gross profit", Cell::Money(f.gross_profit)),
            ("Operating expenses", Cell::Money(f.operating_expenses)),
            ("Net profit", Cell::Money(f.net_profit)),
            ("Gross margin %", Cell::Percent(self.gross_margin)),
            ("Net margin %", Cell::Percent(self.net_margin)),
            ("Previous period net profit", Cell::Money(self.previous_net_profit)),
            ("Net profit growth %", Cell::Percent(self.net_profit_growth)),
        ];
        for (line, amount) in lines {
            dataset.push(vec![Cell::text(line), amount]);
        }
        dataset
    }
}

impl ReportEngine {
    async fn profit_figures(&self, filter: &ReportFilter) -> LedgerResult<ProfitFigures> {
        let invoices = self.scoped_invoices(filter).await?;
        let expenses = self
            .stores
            .catalog
            .list_expenses_in_range(filter.start(), filter.end())
            .await?;
        Ok(ProfitFigures::compute(&invoices, &expenses))
    }

    /// Business-wide statement; scoped filters are rejected
    pub async fn profit_and_loss(&self, filter: &ReportFilter) -> LedgerResult<ProfitAndLoss> {
        if let Some(scope) = filter.entity_scope() {
            return Err(LedgerError::InvalidArgument(format!(
                "profit and loss cannot be scoped to a {}",
                scope.entity_type
            )));
        }

        let current = self.profit_figures(filter).await?;
        let previous = self.profit_figures(&filter.previous()?).await?;
        Ok(build_profit_and_loss(filter.range(), current, previous))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::period_resolver::{end_of_day, start_of_day};
    use chrono::NaiveDate;

    fn invoice(total: i64, lines: Vec<InvoiceLine>) -> Invoice {
        let day = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
        Invoice {
            id: 1,
            customer_id: 1,
            number: "INV-1".to_string(),
            issued_at: day.and_hms_opt(12, 0, 0).unwrap(),
            due_date: day,
            total: Decimal::from(total),
            paid_amount: Decimal::ZERO,
            lines,
        }
    }

    fn expense(amount: i64) -> Expense {
        Expense {
            id: 1,
            category: "Rent".to_string(),
            amount: Decimal::from(amount),
            occurred_at: NaiveDate::from_ymd_opt(2024, 4, 3)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            cash_account_id: Some(1),
        }
    }

    fn range() -> DateRange {
        let d = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        DateRange::new(start_of_day(d), end_of_day(d)).unwrap()
    }

    #[test]
    fn test_profit_figures() {
        let line = InvoiceLine {
            product_id: 1,
            quantity: 10,
            unit_price: Decimal::from(20),
            unit_cost: Decimal::from(8),
        };
        let figures = ProfitFigures::compute(&[invoice(200, vec![line])], &[expense(50)]);

        assert_eq!(figures.cost_of_goods_sold, Decimal::from(80));
        assert_eq!(figures.gross_profit, Decimal::from(120));
        assert_eq!(figures.net_profit, Decimal::from(70));
    }

    #[test]
    fn test_margins_and_growth() {
        let current = ProfitFigures::compute(&[invoice(200, vec![])], &[expense(50)]);
        let previous = ProfitFigures::compute(&[invoice(100, vec![])], &[]);

        let pnl = build_profit_and_loss(range(), current, previous);

        assert_eq!(pnl.gross_margin, Decimal::from(100));
        assert_eq!(pnl.net_margin, Decimal::from(75));
        assert_eq!(pnl.net_profit_growth, Decimal::from(50));
    }

    #[test]
    fn test_empty_period_has_zero_margins() {
        let zero = ProfitFigures::compute(&[], &[]);
        let pnl = build_profit_and_loss(range(), zero, zero);
        assert_eq!(pnl.gross_margin, Decimal::ZERO);
        assert_eq!(pnl.net_profit_growth, Decimal::ZERO);
        assert_eq!(pnl.to_dataset().rows.len(), 9);
    }
}
