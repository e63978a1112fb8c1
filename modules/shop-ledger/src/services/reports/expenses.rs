use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use super::calc::{growth, share_percent, top_n};
use super::{ReportEngine, ReportFilter};
use crate::error::LedgerResult;
use crate::models::{EntityType, Expense};
use crate::services::export::{Cell, Dataset, Tabular};
use crate::services::period_resolver::DateRange;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseCategory {
    pub category: String,
    pub count: usize,
    pub total: Decimal,
    pub share_percent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseBreakdown {
    pub range: DateRange,
    pub total: Decimal,
    pub previous_total: Decimal,
    pub growth: Decimal,
    /// Largest category first
    pub categories: Vec<ExpenseCategory>,
}

/// Expense amounts are positive magnitudes, grouped by category
pub fn build_expense_breakdown(
    range: DateRange,
    current: &[Expense],
    previous: &[Expense],
) -> ExpenseBreakdown {
    let mut groups: BTreeMap<&str, (usize, Decimal)> = BTreeMap::new();
    for expense in current {
        let group = groups
            .entry(expense.category.as_str())
            .or_insert((0, Decimal::ZERO));
        group.0 += 1;
        group.1 += expense.amount;
    }

    let total: Decimal = current.iter().map(|e| e.amount).sum();
    let previous_total: Decimal = previous.iter().map(|e| e.amount).sum();

    let categories: Vec<ExpenseCategory> = groups
        .into_iter()
        .map(|(category, (count, amount))| ExpenseCategory {
            category: category.to_string(),
            count,
            total: amount,
            share_percent: share_percent(amount, total),
        })
        .collect();
    let count = categories.len();

    ExpenseBreakdown {
        range,
        total,
        previous_total,
        growth: growth(total, previous_total),
        categories: top_n(categories, |c| c.total, count),
    }
}

impl Tabular for ExpenseBreakdown {
    fn to_dataset(&self) -> Dataset {
        let mut dataset = Dataset::new(
            "Expense breakdown",
            &["category", "count", "total", "share_percent"],
        );
        for c in &self.categories {
            dataset.push(vec![
                Cell::text(c.category.clone()),
                Cell::Integer(c.count as i64),
                Cell::Money(c.total),
                Cell::Percent(c.share_percent),
            ]);
        }
        dataset
    }
}

impl ReportEngine {
    /// Expenses in the window, narrowed to one cash account when scoped
    pub(crate) async fn scoped_expenses(&self, filter: &ReportFilter) -> LedgerResult<Vec<Expense>> {
        let scope = filter.scope_for(EntityType::CashAccount)?;
        let mut expenses = self
            .stores
            .catalog
            .list_expenses_in_range(filter.start(), filter.end())
            .await?;
        if let Some(account_id) = scope.and_then(|s| s.entity_id) {
            expenses.retain(|e| e.cash_account_id == Some(account_id));
        }
        Ok(expenses)
    }

    pub async fn expense_breakdown(&self, filter: &ReportFilter) -> LedgerResult<ExpenseBreakdown> {
        let current = self.scoped_expenses(filter).await?;
        let previous = self.scoped_expenses(&filter.previous()?).await?;
        Ok(build_expense_breakdown(filter.range(), &current, &previous))
    }
}
