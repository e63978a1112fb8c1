//! Shared report arithmetic: growth, shares, rankings, aging and stock rules

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Percentage change from `previous` to `current`; zero when `previous` is zero
pub fn growth(current: Decimal, previous: Decimal) -> Decimal {
    if previous.is_zero() {
        return Decimal::ZERO;
    }
    (current - previous) / previous * HUNDRED
}

/// `part` as a percentage of `whole`; zero when `whole` is zero
pub fn share_percent(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    part / whole * HUNDRED
}

/// Rounded copy for display and export only
pub fn display_percent(value: Decimal) -> Decimal {
    value.round_dp(2)
}

/// Keep the `limit` items with the highest metric
///
/// The sort is stable, so equal metrics keep their incoming (id) order.
pub fn top_n<T, F>(mut items: Vec<T>, metric: F, limit: usize) -> Vec<T>
where
    F: Fn(&T) -> Decimal,
{
    items.sort_by(|a, b| metric(b).cmp(&metric(a)));
    items.truncate(limit);
    items
}

/// Debt aging classification by days past due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgingBucket {
    Current,
    Overdue,
    Critical,
}

impl AgingBucket {
    /// `<= 30` current, `31..=90` overdue, `> 90` critical
    pub fn from_days_overdue(days_overdue: i64) -> Self {
        if days_overdue <= 0 {
            AgingBucket::Current
        } else if days_overdue > 90 {
            AgingBucket::Critical
        } else if days_overdue > 30 {
            AgingBucket::Overdue
        } else {
            AgingBucket::Current
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgingBucket::Current => "current",
            AgingBucket::Overdue => "overdue",
            AgingBucket::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    OutOfStock,
    LowStock,
    InStock,
}

impl StockStatus {
    /// Non-positive stock counts as out of stock
    pub fn classify(quantity: i64, reorder_level: i64) -> Self {
        if quantity <= 0 {
            StockStatus::OutOfStock
        } else if quantity <= reorder_level {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::OutOfStock => "out_of_stock",
            StockStatus::LowStock => "low_stock",
            StockStatus::InStock => "in_stock",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growth_zero_previous_is_zero() {
        assert_eq!(growth(Decimal::from(100), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(growth(Decimal::ZERO, Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_growth_percentages() {
        assert_eq!(growth(Decimal::from(150), Decimal::from(100)), Decimal::from(50));
        assert_eq!(growth(Decimal::from(50), Decimal::from(100)), Decimal::from(-50));
    }

    #[test]
    fn test_share_percent_and_display_rounding() {
        let share = share_percent(Decimal::ONE, Decimal::from(3));
        assert_eq!(display_percent(share), Decimal::new(3333, 2));
        assert_eq!(share_percent(Decimal::ONE, Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_top_n_is_stable_on_ties() {
        let items = vec![(1, 10), (2, 30), (3, 10), (4, 30), (5, 5)];
        let top = top_n(items, |(_, v)| Decimal::from(*v), 3);
        assert_eq!(top, vec![(2, 30), (4, 30), (1, 10)]);
    }

    #[test]
    fn test_top_n_limit_larger_than_input() {
        let top = top_n(vec![(1, 1)], |(_, v)| Decimal::from(*v), 10);
        assert_eq!(top.len(), 1);
    }

    #[test]
    fn test_aging_boundaries() {
        assert_eq!(AgingBucket::from_days_overdue(-5), AgingBucket::Current);
        assert_eq!(AgingBucket::from_days_overdue(0), AgingBucket::Current);
        assert_eq!(AgingBucket::from_days_overdue(30), AgingBucket::Current);
        assert_eq!(AgingBucket::from_days_overdue(31), AgingBucket::Overdue);
        assert_eq!(AgingBucket::from_days_overdue(90), AgingBucket::Overdue);
        assert_eq!(AgingBucket::from_days_overdue(91), AgingBucket::Critical);
    }

    #[test]
    fn test_stock_boundaries() {
        assert_eq!(StockStatus::classify(5, 5), StockStatus::LowStock);
        assert_eq!(StockStatus::classify(6, 5), StockStatus::InStock);
        assert_eq!(StockStatus::classify(0, 5), StockStatus::OutOfStock);
        assert_eq!(StockStatus::classify(0, 0), StockStatus::OutOfStock);
        assert_eq!(StockStatus::classify(1, 0), StockStatus::InStock);
        // Negative stock from bad data is never reported as in stock
        assert_eq!(StockStatus::classify(-1, 5), StockStatus::OutOfStock);
        assert_eq!(StockStatus::classify(-3, -5), StockStatus::OutOfStock);
    }
}
