pub mod balance_aggregator;
pub mod batch_recalculator;
pub mod export;
pub mod period_resolver;
pub mod reports;
