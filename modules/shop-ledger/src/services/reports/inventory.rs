use rust_decimal::Decimal;
use serde::Serialize;

use super::calc::StockStatus;
use super::ReportEngine;
use crate::error::LedgerResult;
use crate::models::Product;
use crate::services::export::{Cell, Dataset, Tabular};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockAlert {
    pub product_id: i64,
    pub name: String,
    pub category: String,
    pub quantity: i64,
    pub reorder_level: i64,
    pub status: StockStatus,
}

/// Catalog state at query time; not windowed by the filter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventorySummary {
    pub product_count: usize,
    pub in_stock: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
    pub total_units: i64,
    pub stock_value_at_cost: Decimal,
    pub stock_value_at_sale: Decimal,
    /// Low and out-of-stock products, out of stock first, then by id
    pub alerts: Vec<StockAlert>,
}

pub fn build_inventory_summary(products: &[Product]) -> InventorySummary {
    let mut summary = InventorySummary {
        product_count: products.len(),
        in_stock: 0,
        low_stock: 0,
        out_of_stock: 0,
        total_units: 0,
        stock_value_at_cost: Decimal::ZERO,
        stock_value_at_sale: Decimal::ZERO,
        alerts: Vec::new(),
    };

    for product in products {
        let status = StockStatus::classify(product.quantity, product.reorder_level);
        match status {
            StockStatus::InStock => summary.in_stock += 1,
            StockStatus::LowStock => summary.low_stock += 1,
            StockStatus::OutOfStock => summary.out_of_stock += 1,
        }

        // Negative counts are data errors; they add no value
        let units = product.quantity.max(0);
        summary.total_units += units;
        summary.stock_value_at_cost += product.cost_price * Decimal::from(units);
        summary.stock_value_at_sale += product.sale_price * Decimal::from(units);

        if status != StockStatus::InStock {
            summary.alerts.push(StockAlert {
                product_id: product.id,
                name: product.name.clone(),
                category: product.category.clone(),
                quantity: product.quantity,
                reorder_level: product.reorder_level,
                status,
            });
        }
    }

    summary
        .alerts
        .sort_by(|a, b| a.status.cmp(&b.status).then_with(|| a.product_id.cmp(&b.product_id)));
    summary
}

impl Tabular for InventorySummary {
    fn to_dataset(&self) -> Dataset {
        let mut dataset = Dataset::new(
            "Inventory alerts",
            &["product_id", "product", "category", "quantity", "reorder_level", "status"],
        );
        for alert in &self.alerts {
            dataset.push(vec![
                Cell::Integer(alert.product_id),
                Cell::text(alert.name.clone()),
                Cell::text(alert.category.clone()),
                Cell::Integer(alert.quantity),
                Cell::Integer(alert.reorder_level),
                Cell::text(alert.status.as_str()),
            ]);
        }
        dataset
    }
}

impl ReportEngine {
    pub async fn inventory_summary(&self) -> LedgerResult<InventorySummary> {
        let products = self.stores.catalog.list_products().await?;
        Ok(build_inventory_summary(&products))
    }
}
