//! Sales reports: summary, trend, category breakdown, top products and customers

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::calc::{growth, share_percent, top_n};
use super::{ReportEngine, ReportFilter};
use crate::error::LedgerResult;
use crate::models::{EntityType, Invoice, Product};
use crate::services::export::{Cell, Dataset, Tabular};
use crate::services::period_resolver::{DateRange, Granularity};

const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesSummary {
    pub range: DateRange,
    pub invoice_count: usize,
    pub items_sold: i64,
    pub revenue: Decimal,
    pub collected: Decimal,
    pub outstanding: Decimal,
    pub average_invoice: Decimal,
    pub previous_revenue: Decimal,
    pub previous_invoice_count: usize,
    pub revenue_growth: Decimal,
}

pub fn build_sales_summary(
    range: DateRange,
    current: &[Invoice],
    previous: &[Invoice],
) -> SalesSummary {
    let revenue: Decimal = current.iter().map(|i| i.total).sum();
    let previous_revenue: Decimal = previous.iter().map(|i| i.total).sum();
    let invoice_count = current.len();

    let average_invoice = if invoice_count == 0 {
        Decimal::ZERO
    } else {
        revenue / Decimal::from(invoice_count)
    };

    SalesSummary {
        range,
        invoice_count,
        items_sold: current
            .iter()
            .flat_map(|i| i.lines.iter())
            .map(|l| l.quantity)
            .sum(),
        revenue,
        collected: current.iter().map(|i| i.paid_amount.min(i.total)).sum(),
        outstanding: current.iter().map(Invoice::outstanding).sum(),
        average_invoice,
        previous_revenue,
        previous_invoice_count: previous.len(),
        revenue_growth: growth(revenue, previous_revenue),
    }
}

impl Tabular for SalesSummary {
    fn to_dataset(&self) -> Dataset {
        let mut dataset = Dataset::new("Sales summary", &["metric", "value"]);
        let rows = [
            ("Invoices", Cell::Integer(self.invoice_count as i64)),
            ("Items sold", Cell::Integer(self.items_sold)),
            ("Revenue", Cell::Money(self.revenue)),
            ("Collected", Cell::Money(self.collected)),
            ("Outstanding", Cell::Money(self.outstanding)),
            ("Average invoice", Cell::Money(self.average_invoice)),
            ("Previous period revenue", Cell::Money(self.previous_revenue)),
            ("Revenue growth %", Cell::Percent(self.revenue_growth)),
        ];
        for (metric, value) in rows {
            dataset.push(vec![Cell::text(metric), value]);
        }
        dataset
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub bucket_start: NaiveDate,
    pub label: String,
    pub invoice_count: usize,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesTrend {
    pub range: DateRange,
    pub period: Granularity,
    pub points: Vec<TrendPoint>,
}

/// Contiguous buckets over the window; buckets without sales are zero
pub fn build_sales_trend(
    range: DateRange,
    period: Granularity,
    invoices: &[Invoice],
) -> SalesTrend {
    let mut buckets: BTreeMap<NaiveDate, (usize, Decimal)> = period
        .buckets(&range)
        .into_iter()
        .map(|start| (start, (0, Decimal::ZERO)))
        .collect();

    for invoice in invoices {
        let key = period.bucket_start(invoice.issued_at.date());
        let bucket = buckets.entry(key).or_insert((0, Decimal::ZERO));
        bucket.0 += 1;
        bucket.1 += invoice.total;
    }

    SalesTrend {
        range,
        period,
        points: buckets
            .into_iter()
            .map(|(start, (invoice_count, revenue))| TrendPoint {
                bucket_start: start,
                label: period.label(start),
                invoice_count,
                revenue,
            })
            .collect(),
    }
}

impl Tabular for SalesTrend {
    fn to_dataset(&self) -> Dataset {
        let mut dataset = Dataset::new(
            format!("Sales trend ({})", self.period),
            &["period", "invoices", "revenue"],
        );
        for point in &self.points {
            dataset.push(vec![
                Cell::text(point.label.clone()),
                Cell::Integer(point.invoice_count as i64),
                Cell::Money(point.revenue),
            ]);
        }
        dataset
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySales {
    pub category: String,
    pub quantity: i64,
    pub revenue: Decimal,
    pub share_percent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    pub range: DateRange,
    pub total_revenue: Decimal,
    pub categories: Vec<CategorySales>,
}

/// Line revenue per product category; lines for unknown products land in
/// "Uncategorized"
pub fn build_category_breakdown(
    range: DateRange,
    invoices: &[Invoice],
    products: &[Product],
) -> CategoryBreakdown {
    let category_of: HashMap<i64, &str> = products
        .iter()
        .map(|p| (p.id, p.category.as_str()))
        .collect();

    let mut groups: BTreeMap<String, (i64, Decimal)> = BTreeMap::new();
    for line in invoices.iter().flat_map(|i| i.lines.iter()) {
        let category = category_of
            .get(&line.product_id)
            .copied()
            .unwrap_or(UNCATEGORIZED);
        let group = groups
            .entry(category.to_string())
            .or_insert((0, Decimal::ZERO));
        group.0 += line.quantity;
        group.1 += line.revenue();
    }

    let total_revenue: Decimal = groups.values().map(|(_, revenue)| *revenue).sum();

    let categories: Vec<CategorySales> = groups
        .into_iter()
        .map(|(category, (quantity, revenue))| CategorySales {
            category,
            quantity,
            revenue,
            share_percent: share_percent(revenue, total_revenue),
        })
        .collect();

    let count = categories.len();
    CategoryBreakdown {
        range,
        total_revenue,
        categories: top_n(categories, |c| c.revenue, count),
    }
}

impl Tabular for CategoryBreakdown {
    fn to_dataset(&self) -> Dataset {
        let mut dataset = Dataset::new(
            "Sales by category",
            &["category", "quantity", "revenue", "share_percent"],
        );
        for c in &self.categories {
            dataset.push(vec![
                Cell::text(c.category.clone()),
                Cell::Integer(c.quantity),
                Cell::Money(c.revenue),
                Cell::Percent(c.share_percent),
            ]);
        }
        dataset
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSales {
    pub product_id: i64,
    pub name: String,
    pub category: String,
    pub quantity: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopProducts {
    pub range: DateRange,
    pub limit: usize,
    pub products: Vec<ProductSales>,
}

pub fn build_top_products(
    range: DateRange,
    invoices: &[Invoice],
    products: &[Product],
    limit: usize,
) -> TopProducts {
    let catalog: HashMap<i64, &Product> = products.iter().map(|p| (p.id, p)).collect();

    let mut groups: BTreeMap<i64, (i64, Decimal)> = BTreeMap::new();
    for line in invoices.iter().flat_map(|i| i.lines.iter()) {
        let group = groups.entry(line.product_id).or_insert((0, Decimal::ZERO));
        group.0 += line.quantity;
        group.1 += line.revenue();
    }

    let rows: Vec<ProductSales> = groups
        .into_iter()
        .map(|(product_id, (quantity, revenue))| {
            let product = catalog.get(&product_id);
            ProductSales {
                product_id,
                name: product
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| format!("Product #{}", product_id)),
                category: product
                    .map(|p| p.category.clone())
                    .unwrap_or_else(|| UNCATEGORIZED.to_string()),
                quantity,
                revenue,
            }
        })
        .collect();

    TopProducts {
        range,
        limit,
        products: top_n(rows, |p| p.revenue, limit),
    }
}

impl Tabular for TopProducts {
    fn to_dataset(&self) -> Dataset {
        let mut dataset = Dataset::new(
            "Top products",
            &["rank", "product_id", "product", "category", "quantity", "revenue"],
        );
        for (rank, p) in self.products.iter().enumerate() {
            dataset.push(vec![
                Cell::Integer(rank as i64 + 1),
                Cell::Integer(p.product_id),
                Cell::text(p.name.clone()),
                Cell::text(p.category.clone()),
                Cell::Integer(p.quantity),
                Cell::Money(p.revenue),
            ]);
        }
        dataset
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerSales {
    pub customer_id: i64,
    pub name: String,
    pub invoice_count: usize,
    pub revenue: Decimal,
    pub outstanding: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopCustomers {
    pub range: DateRange,
    pub limit: usize,
    pub customers: Vec<CustomerSales>,
}

pub fn build_top_customers(
    range: DateRange,
    invoices: &[Invoice],
    names: &HashMap<i64, String>,
    limit: usize,
) -> TopCustomers {
    let mut groups: BTreeMap<i64, (usize, Decimal, Decimal)> = BTreeMap::new();
    for invoice in invoices {
        let group = groups
            .entry(invoice.customer_id)
            .or_insert((0, Decimal::ZERO, Decimal::ZERO));
        group.0 += 1;
        group.1 += invoice.total;
        group.2 += invoice.outstanding();
    }

    let rows: Vec<CustomerSales> = groups
        .into_iter()
        .map(|(customer_id, (invoice_count, revenue, outstanding))| CustomerSales {
            customer_id,
            name: names
                .get(&customer_id)
                .cloned()
                .unwrap_or_else(|| format!("Customer #{}", customer_id)),
            invoice_count,
            revenue,
            outstanding,
        })
        .collect();

    TopCustomers {
        range,
        limit,
        customers: top_n(rows, |c| c.revenue, limit),
    }
}

impl Tabular for TopCustomers {
    fn to_dataset(&self) -> Dataset {
        let mut dataset = Dataset::new(
            "Top customers",
            &["rank", "customer_id", "customer", "invoices", "revenue", "outstanding"],
        );
        for (rank, c) in self.customers.iter().enumerate() {
            dataset.push(vec![
                Cell::Integer(rank as i64 + 1),
                Cell::Integer(c.customer_id),
                Cell::text(c.name.clone()),
                Cell::Integer(c.invoice_count as i64),
                Cell::Money(c.revenue),
                Cell::Money(c.outstanding),
            ]);
        }
        dataset
    }
}

impl ReportEngine {
    /// Invoices in the window, narrowed to a customer scope when present
    pub(crate) async fn scoped_invoices(
        &self,
        filter: &ReportFilter,
    ) -> LedgerResult<Vec<Invoice>> {
        let scope = filter.scope_for(EntityType::Customer)?;
        let mut invoices = self
            .stores
            .catalog
            .list_invoices_in_range(filter.start(), filter.end())
            .await?;
        if let Some(scope) = scope {
            invoices.retain(|i| scope.matches(EntityType::Customer, i.customer_id));
        }
        Ok(invoices)
    }

    pub(crate) async fn customer_names(&self) -> LedgerResult<HashMap<i64, String>> {
        Ok(self
            .stores
            .ledger
            .list_entities(EntityType::Customer)
            .await?
            .into_iter()
            .map(|e| (e.id, e.name))
            .collect())
    }

    pub async fn sales_summary(&self, filter: &ReportFilter) -> LedgerResult<SalesSummary> {
        let current = self.scoped_invoices(filter).await?;
        let previous = self.scoped_invoices(&filter.previous()?).await?;
        Ok(build_sales_summary(filter.range(), &current, &previous))
    }

    pub async fn sales_trend(&self, filter: &ReportFilter) -> LedgerResult<SalesTrend> {
        let invoices = self.scoped_invoices(filter).await?;
        Ok(build_sales_trend(filter.range(), filter.period(), &invoices))
    }

    pub async fn sales_by_category(
        &self,
        filter: &ReportFilter,
    ) -> LedgerResult<CategoryBreakdown> {
        let invoices = self.scoped_invoices(filter).await?;
        let products = self.stores.catalog.list_products().await?;
        Ok(build_category_breakdown(filter.range(), &invoices, &products))
    }

    pub async fn top_products(
        &self,
        filter: &ReportFilter,
        limit: Option<usize>,
    ) -> LedgerResult<TopProducts> {
        let invoices = self.scoped_invoices(filter).await?;
        let products = self.stores.catalog.list_products().await?;
        Ok(build_top_products(
            filter.range(),
            &invoices,
            &products,
            self.limit(limit),
        ))
    }

    pub async fn top_customers(
        &self,
        filter: &ReportFilter,
        limit: Option<usize>,
    ) -> LedgerResult<TopCustomers> {
        let invoices = self.scoped_invoices(filter).await?;
        let names = self.customer_names().await?;
        Ok(build_top_customers(
            filter.range(),
            &invoices,
            &names,
            self.limit(limit),
        ))
    }
}
