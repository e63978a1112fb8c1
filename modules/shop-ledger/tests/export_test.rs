mod common;

use common::*;
use shop_ledger_rs::models::EntityType;
use shop_ledger_rs::services::export::{ExportError, ExportFormat};
use shop_ledger_rs::services::period_resolver::Granularity;
use shop_ledger_rs::services::reports::{ReportEngine, ReportFilter, ReportKind};
use shop_ledger_rs::LedgerError;

async fn engine() -> ReportEngine {
    let store = new_store();
    store.add_entity(EntityType::Customer, 1, "Acme Print, Ltd").await;
    store.add_product(product(1, "Flyers", "Leaflets", 100, 10)).await;
    store
        .add_invoice(invoice(
            1,
            1,
            at(ymd(2024, 3, 5), 10, 0),
            ymd(2024, 3, 19),
            0,
            vec![line(1, 3, 33, 10)],
        ))
        .await;
    ReportEngine::new(stores(&store))
}

fn march() -> ReportFilter {
    ReportFilter::for_dates(ymd(2024, 3, 1), ymd(2024, 3, 31), Granularity::Monthly).unwrap()
}

#[tokio::test]
async fn test_top_customers_csv() {
    let engine = engine().await;

    let bytes = engine
        .export(ReportKind::TopCustomers, ExportFormat::Csv, &march(), None)
        .await
        .unwrap();
    let text = String::from_utf8(bytes).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "rank,customer_id,customer,invoices,revenue,outstanding");
    assert_eq!(lines[1], "1,1,\"Acme Print, Ltd\",1,99.00,99.00");
    assert_eq!(lines.len(), 2);
}

#[tokio::test]
async fn test_sales_trend_csv_has_one_row_per_bucket() {
    let engine = engine().await;

    let bytes = engine
        .export(ReportKind::SalesTrend, ExportFormat::Csv, &march(), None)
        .await
        .unwrap();
    let text = String::from_utf8(bytes).unwrap();

    assert_eq!(text, "period,invoices,revenue\n2024-03,1,99.00\n");
}

#[tokio::test]
async fn test_every_report_exports_as_xlsx() {
    let engine = engine().await;

    for kind in ReportKind::ALL {
        let bytes = engine
            .export(kind, ExportFormat::Xlsx, &march(), None)
            .await
            .unwrap();
        assert!(bytes.starts_with(b"PK"), "{} is not a zip container", kind);
    }
}

#[tokio::test]
async fn test_query_errors_pass_through_export() {
    let engine = engine().await;
    let filter = march().with_scope(shop_ledger_rs::models::EntityScope::of_type(
        EntityType::Supplier,
    ));

    let err = engine
        .export(ReportKind::SalesSummary, ExportFormat::Csv, &filter, None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ExportError::Query(LedgerError::InvalidArgument(_))
    ));
}

#[test]
fn test_pdf_is_not_an_export_format() {
    let err = "pdf".parse::<ExportFormat>().unwrap_err();
    assert!(matches!(err, LedgerError::InvalidArgument(_)));
}
