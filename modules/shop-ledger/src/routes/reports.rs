//! Report routes
//!
//! Query parameters: `preset` or `start_date` + `end_date`, plus optional
//! `period`, `limit`, `entity_type`, and `entity_id`. The export route also
//! takes `format=csv|xlsx`.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Local;
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::metrics::Metrics;
use crate::services::export::ExportFormat;
use crate::services::reports::{ReportFilter, ReportKind, ReportOutput, ReportQuery};

#[derive(Debug, Deserialize)]
pub struct FormatQuery {
    pub format: Option<String>,
}

fn parse_request(report: &str, query: &ReportQuery) -> Result<(ReportKind, ReportFilter), ApiError> {
    let kind: ReportKind = report.parse()?;
    let filter = query.into_filter(Local::now().naive_local())?;
    Ok((kind, filter))
}

/// Handler for GET /api/reports/{report}
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(report): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ReportOutput>, ApiError> {
    let (kind, filter) = parse_request(&report, &query)?;

    let started = Metrics::timer();
    let result = state.reports.run(kind, &filter, query.limit).await;
    state.metrics.record_report(kind, started, result.is_ok());

    let output = result?;
    tracing::info!(
        report = %kind,
        start = %filter.start(),
        end = %filter.end(),
        "Report served"
    );
    Ok(Json(output))
}

/// Handler for GET /api/reports/{report}/export
pub async fn export_report(
    State(state): State<Arc<AppState>>,
    Path(report): Path<String>,
    Query(query): Query<ReportQuery>,
    Query(format): Query<FormatQuery>,
) -> Result<Response, ApiError> {
    let (kind, filter) = parse_request(&report, &query)?;
    let format: ExportFormat = format.format.as_deref().unwrap_or("csv").parse()?;

    let started = Metrics::timer();
    let result = state.reports.export(kind, format, &filter, query.limit).await;
    state.metrics.record_report(kind, started, result.is_ok());
    let bytes = result?;

    let filename = format!(
        "{}_{}_{}.{}",
        kind,
        filter.start().format("%Y%m%d"),
        filter.end().format("%Y%m%d"),
        format.extension()
    );

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response())
}
