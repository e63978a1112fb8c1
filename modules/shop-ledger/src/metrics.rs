use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Instant;

use crate::models::EntityType;
use crate::services::batch_recalculator::BatchSummary;
use crate::services::reports::ReportKind;

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,

    // Counters
    pub recalculations_total: IntCounterVec,
    pub report_queries_total: IntCounterVec,

    // Histograms
    pub report_query_duration_seconds: HistogramVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let recalculations_total = IntCounterVec::new(
            Opts::new("recalculations_total", "Balance recalculations per entity"),
            &["entity_type", "result"], // result: ok|error
        )?;

        let report_queries_total = IntCounterVec::new(
            Opts::new("report_queries_total", "Report queries served"),
            &["report", "result"],
        )?;

        let report_query_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "report_query_duration_seconds",
                "Report query duration seconds",
            ),
            &["report"],
        )?;

        registry.register(Box::new(recalculations_total.clone()))?;
        registry.register(Box::new(report_queries_total.clone()))?;
        registry.register(Box::new(report_query_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            recalculations_total,
            report_queries_total,
            report_query_duration_seconds,
        })
    }

    pub fn record_recalculation(&self, entity_type: EntityType, ok: bool) {
        self.recalculations_total
            .with_label_values(&[entity_type.as_str(), result_label(ok)])
            .inc();
    }

    pub fn record_batch(&self, summary: &BatchSummary) {
        let entity_type = summary.entity_type.as_str();
        self.recalculations_total
            .with_label_values(&[entity_type, "ok"])
            .inc_by(summary.succeeded as u64);
        self.recalculations_total
            .with_label_values(&[entity_type, "error"])
            .inc_by(summary.failed.len() as u64);
    }

    pub fn record_report(&self, report: ReportKind, started: Instant, ok: bool) {
        self.report_queries_total
            .with_label_values(&[report.as_str(), result_label(ok)])
            .inc();
        self.report_query_duration_seconds
            .with_label_values(&[report.as_str()])
            .observe(started.elapsed().as_secs_f64());
    }

    pub fn render(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let mf = self.registry.gather();
        let mut buf = Vec::new();
        encoder
            .encode(&mf, &mut buf)
            .map_err(|e| e.to_string())?;
        String::from_utf8(buf).map_err(|e| e.to_string())
    }

    pub fn timer() -> Instant {
        Instant::now()
    }
}

fn result_label(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "error"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_recorded_series() {
        let metrics = Metrics::new().unwrap();
        metrics.record_recalculation(EntityType::Supplier, false);
        metrics.record_report(ReportKind::CashFlow, Metrics::timer(), true);

        let text = metrics.render().unwrap();
        assert!(text.contains("recalculations_total{entity_type=\"supplier\",result=\"error\"} 1"));
        assert!(text.contains("report_queries_total{report=\"cash-flow\",result=\"ok\"} 1"));
        assert!(text.contains("report_query_duration_seconds_count{report=\"cash-flow\"} 1"));
    }
}
