//! Export Adapter boundary
//!
//! Reports hand over a `Dataset`: a title, named columns, and ordered rows of
//! typed cells. Adapters serialize datasets without knowing which report
//! produced them.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::LedgerError;
use crate::services::reports::calc::display_percent;

/// One typed value in a dataset row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Integer(i64),
    Money(Decimal),
    Percent(Decimal),
    Date(NaiveDate),
    Empty,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Display form: money to two places, percentages rounded to two places
    pub fn render(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Integer(n) => n.to_string(),
            Cell::Money(d) => format!("{:.2}", d),
            Cell::Percent(d) => display_percent(*d).to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
            Cell::Empty => String::new(),
        }
    }
}

/// Format-agnostic tabular report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Dataset {
    pub fn new(title: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            title: title.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    /// Rows as `(column, cell)` records
    pub fn records(&self) -> impl Iterator<Item = Vec<(&str, &Cell)>> {
        self.rows.iter().map(move |row| {
            self.columns
                .iter()
                .map(String::as_str)
                .zip(row.iter())
                .collect()
        })
    }
}

/// Implemented by every report aggregate
pub trait Tabular {
    fn to_dataset(&self) -> Dataset;
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Report query failed: {0}")]
    Query(#[from] LedgerError),

    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX encoding failed: {0}")]
    Xlsx(#[from] XlsxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn adapter(&self) -> Box<dyn ExportAdapter> {
        match self {
            ExportFormat::Csv => Box::new(CsvExporter),
            ExportFormat::Xlsx => Box::new(XlsxExporter),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            "pdf" => Err(LedgerError::InvalidArgument(
                "pdf export is not supported; use csv or xlsx".to_string(),
            )),
            other => Err(LedgerError::InvalidArgument(format!(
                "unknown export format: {}",
                other
            ))),
        }
    }
}

/// Serializes a dataset into a downloadable file body
pub trait ExportAdapter: Send + Sync {
    fn export(&self, dataset: &Dataset) -> Result<Vec<u8>, ExportError>;
}

pub struct CsvExporter;

impl ExportAdapter for CsvExporter {
    fn export(&self, dataset: &Dataset) -> Result<Vec<u8>, ExportError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&dataset.columns)?;
        for row in &dataset.rows {
            writer.write_record(row.iter().map(Cell::render))?;
        }
        writer
            .into_inner()
            .map_err(|e| ExportError::Io(e.into_error()))
    }
}

/// Single-sheet workbook: title row, bold header row, then data
pub struct XlsxExporter;

impl ExportAdapter for XlsxExporter {
    fn export(&self, dataset: &Dataset) -> Result<Vec<u8>, ExportError> {
        let mut workbook = Workbook::new();
        let bold = Format::new().set_bold();
        let money = Format::new().set_num_format("#,##0.00");
        let worksheet = workbook.add_worksheet();

        worksheet.write_string_with_format(0, 0, &dataset.title, &bold)?;
        for (col, name) in dataset.columns.iter().enumerate() {
            worksheet.write_string_with_format(2, col as u16, name, &bold)?;
        }

        for (i, row) in dataset.rows.iter().enumerate() {
            let r = (i + 3) as u32;
            for (col, cell) in row.iter().enumerate() {
                let c = col as u16;
                match cell {
                    Cell::Integer(n) => {
                        worksheet.write_number(r, c, *n as f64)?;
                    }
                    Cell::Money(d) => {
                        worksheet.write_number_with_format(
                            r,
                            c,
                            d.round_dp(2).to_f64().unwrap_or_default(),
                            &money,
                        )?;
                    }
                    Cell::Percent(d) => {
                        worksheet.write_number(
                            r,
                            c,
                            display_percent(*d).to_f64().unwrap_or_default(),
                        )?;
                    }
                    Cell::Empty => {}
                    other => {
                        worksheet.write_string(r, c, other.render())?;
                    }
                }
            }
        }

        Ok(workbook.save_to_buffer()?)
    }
}
