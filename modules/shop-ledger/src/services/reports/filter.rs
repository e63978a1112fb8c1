//! Report filter value object and its query-parameter form

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{EntityScope, EntityType};
use crate::services::period_resolver::{
    self, end_of_day, start_of_day, DateRange, Granularity, PeriodPreset, MAX_BUCKETS,
};

/// Validated report window; cannot be built with `start > end`, outside the
/// supported years, or spanning more than `MAX_BUCKETS` buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportFilter {
    range: DateRange,
    period: Granularity,
    entity_scope: Option<EntityScope>,
}

impl ReportFilter {
    pub fn new(
        start: NaiveDateTime,
        end: NaiveDateTime,
        period: Granularity,
        entity_scope: Option<EntityScope>,
    ) -> LedgerResult<Self> {
        Self::checked(DateRange::new(start, end)?, period, entity_scope)
    }

    fn checked(
        range: DateRange,
        period: Granularity,
        entity_scope: Option<EntityScope>,
    ) -> LedgerResult<Self> {
        range.ensure_reportable()?;

        let buckets = period.bucket_count(&range);
        if buckets > MAX_BUCKETS {
            return Err(LedgerError::InvalidArgument(format!(
                "{} {} buckets requested, at most {} allowed",
                buckets, period, MAX_BUCKETS
            )));
        }

        Ok(Self {
            range,
            period,
            entity_scope,
        })
    }

    /// Whole days, `start 00:00:00` through `end 23:59:59.999`
    pub fn for_dates(start: NaiveDate, end: NaiveDate, period: Granularity) -> LedgerResult<Self> {
        Self::new(start_of_day(start), end_of_day(end), period, None)
    }

    pub fn from_preset(
        preset: PeriodPreset,
        reference: NaiveDateTime,
        period: Granularity,
    ) -> LedgerResult<Self> {
        Self::checked(
            period_resolver::resolve_preset(preset, reference),
            period,
            None,
        )
    }

    pub fn with_scope(mut self, scope: EntityScope) -> Self {
        self.entity_scope = Some(scope);
        self
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn start(&self) -> NaiveDateTime {
        self.range.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.range.end
    }

    pub fn period(&self) -> Granularity {
        self.period
    }

    pub fn entity_scope(&self) -> Option<EntityScope> {
        self.entity_scope
    }

    /// Same granularity and scope over the immediately preceding window
    pub fn previous(&self) -> LedgerResult<Self> {
        Ok(Self {
            range: self.range.previous()?,
            ..*self
        })
    }

    /// Scope narrowed to the given kind; a scope of another kind is rejected
    pub fn scope_for(&self, entity_type: EntityType) -> LedgerResult<Option<EntityScope>> {
        match self.entity_scope {
            None => Ok(None),
            Some(scope) if scope.entity_type == entity_type => Ok(Some(scope)),
            Some(scope) => Err(LedgerError::InvalidArgument(format!(
                "this report can only be scoped to a {}, got {}",
                entity_type, scope.entity_type
            ))),
        }
    }
}

/// Report parameters as they arrive on a query string
///
/// Either `preset` or both `start_date` and `end_date` must be present.
/// Dates accept `YYYY-MM-DD` (whole day) or `YYYY-MM-DDTHH:MM:SS`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub preset: Option<String>,
    pub period: Option<String>,
    pub limit: Option<usize>,
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
}

impl ReportQuery {
    pub fn into_filter(&self, reference: NaiveDateTime) -> LedgerResult<ReportFilter> {
        let period = match &self.period {
            Some(p) => p.parse()?,
            None => Granularity::default(),
        };

        let mut filter = match (&self.preset, &self.start_date, &self.end_date) {
            (Some(preset), None, None) => {
                ReportFilter::from_preset(preset.parse()?, reference, period)?
            }
            (None, Some(start), Some(end)) => ReportFilter::new(
                parse_bound(start, false)?,
                parse_bound(end, true)?,
                period,
                None,
            )?,
            (Some(_), _, _) => {
                return Err(LedgerError::InvalidArgument(
                    "preset cannot be combined with start_date/end_date".to_string(),
                ))
            }
            _ => {
                return Err(LedgerError::InvalidArgument(
                    "either preset or both start_date and end_date are required".to_string(),
                ))
            }
        };

        match (&self.entity_type, self.entity_id) {
            (Some(t), Some(id)) => filter = filter.with_scope(EntityScope::entity(t.parse()?, id)),
            (Some(t), None) => filter = filter.with_scope(EntityScope::of_type(t.parse()?)),
            (None, Some(_)) => {
                return Err(LedgerError::InvalidArgument(
                    "entity_id requires entity_type".to_string(),
                ))
            }
            (None, None) => {}
        }

        Ok(filter)
    }
}

/// Parse a date or datetime; bare dates expand to the start or end of that day
pub fn parse_bound(raw: &str, is_end: bool) -> LedgerResult<NaiveDateTime> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(if is_end {
            end_of_day(date)
        } else {
            start_of_day(date)
        });
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| LedgerError::InvalidArgument(format!("invalid date: {}", raw)))
}
