// 📊 Commission report - date range + salesperson query over the resolver
//
// Loads one tier snapshot and the filtered sales, then hands both to the
// pure resolver. Everything fallible around the resolver lives here.

use crate::commission::{aggregate_commissions, CommissionAggregate, CommissionError};
use crate::db::{get_active_tiers, get_sales, SaleFilter, SaleRecord};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("start_date and end_date are required")]
    MissingDateRange,

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("start_date {start} is after end_date {end}")]
    InvalidDateRange { start: String, end: String },

    #[error(transparent)]
    Commission(#[from] CommissionError),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ReportError {
    /// Caller supplied a bad query (as opposed to a server-side failure)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ReportError::MissingDateRange
                | ReportError::InvalidDate(_)
                | ReportError::InvalidDateRange { .. }
        )
    }
}

/// Parse `YYYY-MM-DD` or RFC 3339. A bare date at the end of a range covers
/// that whole day.
pub fn parse_date_bound(text: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
    let time = if end_of_day {
        NaiveTime::from_hms_opt(23, 59, 59)?
    } else {
        NaiveTime::MIN
    };

    Some(date.and_time(time).and_utc())
}

/// Sentinel values meaning "every salesperson"
fn is_all_salespeople(id: &str) -> bool {
    id.is_empty() || id.eq_ignore_ascii_case("all") || id.eq_ignore_ascii_case("todos")
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommissionQuery {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub salesperson_id: Option<String>,
}

impl CommissionQuery {
    pub fn parse(
        start: Option<&str>,
        end: Option<&str>,
        salesperson: Option<&str>,
    ) -> Result<Self, ReportError> {
        let (start, end) = match (start, end) {
            (Some(s), Some(e)) if !s.trim().is_empty() && !e.trim().is_empty() => (s, e),
            _ => return Err(ReportError::MissingDateRange),
        };

        let start_date = parse_date_bound(start, false)
            .ok_or_else(|| ReportError::InvalidDate(start.to_string()))?;
        let end_date = parse_date_bound(end, true)
            .ok_or_else(|| ReportError::InvalidDate(end.to_string()))?;

        if start_date > end_date {
            return Err(ReportError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }

        let salesperson_id = salesperson
            .map(str::trim)
            .filter(|id| !is_all_salespeople(id))
            .map(str::to_string);

        Ok(CommissionQuery {
            start_date,
            end_date,
            salesperson_id,
        })
    }

    fn filter(&self) -> SaleFilter {
        SaleFilter {
            start: self.start_date,
            end: self.end_date,
            salesperson_id: self.salesperson_id.clone(),
        }
    }
}

/// Aggregate plus the sales it was computed from
#[derive(Debug, Clone, Serialize)]
pub struct CommissionReport {
    #[serde(flatten)]
    pub aggregate: CommissionAggregate,
    pub sales: Vec<SaleRecord>,
}

pub fn calculate_commissions(
    conn: &Connection,
    query: &CommissionQuery,
) -> Result<CommissionReport, ReportError> {
    let tiers = get_active_tiers(conn)?;
    let records = get_sales(conn, &query.filter())?;

    tracing::debug!(
        tiers = tiers.len(),
        sales = records.len(),
        salesperson = query.salesperson_id.as_deref().unwrap_or("all"),
        "calculating commissions"
    );

    let sales: Vec<_> = records.iter().map(|r| r.sale.clone()).collect();
    let aggregate = aggregate_commissions(&sales, &tiers)?;

    Ok(CommissionReport {
        aggregate,
        sales: records,
    })
}
