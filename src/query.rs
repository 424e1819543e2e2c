//! Range queries over stored rates and the response envelope they produce.

use crate::core::clock::Clock;
use crate::core::rate::{RateRecord, RateStore, StoreError};
use chrono::{Days, Months, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

const REQUEST_DATE_FORMAT: &str = "%Y/%m/%d";
const RESPONSE_DATE_FORMAT: &str = "%Y%m%d";
const RATE_DECIMALS: u32 = 2;

pub const SUCCESS_CODE: &str = "0000";
pub const SUCCESS_MESSAGE: &str = "success";

/// Reasons a query range is rejected, in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("date format error")]
    DateFormat,
    #[error("date range invalid")]
    RangeOrder,
    #[error("range limited to 1 year ago through yesterday")]
    RangeBounds,
}

impl QueryError {
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::RangeOrder => "E001",
            QueryError::RangeBounds => "E002",
            QueryError::DateFormat => "E003",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyInfo {
    pub date: String,
    pub usd: String,
}

impl From<&RateRecord> for CurrencyInfo {
    fn from(record: &RateRecord) -> Self {
        CurrencyInfo {
            date: record.date.format(RESPONSE_DATE_FORMAT).to_string(),
            usd: format_rate(record.rate),
        }
    }
}

/// Result of a range query. `currency` is `None` for every non-success code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub error: ErrorInfo,
    pub currency: Option<Vec<CurrencyInfo>>,
}

impl QueryResponse {
    pub fn success(records: &[RateRecord]) -> Self {
        QueryResponse {
            error: ErrorInfo {
                code: SUCCESS_CODE.to_string(),
                message: SUCCESS_MESSAGE.to_string(),
            },
            currency: Some(records.iter().map(CurrencyInfo::from).collect()),
        }
    }

    pub fn failure(err: QueryError) -> Self {
        QueryResponse {
            error: ErrorInfo {
                code: err.code().to_string(),
                message: err.to_string(),
            },
            currency: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.code == SUCCESS_CODE
    }
}

/// Inclusive range of dates that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// The queryable window for `today`: one year ago through yesterday.
pub fn allowed_window(today: NaiveDate) -> DateRange {
    let start = today.checked_sub_months(Months::new(12)).unwrap_or(NaiveDate::MIN);
    let end = today.checked_sub_days(Days::new(1)).unwrap_or(NaiveDate::MIN);
    DateRange { start, end }
}

/// Parses a `yyyy/MM/dd` date. Exactly two digits are required for month and
/// day, and the date must exist on the calendar.
pub fn parse_request_date(text: &str) -> Result<NaiveDate, QueryError> {
    let bytes = text.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'/',
            _ => b.is_ascii_digit(),
        });
    if !well_formed {
        return Err(QueryError::DateFormat);
    }
    NaiveDate::parse_from_str(text, REQUEST_DATE_FORMAT).map_err(|_| QueryError::DateFormat)
}

/// Runs the parse, order and bounds checks in that order.
pub fn validate_range(start: &str, end: &str, today: NaiveDate) -> Result<DateRange, QueryError> {
    let start = parse_request_date(start)?;
    let end = parse_request_date(end)?;

    if start > end {
        return Err(QueryError::RangeOrder);
    }

    let window = allowed_window(today);
    if start < window.start || end > window.end {
        return Err(QueryError::RangeBounds);
    }

    Ok(DateRange { start, end })
}

/// Two decimal places, midpoints rounded away from zero.
pub fn format_rate(rate: Decimal) -> String {
    let mut rounded =
        rate.round_dp_with_strategy(RATE_DECIMALS, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(RATE_DECIMALS);
    rounded.to_string()
}

pub struct QueryService {
    store: Arc<dyn RateStore>,
    clock: Arc<dyn Clock>,
}

impl QueryService {
    pub fn new(store: Arc<dyn RateStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Validates the range against today's window and maps the stored rates
    /// in it. Only a storage failure is returned as `Err`; rejected input is a
    /// failure envelope.
    #[instrument(name = "QueryRates", skip(self))]
    pub async fn query(&self, start: &str, end: &str) -> Result<QueryResponse, StoreError> {
        let today = self.clock.today();
        let range = match validate_range(start, end, today) {
            Ok(range) => range,
            Err(err) => {
                debug!(code = err.code(), "Rejected query: {}", err);
                return Ok(QueryResponse::failure(err));
            }
        };

        let records = self.store.find_in_range(range.start, range.end).await?;
        debug!(
            "Found {} rates between {} and {}",
            records.len(),
            range.start,
            range.end
        );
        Ok(QueryResponse::success(&records))
    }
}
