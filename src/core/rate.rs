//! Rate records and the storage/source abstractions around them

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// One USD/TWD rate for a calendar day. Dates are unique within a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateRecord {
    pub date: NaiveDate,
    pub rate: Decimal,
}

impl RateRecord {
    pub fn new(date: NaiveDate, rate: Decimal) -> Self {
        Self { date, rate }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt record for key '{key}': {reason}")]
    Corrupt { key: String, reason: String },
}

impl StoreError {
    pub(crate) fn backend<E: std::fmt::Display>(err: E) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Date-keyed rate storage.
///
/// Implementations must make [`RateStore::insert_if_absent`] atomic with
/// respect to other writers, and must return range scans in ascending date
/// order.
#[async_trait]
pub trait RateStore: Send + Sync {
    async fn find_by_date(&self, date: NaiveDate) -> Result<Option<RateRecord>, StoreError>;

    /// Inserts `record` unless a record for the same date exists.
    /// Returns `true` when a new record was written.
    async fn insert_if_absent(&self, record: &RateRecord) -> Result<bool, StoreError>;

    /// All records with `start <= date <= end`, ascending by date.
    async fn find_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RateRecord>, StoreError>;
}

/// Transport failure while talking to the upstream rate provider.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SourceError {
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SourceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Upstream provider of the raw daily rate feed.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Returns the raw response body.
    async fn fetch_raw(&self) -> Result<String, SourceError>;
}
