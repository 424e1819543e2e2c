//! Daily rate ingestion: fetch the provider feed and store rates not seen yet.

use crate::core::config::ProviderConfig;
use crate::core::rate::{RateRecord, RateSource, RateStore, SourceError, StoreError};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument};

const PROVIDER_DATE_FORMAT: &str = "%Y%m%d";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to fetch rates: {0}")]
    Fetch(#[from] SourceError),
    #[error("failed to parse rate response: {0}")]
    Parse(String),
    #[error("failed to store rates: {0}")]
    Storage(#[from] StoreError),
}

/// Names of the date and rate fields in each element of the provider feed.
#[derive(Debug, Clone)]
pub struct FeedFields {
    pub date_field: String,
    pub rate_field: String,
}

impl From<&ProviderConfig> for FeedFields {
    fn from(config: &ProviderConfig) -> Self {
        FeedFields {
            date_field: config.date_field.clone(),
            rate_field: config.rate_field.clone(),
        }
    }
}

impl Default for FeedFields {
    fn default() -> Self {
        FeedFields::from(&ProviderConfig::default())
    }
}

pub struct IngestService {
    source: Arc<dyn RateSource>,
    store: Arc<dyn RateStore>,
    fields: FeedFields,
}

impl IngestService {
    pub fn new(source: Arc<dyn RateSource>, store: Arc<dyn RateStore>, fields: FeedFields) -> Self {
        Self {
            source,
            store,
            fields,
        }
    }

    /// Fetches the provider feed and inserts a record for every date that is
    /// not stored yet. Dates already present keep their first value.
    ///
    /// The whole response is parsed before anything is written, so a malformed
    /// feed leaves the store untouched. A storage failure part way through
    /// keeps the records written before it.
    #[instrument(name = "IngestRates", skip(self))]
    pub async fn fetch_and_store(&self) -> Result<(), IngestError> {
        let body = self.source.fetch_raw().await?;
        let records = parse_rates(&body, &self.fields)?;
        debug!("Parsed {} rates from provider", records.len());

        let mut inserted = 0usize;
        for record in &records {
            if self.store.insert_if_absent(record).await? {
                inserted += 1;
            }
        }

        info!(
            fetched = records.len(),
            inserted,
            existing = records.len() - inserted,
            "Rate ingestion finished"
        );
        Ok(())
    }
}

/// Parses a provider response into rate records, in feed order.
///
/// Every element must carry a valid date. Elements without the rate field
/// (or with a null or blank one) are then skipped.
pub fn parse_rates(body: &str, fields: &FeedFields) -> Result<Vec<RateRecord>, IngestError> {
    let root: Value = serde_json::from_str(body)
        .map_err(|e| IngestError::Parse(format!("response is not valid JSON: {e}")))?;
    let Value::Array(items) = root else {
        return Err(IngestError::Parse(
            "response is not a JSON array".to_string(),
        ));
    };

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let Value::Object(entry) = item else {
            return Err(IngestError::Parse(format!(
                "element {index} is not a JSON object"
            )));
        };

        let date = entry
            .get(&fields.date_field)
            .ok_or_else(|| {
                IngestError::Parse(format!(
                    "element {index} is missing '{}'",
                    fields.date_field
                ))
            })
            .and_then(|v| {
                parse_feed_date(v)
                    .map_err(|reason| IngestError::Parse(format!("element {index}: {reason}")))
            })?;

        let Some(rate) = entry
            .get(&fields.rate_field)
            .and_then(|v| parse_rate_value(v).transpose())
        else {
            debug!(
                "Element {} has no '{}' value, skipping",
                index, fields.rate_field
            );
            continue;
        };
        let rate = rate.map_err(|reason| {
            IngestError::Parse(format!("element {index}: {reason}"))
        })?;

        records.push(RateRecord::new(date, rate));
    }
    Ok(records)
}

fn parse_feed_date(value: &Value) -> Result<NaiveDate, String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => return Err(format!("unexpected date value {other}")),
    };
    NaiveDate::parse_from_str(&text, PROVIDER_DATE_FORMAT)
        .map_err(|e| format!("invalid date '{text}': {e}"))
}

/// `Ok(None)` for values that mean "no rate published".
fn parse_rate_value(value: &Value) -> Result<Option<Decimal>, String> {
    let text = match value {
        Value::Null => return Ok(None),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => return Err(format!("unexpected rate value {other}")),
    };
    let rate = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| format!("invalid rate '{text}': {e}"))?;
    if rate.is_sign_negative() && !rate.is_zero() {
        return Err(format!("negative rate '{text}'"));
    }
    Ok(Some(rate))
}
