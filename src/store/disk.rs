use crate::core::rate::{RateRecord, RateStore, StoreError};
use async_trait::async_trait;
use chrono::NaiveDate;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use tokio::sync::Mutex;
use tracing::debug;

const PARTITION_NAME: &str = "usd_twd";
const KEY_FORMAT: &str = "%Y-%m-%d";

/// Persistent rate store on a fjall partition.
///
/// Keys are ISO-8601 dates so the partition's byte order is date order, and
/// values are the decimal rate as text.
pub struct DiskRateStore {
    _keyspace: Keyspace,
    partition: PartitionHandle,
    write_lock: Mutex<()>,
}

impl DiskRateStore {
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(db_path)?;

        let keyspace = fjall::Config::new(db_path)
            .open()
            .map_err(StoreError::backend)?;
        let partition = keyspace
            .open_partition(PARTITION_NAME, PartitionCreateOptions::default())
            .map_err(StoreError::backend)?;
        debug!("Opened rate store at {}", db_path.display());

        Ok(Self {
            _keyspace: keyspace,
            partition,
            write_lock: Mutex::new(()),
        })
    }

    fn key(date: NaiveDate) -> String {
        date.format(KEY_FORMAT).to_string()
    }

    fn decode(key: &[u8], value: &[u8]) -> Result<RateRecord, StoreError> {
        let key = String::from_utf8_lossy(key).into_owned();
        let date = NaiveDate::parse_from_str(&key, KEY_FORMAT).map_err(|e| StoreError::Corrupt {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        let text = std::str::from_utf8(value).map_err(|e| StoreError::Corrupt {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        let rate = Decimal::from_str(text).map_err(|e| StoreError::Corrupt {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        Ok(RateRecord::new(date, rate))
    }
}

#[async_trait]
impl RateStore for DiskRateStore {
    async fn find_by_date(&self, date: NaiveDate) -> Result<Option<RateRecord>, StoreError> {
        let key = Self::key(date);
        match self.partition.get(key.as_bytes()).map_err(StoreError::backend)? {
            Some(value) => Ok(Some(Self::decode(key.as_bytes(), &value)?)),
            None => Ok(None),
        }
    }

    async fn insert_if_absent(&self, record: &RateRecord) -> Result<bool, StoreError> {
        let key = Self::key(record.date);

        // Existence check and insert happen under one writer lock
        let _guard = self.write_lock.lock().await;
        if self
            .partition
            .contains_key(key.as_bytes())
            .map_err(StoreError::backend)?
        {
            debug!("Rate for {} already stored, skipping", record.date);
            return Ok(false);
        }
        self.partition
            .insert(key.as_bytes(), record.rate.to_string().as_bytes())
            .map_err(StoreError::backend)?;
        debug!("Stored rate {} for {}", record.rate, record.date);
        Ok(true)
    }

    async fn find_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RateRecord>, StoreError> {
        if start > end {
            return Ok(Vec::new());
        }
        let (start_key, end_key) = (Self::key(start), Self::key(end));

        let mut records = Vec::new();
        for item in self.partition.range(start_key..=end_key) {
            let (key, value) = item.map_err(StoreError::backend)?;
            records.push(Self::decode(&key, &value)?);
        }
        // Callers rely on ascending order
        records.sort_by_key(|r| r.date);
        Ok(records)
    }
}
