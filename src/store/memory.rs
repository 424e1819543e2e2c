use crate::core::rate::{RateRecord, RateStore, StoreError};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory rate store backed by an ordered map
#[derive(Default)]
pub struct MemoryRateStore {
    inner: RwLock<BTreeMap<NaiveDate, Decimal>>,
}

impl MemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl RateStore for MemoryRateStore {
    async fn find_by_date(&self, date: NaiveDate) -> Result<Option<RateRecord>, StoreError> {
        let rates = self.inner.read().await;
        Ok(rates.get(&date).map(|rate| RateRecord::new(date, *rate)))
    }

    async fn insert_if_absent(&self, record: &RateRecord) -> Result<bool, StoreError> {
        let mut rates = self.inner.write().await;
        match rates.entry(record.date) {
            Entry::Occupied(_) => {
                debug!("Rate for {} already stored, skipping", record.date);
                Ok(false)
            }
            Entry::Vacant(slot) => {
                slot.insert(record.rate);
                debug!("Stored rate {} for {}", record.rate, record.date);
                Ok(true)
            }
        }
    }

    async fn find_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RateRecord>, StoreError> {
        if start > end {
            return Ok(Vec::new());
        }
        let rates = self.inner.read().await;
        Ok(rates
            .range(start..=end)
            .map(|(date, rate)| RateRecord::new(*date, *rate))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use std::sync::Arc;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn rate(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = MemoryRateStore::new();

        assert!(store.find_by_date(day(24)).await.unwrap().is_none());

        let inserted = store
            .insert_if_absent(&RateRecord::new(day(24), rate("31.01")))
            .await
            .unwrap();
        assert!(inserted);

        let found = store.find_by_date(day(24)).await.unwrap().unwrap();
        assert_eq!(found.rate, rate("31.01"));
    }

    #[tokio::test]
    async fn test_first_write_wins() {
        let store = MemoryRateStore::new();
        store
            .insert_if_absent(&RateRecord::new(day(24), rate("31.01")))
            .await
            .unwrap();
        let inserted = store
            .insert_if_absent(&RateRecord::new(day(24), rate("32.50")))
            .await
            .unwrap();

        assert!(!inserted);
        assert_eq!(store.len().await, 1);
        assert_eq!(
            store.find_by_date(day(24)).await.unwrap().unwrap().rate,
            rate("31.01")
        );
    }

    #[tokio::test]
    async fn test_range_is_inclusive_and_ascending() {
        let store = MemoryRateStore::new();
        for d in [27, 23, 25, 24, 26] {
            store
                .insert_if_absent(&RateRecord::new(day(d), Decimal::from(d)))
                .await
                .unwrap();
        }

        let dates: Vec<_> = store
            .find_in_range(day(24), day(26))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.date)
            .collect();
        assert_eq!(dates, vec![day(24), day(25), day(26)]);

        assert!(store.find_in_range(day(26), day(24)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_inserts_keep_one_record() {
        let store = Arc::new(MemoryRateStore::new());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .insert_if_absent(&RateRecord::new(day(24), Decimal::from(i)))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(store.len().await, 1);
    }
}
