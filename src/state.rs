use crate::core::clock::{Clock, SystemClock};
use crate::core::config::AppConfig;
use crate::core::rate::{RateSource, RateStore};
use crate::ingest::{FeedFields, IngestService};
use crate::providers::TaifexSource;
use crate::query::QueryService;
use crate::store::open_rate_store;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Shared application state, passed to route handlers and the scheduler.
pub struct AppState {
    pub ingest: IngestService,
    pub query: QueryService,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(
        source: Arc<dyn RateSource>,
        store: Arc<dyn RateStore>,
        clock: Arc<dyn Clock>,
        fields: FeedFields,
    ) -> Arc<Self> {
        Arc::new(Self {
            ingest: IngestService::new(source, Arc::clone(&store), fields),
            query: QueryService::new(store, Arc::clone(&clock)),
            clock,
        })
    }

    /// Wires the TAIFEX source, the on-disk store and the wall clock from
    /// `config`.
    pub fn from_config(config: &AppConfig) -> Result<Arc<Self>> {
        let source = TaifexSource::from_config(&config.provider)
            .context("Failed to create rate provider")?;
        let store = open_rate_store(config)?;
        let clock = SystemClock::new(config.utc_offset()?);

        Ok(Self::new(
            Arc::new(source),
            store,
            Arc::new(clock),
            FeedFields::from(&config.provider),
        ))
    }
}
