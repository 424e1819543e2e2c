pub mod disk;
pub mod memory;

use crate::core::config::AppConfig;
use crate::core::rate::RateStore;
use anyhow::{Context, Result};
use disk::DiskRateStore;
use std::sync::Arc;
use tracing::info;

/// Opens the persistent rate store under the configured data path.
pub fn open_rate_store(config: &AppConfig) -> Result<Arc<dyn RateStore>> {
    let db_path = config.default_data_path()?.join("rates");
    let store = DiskRateStore::open(&db_path)
        .with_context(|| format!("Failed to open rate store at {}", db_path.display()))?;
    info!("Using rate store at {}", db_path.display());
    Ok(Arc::new(store))
}
