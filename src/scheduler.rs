//! Background scheduler for the daily rate ingestion.

use crate::state::AppState;
use chrono::{DateTime, Days, FixedOffset, NaiveTime};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Time left until the next `at` strictly after `now`, in `now`'s offset.
pub fn duration_until_next(now: DateTime<FixedOffset>, at: NaiveTime) -> Duration {
    let today = now.date_naive();
    let mut next = today.and_time(at);
    if next <= now.naive_local() {
        next = today
            .checked_add_days(Days::new(1))
            .map(|d| d.and_time(at))
            .unwrap_or(next);
    }
    (next - now.naive_local()).to_std().unwrap_or_default()
}

/// Starts the daily ingestion loop. Failed runs are logged and wait for the
/// next day.
pub fn start_daily_ingestion(state: Arc<AppState>, at: NaiveTime) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Daily rate ingestion scheduled at {}", at.format("%H:%M"));
        loop {
            let wait = duration_until_next(state.clock.now(), at);
            info!("Next rate ingestion in {}s", wait.as_secs());
            tokio::time::sleep(wait).await;
            run_scheduled_ingestion(&state).await;
        }
    })
}

/// Runs a single scheduled ingestion.
pub async fn run_scheduled_ingestion(state: &AppState) {
    info!("Running scheduled rate ingestion...");
    match state.ingest.fetch_and_store().await {
        Ok(()) => info!("Scheduled rate ingestion completed"),
        Err(e) => warn!("Scheduled rate ingestion failed: {}", e),
    }
}
