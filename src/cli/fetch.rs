use super::ui;
use crate::state::AppState;
use anyhow::Result;

/// Runs one ingestion against the configured provider.
pub async fn run(state: &AppState) -> Result<()> {
    let spinner = ui::spinner("Fetching USD/TWD rates...");
    let result = state.ingest.fetch_and_store().await;
    spinner.finish_and_clear();

    result?;
    println!("{}", ui::done("USD/TWD rates fetched and stored"));
    Ok(())
}
