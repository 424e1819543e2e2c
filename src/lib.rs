pub mod api;
pub mod cli;
pub mod core;
pub mod ingest;
pub mod providers;
pub mod query;
pub mod scheduler;
pub mod state;
pub mod store;

use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    Serve,
    Fetch,
    Query {
        start: String,
        end: String,
        json: bool,
    },
}

pub fn load_config(config_path: Option<&str>) -> Result<crate::core::config::AppConfig> {
    let config = match config_path {
        Some(path) => crate::core::config::AppConfig::load_from_path(path)?,
        None => crate::core::config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("USD/TWD rate service starting...");

    let config = load_config(config_path)?;
    let state = state::AppState::from_config(&config)?;

    match command {
        AppCommand::Serve => cli::serve::run(&config, state).await,
        AppCommand::Fetch => cli::fetch::run(&state).await,
        AppCommand::Query { start, end, json } => {
            cli::query::run(&state, &start, &end, json).await
        }
    }
}
