use super::ui;
use crate::query::QueryResponse;
use crate::state::AppState;
use anyhow::{Result, bail};
use comfy_table::Table;

/// Queries the local store and prints the envelope, as a table or raw JSON.
pub async fn run(state: &AppState, start: &str, end: &str, json: bool) -> Result<()> {
    let response = state.query.query(start, end).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else if response.is_success() {
        println!(
            "\n{}",
            ui::heading(&format!("USD/TWD {start} - {end}"))
        );
        println!("{}", render_table(&response));
    }

    if !response.is_success() {
        bail!("{} {}", response.error.code, response.error.message);
    }
    Ok(())
}

fn render_table(response: &QueryResponse) -> Table {
    let mut table = ui::rate_table();

    let rows = response.currency.as_deref().unwrap_or_default();
    if rows.is_empty() {
        table.add_row(vec![ui::muted("No rates stored for this range"), String::new()]);
    }
    for row in rows {
        table.add_row(ui::rate_row(&row.date, &row.usd));
    }
    table
}
