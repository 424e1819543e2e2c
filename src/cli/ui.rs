use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Row, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub fn heading(text: &str) -> String {
    style(text).bold().underlined().to_string()
}

pub fn done(text: &str) -> String {
    style(text).green().bold().to_string()
}

pub fn muted(text: &str) -> String {
    style(text).dim().to_string()
}

/// Empty two-column table of dates and USD rates.
pub fn rate_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(["Date", "USD"].map(|title| {
            Cell::new(title)
                .fg(Color::Cyan)
                .add_attribute(Attribute::Bold)
        }));
    table
}

/// A table row with the rate right-aligned.
pub fn rate_row(date: &str, usd: &str) -> Row {
    Row::from(vec![
        Cell::new(date),
        Cell::new(usd).set_alignment(CellAlignment::Right),
    ])
}

pub fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(template);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}
