use super::ui;
use crate::core::config::AppConfig;
use crate::core::{DailyRecord, RecordSink};
use crate::store::SqliteSink;
use anyhow::{Context, Result};
use comfy_table::Cell;

/// Renders stored records, newest first.
pub fn display_history(records: &[DailyRecord]) -> String {
    if records.is_empty() {
        return ui::style_text("No records stored yet", ui::StyleType::Subtle);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("JISDOR (IDR/USD)"),
        ui::header_cell("Gold sell (IDR)"),
    ]);

    for record in records {
        table.add_row(vec![
            Cell::new(record.date.format("%Y-%m-%d")),
            ui::amount_cell(record.rate),
            ui::amount_cell(record.gold_sell_price),
        ]);
    }

    format!(
        "{}\n\n{}",
        ui::style_text("Daily rates", ui::StyleType::Title),
        table
    )
}

pub fn show_history(config: &AppConfig, limit: usize) -> Result<()> {
    let path = config.database_path()?;
    let sink = SqliteSink::new(path.clone());
    let records = sink
        .recent(limit)
        .with_context(|| format!("Failed to read records from {}", path.display()))?;

    println!("{}", display_history(&records));
    Ok(())
}
