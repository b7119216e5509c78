pub mod cli;
pub mod core;
pub mod pipeline;
pub mod providers;
pub mod scheduler;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::{Clock, DailyRecord, SystemClock};
use crate::pipeline::Pipeline;
use crate::providers::indogold::IndogoldProvider;
use crate::providers::jisdor::JisdorProvider;
use crate::scheduler::TaskRunner;
use crate::store::SqliteSink;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Run,
    History { limit: usize },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Run => {
            let clock = Arc::new(SystemClock::new(config.utc_offset()?));
            run_daily(&config, clock).await?;
            Ok(())
        }
        AppCommand::History { limit } => cli::history::show_history(&config, limit),
    }
}

/// Performs one scheduled run for the clock's current date.
///
/// Returns `None` when the date is before the schedule's start date.
pub async fn run_daily(config: &AppConfig, clock: Arc<dyn Clock>) -> Result<Option<DailyRecord>> {
    let today = clock.today();
    if !config.schedule.is_active_on(today) {
        info!(%today, start_date = ?config.schedule.start_date, "Schedule not started, skipping run");
        return Ok(None);
    }

    let client = config.http.client()?;
    let rate_config = &config.sources.rate;
    let rate_source =
        JisdorProvider::new(client.clone(), &rate_config.url, &rate_config.container_id)
            .with_header_rows(rate_config.header_rows)
            .with_selection(rate_config.selection);
    let gold_source = IndogoldProvider::new(client, &config.sources.gold.url, clock);
    let sink = SqliteSink::new(config.database_path()?);

    let pipeline = Pipeline::new(Arc::new(rate_source), Arc::new(gold_source), Arc::new(sink))
        .with_product_type(&config.sources.gold.product_type)
        .with_pairing(config.pairing);

    info!(
        owner = %config.schedule.owner,
        %today,
        connection = %config.connection,
        "Starting daily run"
    );
    let record = pipeline
        .run(&TaskRunner::from(&config.schedule))
        .await
        .with_context(|| format!("Daily run for {today} failed"))?;
    Ok(Some(record))
}
