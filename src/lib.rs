pub mod cli;
pub mod core;
pub mod jobs;
pub mod providers;
pub mod server;
pub mod store;

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::core::config::AppConfig;
use crate::core::currency::normalize_code;
use crate::core::rates::RateSource;
use crate::jobs::Schedulers;
use crate::jobs::reporting::ReportJob;
use crate::jobs::sampling::SamplingJob;
use crate::server::AppState;

pub enum AppCommand {
    Serve,
    Sample,
    Report,
    Show { daily: bool },
    Rate { base: String, target: String },
}

fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

fn rate_source(config: &AppConfig) -> Result<Arc<dyn RateSource>> {
    Ok(Arc::new(providers::rate_source(config)?))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fxtrack starting...");
    let config = load_config(config_path)?;

    match command {
        AppCommand::Serve => serve(&config).await,
        AppCommand::Sample => {
            let job = SamplingJob::new(
                rate_source(&config)?,
                store::open_store(&config)?,
                &config.base_currency,
            );
            let recorded = job.sample(Utc::now()).await?;
            println!("{}", cli::show::recorded_changes(&recorded));
            Ok(())
        }
        AppCommand::Report => {
            let job = ReportJob::new(
                store::open_store(&config)?,
                store::report_document(&config)?,
                config.schedule.report_window(),
            );
            let report = job.generate(Utc::now()).await?;
            println!("{}", cli::show::history_table("Daily report", &report));
            Ok(())
        }
        AppCommand::Show { daily: true } => {
            let report = store::report_document(&config)?
                .read()
                .await
                .context("Failed to read the daily report")?
                .unwrap_or_default();
            println!("{}", cli::show::history_table("Daily report", &report));
            Ok(())
        }
        AppCommand::Show { daily: false } => {
            let history = store::open_store(&config)?
                .load()
                .await
                .context("Failed to load the rate history")?;
            println!("{}", cli::show::history_table("Rate history", &history));
            Ok(())
        }
        AppCommand::Rate { base, target } => {
            let base = normalize_code(&base)
                .with_context(|| format!("Invalid currency code: {base}"))?;
            let target = normalize_code(&target)
                .with_context(|| format!("Invalid currency code: {target}"))?;
            let rate = rate_source(&config)?
                .fetch_pair(&base, &target)
                .await
                .with_context(|| format!("Failed to fetch the {base}/{target} rate"))?;
            println!("1 {base} = {rate} {target}");
            Ok(())
        }
    }
}

async fn serve(config: &AppConfig) -> Result<()> {
    let source = rate_source(config)?;
    let store = store::open_store(config)?;
    let report = store::report_document(config)?;

    let schedulers = Arc::new(Schedulers::new(
        SamplingJob::new(source.clone(), store.clone(), &config.base_currency),
        ReportJob::new(store.clone(), report.clone(), config.schedule.report_window()),
        config.schedule.sample_interval(),
        config.schedule.report_interval(),
    ));
    if config.schedule.autostart {
        schedulers.trigger().await;
    }

    let state = Arc::new(AppState {
        source,
        store,
        report,
        schedulers: schedulers.clone(),
    });
    let listener = server::bind(&config.server.bind).await?;
    let result = server::serve(listener, state, shutdown_signal()).await;

    schedulers.shutdown().await;
    info!("fxtrack stopped");
    result
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
