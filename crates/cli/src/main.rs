//! Moduleo report command-line entry point.
//!
//! Runs the nine-step extraction pipeline for a period and writes the
//! intermediate artifacts plus the combined report into the output
//! directory. With no dates given the previous calendar month is
//! reported, matching the monthly reporting cadence.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Local;
use clap::Parser;
use moduleo_core::{run_standard, ProgressObserver, RunSummary, StepContext, StepStatus};
use moduleo_domain::{ModuleoError, Period, Result};
use moduleo_infra::{config, load_mapping_tables, CsvArtifactStore, ModuleoClient};
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "moduleo-report", version, about = "Moduleo combined activity report")]
struct Args {
    /// Period start, DD/MM/YYYY. Defaults to the previous month.
    #[arg(long)]
    date_min: Option<String>,

    /// Period end, DD/MM/YYYY. Defaults to the previous month.
    #[arg(long)]
    date_max: Option<String>,

    /// Directory artifacts are written to (overrides configuration).
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Explicit configuration file instead of the standard probing.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logging first so configuration loading is visible.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match dotenvy::dotenv() {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(e) => info!(error = %e, "no .env file loaded"),
    }

    let args = Args::parse();
    match run(args).await {
        Ok(summary) if summary.succeeded() => ExitCode::SUCCESS,
        Ok(summary) => {
            error!(
                failed_step = summary.failed_step().unwrap_or("unknown"),
                "pipeline halted before completion"
            );
            ExitCode::FAILURE
        }
        Err(err) => {
            error!(error = %err, "run aborted");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<RunSummary> {
    let mut config = match &args.config {
        Some(path) => {
            let loaded = config::load_from_file(Some(path.clone()))?;
            loaded.validate()?;
            loaded
        }
        None => config::load()?,
    };
    if let Some(dir) = args.output_dir {
        config.pipeline.output_dir = dir;
    }

    let period = resolve_period(args.date_min.as_deref(), args.date_max.as_deref())?;
    if period.is_unusually_long() {
        warn!(
            date_min = %period.date_min(),
            date_max = %period.date_max(),
            "period spans more than a year"
        );
    }

    let api = ModuleoClient::new(&config.api, &config.retry, &config.pipeline)?;
    let store = CsvArtifactStore::new(config.pipeline.output_dir.clone())?;
    let mappings = load_mapping_tables(&config.pipeline);

    let ctx = StepContext::new(
        Arc::new(api),
        Arc::new(store),
        Arc::new(mappings),
        period,
    );

    let summary = run_standard(ctx, &TracingObserver).await?;
    report_summary(&summary);
    Ok(summary)
}

fn resolve_period(date_min: Option<&str>, date_max: Option<&str>) -> Result<Period> {
    match (date_min, date_max) {
        (Some(min), Some(max)) => Period::parse(min, max),
        (None, None) => {
            let period = Period::previous_month(Local::now().date_naive());
            info!(
                date_min = %period.date_min(),
                date_max = %period.date_max(),
                "no dates given, defaulting to the previous month"
            );
            Ok(period)
        }
        _ => Err(ModuleoError::InvalidInput(
            "either both --date-min and --date-max or neither must be given".to_string(),
        )),
    }
}

fn report_summary(summary: &RunSummary) {
    for report in &summary.reports {
        match report.status {
            StepStatus::Succeeded => {
                if let Some(output) = &report.output {
                    info!(step = %report.name, output = %output.display(), "ok");
                }
            }
            StepStatus::Failed => {
                error!(step = %report.name, error = report.error.as_deref().unwrap_or(""), "failed");
            }
            _ => info!(step = %report.name, "skipped"),
        }
    }
    if let Some(path) = &summary.final_artifact {
        info!(report = %path.display(), "combined report written");
    }
    if let Some(path) = &summary.dashboard_copy {
        info!(dashboard = %path.display(), "dashboard data refreshed");
    }
}

/// Progress observer relaying step events to the log.
struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn step_started(&self, index: usize, total: usize, name: &str) {
        info!("[{index}/{total}] {name}...");
    }

    fn step_succeeded(&self, index: usize, total: usize, name: &str, output: &Path) {
        info!("[{index}/{total}] {name} done ({})", output.display());
    }

    fn step_failed(&self, index: usize, total: usize, name: &str, error: &ModuleoError) {
        error!("[{index}/{total}] {name} failed: {error}");
    }
}
