mod config;
mod cost;
mod grid;
mod results;
mod submit;
mod sweep;
mod trigger;

use chrono::Local;
use clap::Parser;
use config::SweepConfig;
use results::ResultsLocation;
use std::{path::PathBuf, process::exit};
use submit::Schedulers;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Enumerate a parameter sweep and queue one batch job per combination.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// sweep configuration file
    #[arg(short, long, default_value = "sweep.yaml")]
    config: PathBuf,

    /// render every submission without calling the scheduler
    #[arg(long)]
    dry_run: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match SweepConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load sweep config from {}: {e}", cli.config.display());
            exit(1);
        }
    };

    // catch all config problems in one pass before anything is queued
    if config.preflight_checks() {
        error!("Preflight checks failed, nothing was submitted");
        exit(1);
    }

    let scheduler = match Schedulers::load(&config.scheduler) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            error!("Failed to load scheduler backend: {e}");
            exit(1);
        }
    };

    let results = match ResultsLocation::create(&config.results.base, Local::now()) {
        Ok(results) => results,
        Err(e) => {
            error!("{e}");
            exit(1);
        }
    };

    info!(
        "Sweeping {} combinations as {}",
        grid::size(&config),
        config.description
    );

    let summary = match sweep::run(&config, &scheduler, &results, cli.dry_run) {
        Ok(summary) => summary,
        Err(e) => {
            error!("Sweep halted: {e}");
            exit(1);
        }
    };

    if summary.failed > 0 {
        warn!(
            "{} of {} submissions were rejected, requeue them manually if needed",
            summary.failed,
            summary.submitted + summary.failed
        );
    }

    match trigger::write_analysis_trigger(&results, &config.analysis.exec, &config.analysis.script_name)
    {
        Ok(path) => info!("Run {} once the queue has drained", path.display()),
        Err(e) => {
            error!("{e}");
            exit(1);
        }
    }
}
