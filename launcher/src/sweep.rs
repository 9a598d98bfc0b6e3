use crate::{
    config::{FailurePolicy, SweepConfig},
    cost,
    grid::{self, JobInstance},
    results::ResultsLocation,
    submit::{JobRequest, Schedulers, SubmitError},
};
use tracing::{error, info};

/// What one full sweep run did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub submitted: u64,
    pub failed: u64,
}

/// Submit the whole sweep, one blocking scheduler call per grid point.
///
/// Rejected submissions are counted and skipped unless `on_failure: halt`
/// is configured. Nothing is retried; requeueing a lost job is the
/// operator's call.
pub fn run(
    config: &SweepConfig,
    scheduler: &Schedulers,
    results: &ResultsLocation,
    dry_run: bool,
) -> Result<SweepSummary, SubmitError> {
    let total = grid::size(config);
    let mut summary = SweepSummary::default();

    for job in grid::jobs(config) {
        let request = request_for(&job, config, results);

        if dry_run {
            let (program, argv) = scheduler.render(&request);
            info!("[dry-run] {} {}", program.display(), argv.join(" "));
            summary.submitted += 1;
            continue;
        }

        match scheduler.submit(&request) {
            Ok(()) => {
                summary.submitted += 1;
                info!(
                    "Submitted {} ({}/{total})",
                    request.name,
                    summary.submitted + summary.failed
                );
            }
            Err(e) => {
                error!("Submission of {} failed: {e}", request.name);
                summary.failed += 1;

                if config.on_failure == FailurePolicy::Halt {
                    return Err(e);
                }
            }
        }
    }

    Ok(summary)
}

fn request_for(job: &JobInstance, config: &SweepConfig, results: &ResultsLocation) -> JobRequest {
    let seconds = cost::estimate_seconds(&config.cost, job.experiments, job.particles);

    JobRequest {
        name: format!("{}_{}", config.description, job.job_id),
        walltime: cost::format_walltime(seconds, config.walltime),
        vars: job_vars(job, config, results),
        script: config.scheduler.job_script.clone(),
    }
}

// every JobInstance field travels as a job environment variable, next to
// the shared results path and equation server host
fn job_vars(
    job: &JobInstance,
    config: &SweepConfig,
    results: &ResultsLocation,
) -> Vec<(String, String)> {
    vec![
        (String::from("QHL_JOB_ID"), job.job_id.to_string()),
        (String::from("QHL_EXPERIMENTS"), job.experiments.to_string()),
        (String::from("QHL_PARTICLES"), job.particles.to_string()),
        (
            String::from("QHL_BAYES_UPDATES"),
            job.bayes_updates.to_string(),
        ),
        (String::from("QHL_RESAMPLE_A"), job.resample_a.to_string()),
        (
            String::from("QHL_RESAMPLE_THRESHOLD"),
            job.resample_threshold.to_string(),
        ),
        (
            String::from("QHL_RESAMPLE_PGH"),
            job.resample_pgh.to_string(),
        ),
        (String::from("QHL_REPETITION"), job.repetition.to_string()),
        (
            String::from("QHL_RESULTS_DIR"),
            results.dir.display().to_string(),
        ),
        (String::from("QHL_SERVER_HOST"), config.server_host.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sweep_config() -> SweepConfig {
        serde_yaml::from_str(
            "
description: nv_qhl
axes:
  experiments: { min: 1000, max: 3000, step: 1000, default: 2000 }
  particles: { min: 1000, max: 3000, step: 1000, default: 2000 }
  resample_a: { min: 0.98, max: 0.98, step: 0.01, default: 0.98 }
  resample_threshold: { min: 0.5, max: 0.5, step: 0.1, default: 0.5 }
  resample_pgh: { min: 1.0, max: 1.0, step: 0.1, default: 1.0 }
repetitions:
  count: 5
scheduler:
  name: pbs
  job_script: run_qhl.sh
analysis:
  exec: ./analyse_sweep.py
",
        )
        .unwrap()
    }

    fn results() -> (tempfile::TempDir, ResultsLocation) {
        let base = tempfile::tempdir().unwrap();
        let location = ResultsLocation {
            dir: base.path().to_path_buf(),
        };
        (base, location)
    }

    #[test]
    fn dry_run_submits_nothing_but_counts_everything() {
        let config = sweep_config();
        let scheduler = Schedulers::load(&config.scheduler).unwrap();
        let (_base, results) = results();

        let summary = run(&config, &scheduler, &results, true).unwrap();

        assert_eq!(
            summary,
            SweepSummary {
                submitted: 45,
                failed: 0
            }
        );
    }

    #[test]
    fn request_carries_name_walltime_and_script() {
        let config = sweep_config();
        let (_base, results) = results();
        let job = grid::jobs(&config).next().unwrap();

        let request = request_for(&job, &config, &results);

        assert_eq!(request.name, "nv_qhl_1");
        // (1000 * 1000 + 1000 * 500) / 50 seconds, normalized
        assert_eq!(request.walltime, "08:20:00");
        assert_eq!(request.script, PathBuf::from("run_qhl.sh"));
    }

    #[test]
    fn every_job_field_reaches_the_environment() {
        let config = sweep_config();
        let (_base, results) = results();
        let job = grid::jobs(&config).next().unwrap();

        let vars = job_vars(&job, &config, &results);
        let keys: Vec<&str> = vars.iter().map(|(key, _)| key.as_str()).collect();

        assert_eq!(
            keys,
            vec![
                "QHL_JOB_ID",
                "QHL_EXPERIMENTS",
                "QHL_PARTICLES",
                "QHL_BAYES_UPDATES",
                "QHL_RESAMPLE_A",
                "QHL_RESAMPLE_THRESHOLD",
                "QHL_RESAMPLE_PGH",
                "QHL_REPETITION",
                "QHL_RESULTS_DIR",
                "QHL_SERVER_HOST",
            ]
        );

        let results_dir = vars
            .iter()
            .find(|(key, _)| key == "QHL_RESULTS_DIR")
            .map(|(_, value)| value.clone())
            .unwrap();
        assert_eq!(results_dir, results.dir.display().to_string());
    }

    #[test]
    fn raw_walltime_config_changes_the_request() {
        let mut config = sweep_config();
        config.walltime = crate::config::WalltimeFormat::Raw;
        let (_base, results) = results();
        let job = grid::jobs(&config).next().unwrap();

        let request = request_for(&job, &config, &results);

        assert_eq!(request.walltime, "00:00:30000");
    }
}
