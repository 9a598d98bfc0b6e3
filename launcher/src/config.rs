use serde::{Deserialize, Serialize};
use std::{
    fs::File, io::Error, os::unix::fs::MetadataExt, path::Path, path::PathBuf, str::FromStr,
};
use thiserror::Error;
use tracing::error;

// check if a file is executable
pub fn check_executable(path: &PathBuf) -> Result<bool, ConfigErrors> {
    if !path.is_file() {
        Err(ConfigErrors::FileNotFound)
    } else {
        match File::open(path).map(|file| file.metadata()) {
            Ok(Ok(metadata)) => Ok((metadata.mode() & 0o111) != 0),
            Ok(Err(e)) | Err(e) => Err(ConfigErrors::MetadataNotFound(e)),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigErrors {
    #[error("Failed to parse sweep config")]
    InvalidConfig(#[from] serde_yaml::Error),
    #[error("Scheduler not supported")]
    UnsupportedScheduler(String),
    #[error("File not found")]
    FileNotFound,
    #[error("Metadata not found")]
    MetadataNotFound(#[from] Error),
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    // prefixes every job name, so keep it short and shell safe
    pub description: String,
    #[serde(default)]
    pub mode: SweepMode,
    // the five swept parameter axes, see grid for the iteration order
    pub axes: Axes,
    pub repetitions: RepetitionConfig,
    #[serde(default)]
    pub cost: CostConfig,
    #[serde(default)]
    pub walltime: WalltimeFormat,
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub on_failure: FailurePolicy,
    // host of the shared equation server every job phones home to
    #[serde(default = "default_server_host")]
    pub server_host: String,
    #[serde(default)]
    pub results: ResultsConfig,
    pub analysis: AnalysisConfig,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SweepMode {
    /// full Cartesian product over all axes
    #[default]
    Grid,
    /// each axis swept alone with the others held at their default
    OneAtATime,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// log rejected submissions and keep going
    #[default]
    Skip,
    /// abort the sweep at the first rejected submission
    Halt,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WalltimeFormat {
    /// seconds folded into HH:MM:SS
    #[default]
    Normalized,
    /// everything in the seconds field, as the first launch scripts did it
    Raw,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct Axes {
    pub experiments: IntAxis,
    pub particles: IntAxis,
    pub resample_a: FloatAxis,
    pub resample_threshold: FloatAxis,
    pub resample_pgh: FloatAxis,
}

/// Inclusive swept range plus the value used when the axis is not swept.
#[derive(Deserialize, Serialize, Clone, Copy, Debug)]
#[serde(deny_unknown_fields)]
pub struct IntAxis {
    pub min: u64,
    pub max: u64,
    pub step: u64,
    pub default: u64,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug)]
#[serde(deny_unknown_fields)]
pub struct FloatAxis {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub default: f64,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug)]
#[serde(deny_unknown_fields)]
pub struct RepetitionConfig {
    // first repetition index, ends up in the job environment unchanged
    #[serde(default = "default_first_repetition")]
    pub first: u32,
    pub count: u32,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug)]
#[serde(deny_unknown_fields)]
pub struct CostConfig {
    #[serde(default = "default_units_per_second")]
    pub units_per_second: u64,
    // floor for the estimate, disabled unless configured
    #[serde(default)]
    pub min_seconds: Option<u64>,
    // fixed walltime for every job, skips the heuristic entirely
    #[serde(default)]
    pub override_seconds: Option<u64>,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            units_per_second: default_units_per_second(),
            min_seconds: None,
            override_seconds: None,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    // name of the selected scheduler, see Schedulers::load for the selection
    pub name: String,
    // submission binary, defaults to whatever the backend expects on PATH
    #[serde(default)]
    pub exec: Option<PathBuf>,
    #[serde(default)]
    pub queue: Option<String>,
    // payload script the scheduler runs on the node for every job
    pub job_script: PathBuf,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct ResultsConfig {
    #[serde(default = "default_results_base")]
    pub base: PathBuf,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            base: default_results_base(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    // analysis program the emitted trigger script points at
    pub exec: PathBuf,
    #[serde(default = "default_trigger_name")]
    pub script_name: String,
}

impl SweepConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigErrors> {
        if !path.is_file() {
            return Err(ConfigErrors::FileNotFound);
        }

        let file = File::open(path)?;
        Ok(serde_yaml::from_reader(file)?)
    }

    pub fn preflight_checks(&mut self) -> bool {
        // attempt to catch all errors instead of piece-by-piece to make debugging easier for users
        let mut contains_error = false;

        if self.description.is_empty() {
            error!("description cannot be empty, it prefixes every job name");
            contains_error = true;
        }

        self.scheduler.name = self.scheduler.name.to_lowercase();
        match self.scheduler.name.as_str() {
            "pbs" | "slurm" => {}
            name => {
                error!("scheduler.name ({name}) is not supported, please use `pbs` or `slurm`");
                contains_error = true;
            }
        }

        for (name, axis) in [
            ("experiments", &self.axes.experiments),
            ("particles", &self.axes.particles),
        ] {
            if axis.step == 0 {
                error!("axes.{name}.step cannot be 0");
                contains_error = true;
            }
            if axis.min > axis.max {
                error!("axes.{name}.min must not exceed axes.{name}.max");
                contains_error = true;
            }
        }

        for (name, axis) in [
            ("resample_a", &self.axes.resample_a),
            ("resample_threshold", &self.axes.resample_threshold),
            ("resample_pgh", &self.axes.resample_pgh),
        ] {
            if !(axis.step > 0.0 && axis.step.is_finite()) {
                error!("axes.{name}.step must be a positive finite number");
                contains_error = true;
            }
            if axis.min > axis.max {
                error!("axes.{name}.min must not exceed axes.{name}.max");
                contains_error = true;
            }
        }

        if self.repetitions.count == 0 {
            error!("repetitions.count cannot be 0, the sweep would be empty");
            contains_error = true;
        }

        if self.cost.units_per_second == 0 {
            error!("cost.units_per_second cannot be 0");
            contains_error = true;
        }

        match check_executable(&self.scheduler.job_script) {
            Ok(true) => {}
            Ok(false) => {
                error!(
                    "scheduler.job_script {} is not executable, the scheduler would fail every job",
                    self.scheduler.job_script.to_string_lossy()
                );
                contains_error = true;
            }
            Err(e) => {
                error!(
                    "Failed to find scheduler.job_script at {}: {e}",
                    self.scheduler.job_script.to_string_lossy()
                );
                contains_error = true;
            }
        }

        contains_error
    }
}

fn default_server_host() -> String {
    String::from("localhost")
}

fn default_first_repetition() -> u32 {
    1
}

fn default_units_per_second() -> u64 {
    50
}

fn default_results_base() -> PathBuf {
    PathBuf::from_str("Results").unwrap()
}

fn default_trigger_name() -> String {
    String::from("analyse.sh")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    const MINIMAL: &str = "
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
";

    // a parsed MINIMAL with its job script pointing at a real executable
    fn checked_config() -> (TempDir, SweepConfig) {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("run_qhl.sh");
        std::fs::write(&script, "#!/bin/sh\n").unwrap();
        let mut permissions = std::fs::metadata(&script).unwrap().permissions();
        permissions.set_mode(0o755);
        std::fs::set_permissions(&script, permissions).unwrap();

        let mut config: SweepConfig = serde_yaml::from_str(MINIMAL).unwrap();
        config.scheduler.job_script = script;
        (dir, config)
    }

    #[test]
    fn minimal_config_defaults() {
        let config: SweepConfig = serde_yaml::from_str(MINIMAL).unwrap();

        assert_eq!(config.mode, SweepMode::Grid);
        assert_eq!(config.walltime, WalltimeFormat::Normalized);
        assert_eq!(config.on_failure, FailurePolicy::Skip);
        assert_eq!(config.repetitions.first, 1);
        assert_eq!(config.cost.units_per_second, 50);
        assert_eq!(config.cost.min_seconds, None);
        assert_eq!(config.server_host, "localhost");
        assert_eq!(config.results.base, PathBuf::from("Results"));
        assert_eq!(config.analysis.script_name, "analyse.sh");
    }

    #[test]
    fn mode_and_policy_spellings() {
        let config: SweepConfig = serde_yaml::from_str(&format!(
            "{MINIMAL}mode: one-at-a-time\non_failure: halt\nwalltime: raw\n"
        ))
        .unwrap();

        assert_eq!(config.mode, SweepMode::OneAtATime);
        assert_eq!(config.on_failure, FailurePolicy::Halt);
        assert_eq!(config.walltime, WalltimeFormat::Raw);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<SweepConfig, _> =
            serde_yaml::from_str(&format!("{MINIMAL}cutoff_time: 180\n"));

        assert!(result.is_err());
    }

    #[test]
    fn preflight_accepts_checked_config() {
        let (_dir, mut config) = checked_config();

        assert!(!config.preflight_checks());
    }

    #[test]
    fn preflight_rejects_zero_step() {
        let (_dir, mut config) = checked_config();
        config.axes.experiments.step = 0;

        assert!(config.preflight_checks());
    }

    #[test]
    fn preflight_rejects_negative_float_step() {
        let (_dir, mut config) = checked_config();
        config.axes.resample_a.step = -0.1;

        assert!(config.preflight_checks());
    }

    #[test]
    fn preflight_rejects_inverted_range_and_unknown_scheduler() {
        let (_dir, mut config) = checked_config();
        config.axes.particles.min = 5000;
        config.scheduler.name = String::from("condor");

        assert!(config.preflight_checks());
    }

    #[test]
    fn preflight_rejects_empty_sweep() {
        let (_dir, mut config) = checked_config();
        config.repetitions.count = 0;

        assert!(config.preflight_checks());
    }

    #[test]
    fn preflight_rejects_missing_job_script() {
        let (_dir, mut config) = checked_config();
        config.scheduler.job_script = PathBuf::from("does/not/exist.sh");

        assert!(config.preflight_checks());
    }

    #[test]
    fn executable_bit_is_detected() {
        let (dir, config) = checked_config();
        let plain = dir.path().join("notes.txt");
        std::fs::write(&plain, "hello").unwrap();

        assert!(check_executable(&config.scheduler.job_script).unwrap());
        assert!(!check_executable(&plain).unwrap());
        assert!(matches!(
            check_executable(&PathBuf::from("does/not/exist.sh")),
            Err(ConfigErrors::FileNotFound)
        ));
    }
}
