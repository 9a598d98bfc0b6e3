pub mod pbs;
pub mod slurm;


use crate::config::{ConfigErrors, SchedulerConfig};
use itertools::Itertools;
use std::{
    path::{Path, PathBuf},
    process::{Command, Stdio},
};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Failed to spawn the scheduler submission binary")]
    Spawn(#[from] std::io::Error),
    #[error("Scheduler rejected the submission (exit code {code:?}): {stderr}")]
    Rejected { code: Option<i32>, stderr: String },
}

/// Everything one submission call carries, already rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    pub name: String,
    pub walltime: String,
    pub vars: Vec<(String, String)>,
    pub script: PathBuf,
}

/// argv rendering seam for the scheduler backends
pub trait Scheduler {
    /// submission binary
    fn program(&self) -> &Path;
    /// full argument list for one job, the payload script last
    fn argv(&self, request: &JobRequest) -> Vec<String>;
}

#[derive(Clone, Debug)]
pub enum Schedulers {
    Pbs(pbs::PbsScheduler),
    Slurm(slurm::SlurmScheduler),
}

impl Schedulers {
    pub fn load(config: &SchedulerConfig) -> Result<Self, ConfigErrors> {
        match config.name.as_str() {
            "pbs" => Ok(Self::Pbs(pbs::PbsScheduler::load(config))),
            "slurm" => Ok(Self::Slurm(slurm::SlurmScheduler::load(config))),
            _ => Err(ConfigErrors::UnsupportedScheduler(config.name.clone())),
        }
    }

    fn backend(&self) -> &dyn Scheduler {
        match self {
            Self::Pbs(scheduler) => scheduler,
            Self::Slurm(scheduler) => scheduler,
        }
    }

    /// render the full command line for a request without running it
    pub fn render(&self, request: &JobRequest) -> (PathBuf, Vec<String>) {
        let backend = self.backend();
        (backend.program().to_path_buf(), backend.argv(request))
    }

    /// Submit one job and wait for the submission call to return.
    ///
    /// The id the scheduler prints on stdout is logged and dropped, the
    /// queued job's lifecycle belongs to the scheduler from here on.
    // TODO: pack repetitions of one grid point into a scheduler job array
    // instead of one submission call each
    pub fn submit(&self, request: &JobRequest) -> Result<(), SubmitError> {
        let (program, argv) = self.render(request);

        let output = Command::new(&program)
            .args(&argv)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;

        if output.status.success() {
            let scheduler_id = String::from_utf8_lossy(&output.stdout);
            debug!(
                job = %request.name,
                scheduler_id = %scheduler_id.trim(),
                "Submission accepted"
            );

            Ok(())
        } else {
            Err(SubmitError::Rejected {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

/// `k=v,k=v` list as qsub -v and sbatch --export expect it
pub fn render_vars(vars: &[(String, String)]) -> String {
    vars.iter()
        .map(|(key, value)| format!("{key}={value}"))
        .join(",")
}
