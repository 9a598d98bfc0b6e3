use super::{render_vars, JobRequest, Scheduler};
use crate::config::SchedulerConfig;
use std::path::{Path, PathBuf};

/// `sbatch` front end
#[derive(Clone, Debug)]
pub struct SlurmScheduler {
    exec: PathBuf,
    partition: Option<String>,
}

impl SlurmScheduler {
    pub fn load(config: &SchedulerConfig) -> Self {
        Self {
            exec: config
                .exec
                .clone()
                .unwrap_or_else(|| PathBuf::from("sbatch")),
            partition: config.queue.clone(),
        }
    }
}

impl Scheduler for SlurmScheduler {
    fn program(&self) -> &Path {
        &self.exec
    }

    fn argv(&self, request: &JobRequest) -> Vec<String> {
        let mut argv = vec![
            format!("--job-name={}", request.name),
            format!("--time={}", request.walltime),
            // ALL keeps the submission environment, the job variables come on top
            format!("--export=ALL,{}", render_vars(&request.vars)),
        ];

        if let Some(partition) = &self.partition {
            argv.push(format!("--partition={partition}"));
        }

        argv.push(request.script.to_string_lossy().into_owned());
        argv
    }
}
