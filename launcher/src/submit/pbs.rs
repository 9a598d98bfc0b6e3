use super::{render_vars, JobRequest, Scheduler};
use crate::config::SchedulerConfig;
use std::path::{Path, PathBuf};

/// `qsub` front end
#[derive(Clone, Debug)]
pub struct PbsScheduler {
    exec: PathBuf,
    queue: Option<String>,
}

impl PbsScheduler {
    pub fn load(config: &SchedulerConfig) -> Self {
        Self {
            exec: config
                .exec
                .clone()
                .unwrap_or_else(|| PathBuf::from("qsub")),
            queue: config.queue.clone(),
        }
    }
}

impl Scheduler for PbsScheduler {
    fn program(&self) -> &Path {
        &self.exec
    }

    fn argv(&self, request: &JobRequest) -> Vec<String> {
        let mut argv = vec![
            String::from("-N"),
            request.name.clone(),
            String::from("-l"),
            format!("walltime={}", request.walltime),
            String::from("-v"),
            render_vars(&request.vars),
        ];

        if let Some(queue) = &self.queue {
            argv.push(String::from("-q"));
            argv.push(queue.clone());
        }

        argv.push(request.script.to_string_lossy().into_owned());
        argv
    }
}
