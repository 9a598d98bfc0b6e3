use chrono::{DateTime, Local};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ResultsError {
    #[error("Failed to create results directory {path}")]
    Uncreatable {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Shared output directory of one sweep, keyed by launch time.
///
/// Every queued job writes its results here and the analysis step reads
/// the whole directory, so the `<base>/Oct_02/18_01` layout is part of the
/// contract with the downstream tooling.
#[derive(Debug, Clone)]
pub struct ResultsLocation {
    pub dir: PathBuf,
}

impl ResultsLocation {
    pub fn create(base: &Path, stamp: DateTime<Local>) -> Result<Self, ResultsError> {
        let dir = base
            .join(stamp.format("%b_%d").to_string())
            .join(stamp.format("%H_%M").to_string());

        fs::create_dir_all(&dir).map_err(|source| ResultsError::Uncreatable {
            path: dir.clone(),
            source,
        })?;

        info!(dir = ?dir, "Created results directory");
        Ok(Self { dir })
    }
}
