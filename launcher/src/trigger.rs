use crate::results::ResultsLocation;
use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum TriggerError {
    #[error("Failed to write the analysis trigger script")]
    Unwritable(#[from] std::io::Error),
}

/// Drop a runnable reminder of the analysis step into the results
/// directory.
///
/// Nothing here waits for the queued jobs; the operator runs the script
/// once the queue has drained.
pub fn write_analysis_trigger(
    results: &ResultsLocation,
    analysis_exec: &Path,
    script_name: &str,
) -> Result<PathBuf, TriggerError> {
    let path = results.dir.join(script_name);
    let script = format!(
        "#!/bin/sh\n# run once every job of this sweep has left the queue\nexec {} {}\n",
        analysis_exec.display(),
        results.dir.display(),
    );

    fs::write(&path, script)?;

    let mut permissions = fs::metadata(&path)?.permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&path, permissions)?;

    info!(path = ?path, "Wrote analysis trigger");
    Ok(path)
}
