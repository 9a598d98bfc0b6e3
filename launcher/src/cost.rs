use crate::config::{CostConfig, WalltimeFormat};

/// number of bayes updates a job performs, half its experiment count
pub fn bayes_updates(experiments: u64) -> u64 {
    experiments / 2
}

/// Walltime estimate for one job in seconds.
///
/// `experiments * particles + particles * bayes_updates` work units at
/// `units_per_second`. A rough linear guess, not a measured model; set
/// `override_seconds` when the queue needs something else and
/// `min_seconds` to keep very small jobs from requesting seconds-long
/// walltimes.
pub fn estimate_seconds(config: &CostConfig, experiments: u64, particles: u64) -> u64 {
    if let Some(seconds) = config.override_seconds {
        return seconds;
    }

    let units = experiments * particles + particles * bayes_updates(experiments);
    let seconds = units / config.units_per_second;

    match config.min_seconds {
        Some(cutoff) => seconds.max(cutoff),
        None => seconds,
    }
}

/// render seconds as the walltime string handed to the scheduler
pub fn format_walltime(seconds: u64, format: WalltimeFormat) -> String {
    match format {
        WalltimeFormat::Normalized => format!(
            "{:02}:{:02}:{:02}",
            seconds / 3600,
            (seconds % 3600) / 60,
            seconds % 60
        ),
        // historical layout with everything in the seconds field, kept for
        // schedulers configured to accept it
        WalltimeFormat::Raw => format!("00:00:{seconds:02}"),
    }
}
