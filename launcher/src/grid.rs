use crate::{
    config::{Axes, FloatAxis, IntAxis, SweepConfig, SweepMode},
    cost,
};
use itertools::iproduct;

/// One point of the sweep, handed to the submitter exactly once.
///
/// Every derived field is a function of this instance's own parameters,
/// nothing is shared between instances except the sequential id.
#[derive(Debug, Clone, PartialEq)]
pub struct JobInstance {
    pub job_id: u64,
    pub experiments: u64,
    pub particles: u64,
    pub bayes_updates: u64,
    pub resample_a: f64,
    pub resample_threshold: f64,
    pub resample_pgh: f64,
    pub repetition: u32,
}

impl JobInstance {
    fn new(job_id: u64, point: GridPoint, repetition: u32) -> Self {
        Self {
            job_id,
            experiments: point.experiments,
            particles: point.particles,
            bayes_updates: cost::bayes_updates(point.experiments),
            resample_a: point.resample_a,
            resample_threshold: point.resample_threshold,
            resample_pgh: point.resample_pgh,
            repetition,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct GridPoint {
    experiments: u64,
    particles: u64,
    resample_a: f64,
    resample_threshold: f64,
    resample_pgh: f64,
}

impl IntAxis {
    /// number of swept values, ceil((max - min) / step) + 1
    pub fn count(&self) -> u64 {
        let span = self.max - self.min;
        span / self.step + u64::from(span % self.step != 0) + 1
    }

    /// all swept values, `min + i * step`
    ///
    /// the last value overshoots max when the span is not step aligned,
    /// the count above is the contract
    pub fn values(&self) -> Vec<u64> {
        (0..self.count()).map(|i| self.min + i * self.step).collect()
    }
}

impl FloatAxis {
    /// number of swept values, ceil((max - min) / step) + 1
    pub fn count(&self) -> u64 {
        // the small shift swallows float noise from the division so a
        // step-aligned span is not counted one too long
        ((self.max - self.min) / self.step - 1e-9).ceil().max(0.0) as u64 + 1
    }

    pub fn values(&self) -> Vec<f64> {
        (0..self.count())
            .map(|i| self.min + i as f64 * self.step)
            .collect()
    }
}

/// Lazy enumeration of every job of the sweep, ids starting at 1.
///
/// Axis order is fixed: experiments, particles, resample_a,
/// resample_threshold, resample_pgh, with the repetition index innermost.
pub fn jobs(config: &SweepConfig) -> impl Iterator<Item = JobInstance> + '_ {
    let first = config.repetitions.first;
    let count = config.repetitions.count;

    points(&config.axes, config.mode)
        .flat_map(move |point| (first..first + count).map(move |repetition| (point, repetition)))
        .zip(1u64..)
        .map(|((point, repetition), job_id)| JobInstance::new(job_id, point, repetition))
}

/// total number of jobs `jobs` will yield for this config
pub fn size(config: &SweepConfig) -> u64 {
    let axes = &config.axes;
    let counts = [
        axes.experiments.count(),
        axes.particles.count(),
        axes.resample_a.count(),
        axes.resample_threshold.count(),
        axes.resample_pgh.count(),
    ];
    let repetitions = u64::from(config.repetitions.count);

    match config.mode {
        SweepMode::Grid => counts.iter().product::<u64>() * repetitions,
        SweepMode::OneAtATime => counts.iter().sum::<u64>() * repetitions,
    }
}

fn points(axes: &Axes, mode: SweepMode) -> Box<dyn Iterator<Item = GridPoint>> {
    match mode {
        SweepMode::Grid => Box::new(
            iproduct!(
                axes.experiments.values(),
                axes.particles.values(),
                axes.resample_a.values(),
                axes.resample_threshold.values(),
                axes.resample_pgh.values()
            )
            .map(
                |(experiments, particles, resample_a, resample_threshold, resample_pgh)| {
                    GridPoint {
                        experiments,
                        particles,
                        resample_a,
                        resample_threshold,
                        resample_pgh,
                    }
                },
            ),
        ),
        SweepMode::OneAtATime => {
            let base = GridPoint {
                experiments: axes.experiments.default,
                particles: axes.particles.default,
                resample_a: axes.resample_a.default,
                resample_threshold: axes.resample_threshold.default,
                resample_pgh: axes.resample_pgh.default,
            };

            let experiments = axes
                .experiments
                .values()
                .into_iter()
                .map(move |value| GridPoint {
                    experiments: value,
                    ..base
                });
            let particles = axes
                .particles
                .values()
                .into_iter()
                .map(move |value| GridPoint {
                    particles: value,
                    ..base
                });
            let resample_a = axes
                .resample_a
                .values()
                .into_iter()
                .map(move |value| GridPoint {
                    resample_a: value,
                    ..base
                });
            let resample_threshold =
                axes.resample_threshold
                    .values()
                    .into_iter()
                    .map(move |value| GridPoint {
                        resample_threshold: value,
                        ..base
                    });
            let resample_pgh = axes
                .resample_pgh
                .values()
                .into_iter()
                .map(move |value| GridPoint {
                    resample_pgh: value,
                    ..base
                });

            Box::new(
                experiments
                    .chain(particles)
                    .chain(resample_a)
                    .chain(resample_threshold)
                    .chain(resample_pgh),
            )
        }
    }
}
