use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::time::{Duration, Instant};
use rand::{distr::{Bernoulli, Distribution}, rng, rngs::ThreadRng};
use serde_derive::Serialize;
use tracing::{debug, info};
use crate::core::Error;
use crate::solver::{SolveStats, SolverState, StepObserver, StepView};

pub struct NullObserver;

impl StepObserver for NullObserver {
    fn after_step(&mut self, _step: &StepView) {}
}

/// Summary of a distribution of small non-negative counts.
#[derive(PartialEq, Clone, Debug, Serialize)]
pub struct Histogram {
    pub value_counts: BTreeMap<usize, usize>,
    pub count: usize,
    pub max: usize,
    pub mean: f64,
    pub median: f64,
}

impl Histogram {
    pub fn from_value_counts(value_counts: &BTreeMap<usize, usize>) -> Histogram {
        let count: usize = value_counts.values().sum();
        let total: usize = value_counts.iter().map(|(v, c)| v * c).sum();
        let max = value_counts.keys().next_back().copied().unwrap_or(0);
        let mean = if count == 0 { 0.0 } else { total as f64 / count as f64 };
        let nth = |n: usize| {
            let mut seen = 0;
            for (v, c) in value_counts {
                seen += c;
                if n < seen {
                    return *v;
                }
            }
            0
        };
        let median = if count == 0 {
            0.0
        } else {
            (nth((count - 1) / 2) + nth(count / 2)) as f64 / 2.0
        };
        Histogram { value_counts: value_counts.clone(), count, max, mean, median }
    }
}

enum SampleState {
    Never,
    AtEnd,
    EveryN(usize, usize),
    Probability(Bernoulli, ThreadRng),
    Time(Duration, Instant),
}

/// Decides which steps get logged.
pub struct Sample {
    state: SampleState,
}

impl Sample {
    pub fn never() -> Self {
        Self { state: SampleState::Never }
    }

    pub fn at_end() -> Self {
        Self { state: SampleState::AtEnd }
    }

    pub fn every_n(n: usize) -> Self {
        Self { state: SampleState::EveryN(n, 0) }
    }

    pub fn probability(p: f64) -> Result<Self, Error> {
        let d = Bernoulli::new(p).map_err(|e| Error::internal(e.to_string()))?;
        Ok(Self { state: SampleState::Probability(d, rng()) })
    }

    pub fn time(every: Duration) -> Self {
        Self { state: SampleState::Time(every, Instant::now()) }
    }

    fn sample(&mut self) -> bool {
        match &mut self.state {
            SampleState::Never | SampleState::AtEnd => false,
            SampleState::EveryN(n, count) => {
                *count += 1;
                if count >= n {
                    *count = 0;
                    true
                } else {
                    false
                }
            },
            SampleState::Probability(d, rng) => d.sample(rng),
            SampleState::Time(every, last) => {
                if last.elapsed() >= *every {
                    *last = Instant::now();
                    true
                } else {
                    false
                }
            },
        }
    }

    fn at_finish(&self) -> bool {
        !matches!(self.state, SampleState::Never)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DbgReport {
    pub steps: usize,
    pub seconds: f64,
    pub outcome: Option<SolverState>,
    pub stats: SolveStats,
    pub filled: Histogram,
    pub depth: Histogram,
    pub chains: Histogram,
}

/// Logs sampled solver steps through tracing and gathers histograms of
/// progress that can be written out as JSON.
pub struct DbgObserver {
    started: Option<Instant>,
    elapsed: Duration,
    print_sample: Sample,
    stats_file: Option<String>,
    filled_hist: BTreeMap<usize, usize>,
    depth_hist: BTreeMap<usize, usize>,
    chains_hist: BTreeMap<usize, usize>,
    outcome: Option<SolverState>,
    last_stats: SolveStats,
    steps: usize,
}

impl DbgObserver {
    pub fn new() -> Self {
        DbgObserver {
            started: None,
            elapsed: Duration::ZERO,
            print_sample: Sample::every_n(1),
            stats_file: None,
            filled_hist: BTreeMap::new(),
            depth_hist: BTreeMap::new(),
            chains_hist: BTreeMap::new(),
            outcome: None,
            last_stats: SolveStats::default(),
            steps: 0,
        }
    }

    pub fn sample_print(&mut self, sample: Sample) -> &mut Self {
        self.print_sample = sample;
        self
    }

    /// Write a JSON report to `filename` when the solve finishes.
    pub fn stats_to<S: Into<String>>(&mut self, filename: S) -> &mut Self {
        self.stats_file = Some(filename.into());
        self
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn report(&self) -> DbgReport {
        DbgReport {
            steps: self.steps,
            seconds: self.elapsed.as_secs_f64(),
            outcome: self.outcome,
            stats: self.last_stats.clone(),
            filled: Histogram::from_value_counts(&self.filled_hist),
            depth: Histogram::from_value_counts(&self.depth_hist),
            chains: Histogram::from_value_counts(&self.chains_hist),
        }
    }

    pub fn dump_stats(&self, filename: &str) -> Result<(), std::io::Error> {
        let mut f = File::create(filename)?;
        let json_data = serde_json::to_string_pretty(&self.report())?;
        f.write_all(json_data.as_bytes())?;
        Ok(())
    }
}

impl StepObserver for DbgObserver {
    fn after_step(&mut self, step: &StepView) {
        let started = *self.started.get_or_insert_with(Instant::now);
        self.elapsed = started.elapsed();
        self.steps += 1;
        let branch = step.branch;
        *self.filled_hist.entry(branch.grid.filled()).or_default() += 1;
        *self.depth_hist.entry(branch.depth).or_default() += 1;
        *self.chains_hist.entry(branch.chains.len()).or_default() += 1;
        self.last_stats = step.stats.clone();
        if self.print_sample.sample() {
            debug!(
                step = self.steps,
                state = ?step.state,
                depth = branch.depth,
                filled = branch.grid.filled(),
                chains = branch.chains.len(),
                "solver step\n{}",
                branch.grid,
            );
        }
    }

    fn on_finish(&mut self, state: SolverState, stats: &SolveStats) {
        if let Some(started) = self.started {
            self.elapsed = started.elapsed();
        }
        self.outcome = Some(state);
        self.last_stats = stats.clone();
        if self.print_sample.at_finish() {
            info!(
                outcome = ?state,
                steps = self.steps,
                seconds = self.elapsed.as_secs_f64(),
                branches = stats.branches,
                guesses = stats.guesses,
                "solver finished",
            );
        }
        if let Some(filename) = &self.stats_file {
            self.dump_stats(filename)
                .unwrap_or_else(|e| {
                    tracing::error!(file = %filename, error = %e, "failed to dump stats")
                });
        }
    }
}
