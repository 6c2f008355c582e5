//! Monte Carlo simulator
//!
//! Projects a distribution of future portfolio values over a horizon from
//! annualized mean/volatility estimates. Path generation is embarrassingly
//! parallel: it shards across scoped worker threads and merges by
//! concatenation before percentile computation.

use crate::errors::{AnalyticsError, Result};
use crate::risk::rng_from_seed;
use crate::stats;
use crate::types::{PercentileBand, ReturnSeries, SimulationResult};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default percentile bands reported per simulated year
pub const DEFAULT_PERCENTILES: [f64; 5] = [5.0, 25.0, 50.0, 75.0, 95.0];

/// Monte Carlo run parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    /// Starting portfolio value
    pub initial_value: f64,
    /// Projection horizon in years
    pub years: usize,
    /// Number of simulated paths
    pub simulations: usize,
    /// Fixed contribution added at each year boundary
    pub annual_contribution: f64,
    /// Percentile levels for the per-year bands
    pub percentiles: Vec<f64>,
    /// Target values for goal-probability estimates
    pub targets: Vec<f64>,
    /// Explicit seed for reproducible runs, `None` for entropy
    pub seed: Option<u64>,
    /// Number of raw paths to retain for visualization
    pub sample_paths: usize,
    /// Worker threads to shard path generation across
    pub threads: usize,
}

impl MonteCarloConfig {
    /// Config with the conventional percentile bands and a single worker.
    #[must_use]
    pub fn new(initial_value: f64, years: usize, simulations: usize) -> Self {
        Self {
            initial_value,
            years,
            simulations,
            annual_contribution: 0.0,
            percentiles: DEFAULT_PERCENTILES.to_vec(),
            targets: Vec::new(),
            seed: None,
            sample_paths: 0,
            threads: 1,
        }
    }
}

/// Run a Monte Carlo projection over a historical return series.
///
/// Annual mean and volatility are estimated by annualizing the period
/// statistics of `series`. Each path draws one annual return per year from
/// Normal(mean, vol), compounds the value (floored at zero), then adds the
/// annual contribution.
pub fn run_monte_carlo(
    series: &ReturnSeries,
    periods_per_year: f64,
    config: &MonteCarloConfig,
) -> Result<SimulationResult> {
    if config.years == 0 {
        return Err(AnalyticsError::InvalidParameter(
            "projection horizon must be at least one year".to_string(),
        ));
    }
    if config.simulations == 0 {
        return Err(AnalyticsError::InvalidParameter(
            "at least one simulated path is required".to_string(),
        ));
    }
    if !config.initial_value.is_finite() || config.initial_value < 0.0 {
        return Err(AnalyticsError::InvalidParameter(format!(
            "initial value {} is not a finite non-negative number",
            config.initial_value
        )));
    }

    let returns = stats::finite(series.values());
    let annual_mean = stats::mean(&returns) * periods_per_year;
    let annual_volatility = stats::std_dev(&returns) * periods_per_year.sqrt();
    if returns.len() < 2 {
        debug!(
            observations = returns.len(),
            "thin return history, simulation volatility degenerates to zero"
        );
    }
    let sampler = Normal::new(annual_mean, annual_volatility)
        .map_err(|e| AnalyticsError::InvalidParameter(format!("normal fit failed: {e}")))?;

    let paths = generate_paths(config, sampler)?;

    let mut percentiles = config.percentiles.clone();
    percentiles.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let bands = percentiles
        .iter()
        .map(|&p| PercentileBand {
            percentile: p,
            values: (0..config.years)
                .map(|year| {
                    let column: Vec<f64> = paths.iter().map(|path| path[year]).collect();
                    stats::percentile(&column, p)
                })
                .collect(),
        })
        .collect();

    let terminals: Vec<f64> = paths.iter().map(|path| path[config.years - 1]).collect();
    let goal_probabilities = config
        .targets
        .iter()
        .map(|&target| {
            let hits = terminals.iter().filter(|&&v| v > target).count();
            (target, hits as f64 / terminals.len() as f64)
        })
        .collect();

    let sample_paths = paths
        .iter()
        .take(config.sample_paths)
        .cloned()
        .collect();

    Ok(SimulationResult {
        annual_mean,
        annual_volatility,
        bands,
        goal_probabilities,
        sample_paths,
    })
}

/// Shard path generation across scoped worker threads. Each shard gets its
/// own RNG seeded from the master stream so seeded runs stay reproducible
/// regardless of thread interleaving; results merge by concatenation.
fn generate_paths(config: &MonteCarloConfig, sampler: Normal<f64>) -> Result<Vec<Vec<f64>>> {
    let shard_count = config.threads.max(1).min(config.simulations);
    let mut master = rng_from_seed(config.seed);
    let shard_seeds: Vec<u64> = (0..shard_count).map(|_| master.next_u64()).collect();

    let base = config.simulations / shard_count;
    let remainder = config.simulations % shard_count;

    std::thread::scope(|scope| {
        let handles: Vec<_> = shard_seeds
            .iter()
            .enumerate()
            .map(|(i, &seed)| {
                let count = base + usize::from(i < remainder);
                scope.spawn(move || {
                    let mut rng = StdRng::seed_from_u64(seed);
                    (0..count)
                        .map(|_| simulate_path(config, sampler, &mut rng))
                        .collect::<Vec<Vec<f64>>>()
                })
            })
            .collect();

        let mut paths = Vec::with_capacity(config.simulations);
        for handle in handles {
            let shard = handle.join().map_err(|_| {
                AnalyticsError::InvalidParameter("simulation worker panicked".to_string())
            })?;
            paths.extend(shard);
        }
        Ok(paths)
    })
}

/// One path: a value per simulated year.
fn simulate_path(config: &MonteCarloConfig, sampler: Normal<f64>, rng: &mut StdRng) -> Vec<f64> {
    let mut value = config.initial_value;
    (0..config.years)
        .map(|_| {
            let annual_return = sampler.sample(rng);
            value = (value * (1.0 + annual_return)).max(0.0);
            value += config.annual_contribution;
            value
        })
        .collect()
}
