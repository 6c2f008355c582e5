//! Value objects shared by all calculators
//!
//! Every type here is a plain immutable record: calculators return freshly
//! constructed results and never mutate their inputs.

use crate::errors::{AnalyticsError, Result};
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Asset identifier to non-negative weight. Weights need not pre-sum to 1;
/// consumers renormalize over the assets actually present in the return data.
pub type WeightMap = FxHashMap<String, f64>;

/// An ordered sequence of (timestamp, fractional period return) pairs.
///
/// Timestamps are strictly increasing; values are period returns
/// (0.01 = 1%), not prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
}

impl ReturnSeries {
    /// Build a series, validating shape and timestamp ordering.
    pub fn new(timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(AnalyticsError::InvalidSeries(format!(
                "{} timestamps vs {} values",
                timestamps.len(),
                values.len()
            )));
        }
        if timestamps.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AnalyticsError::InvalidSeries(
                "timestamps must be strictly increasing".to_string(),
            ));
        }
        Ok(Self { timestamps, values })
    }

    /// Internal constructor for indices already known to be sorted and unique.
    pub(crate) fn from_sorted_unchecked(
        timestamps: Vec<DateTime<Utc>>,
        values: Vec<f64>,
    ) -> Self {
        debug_assert_eq!(timestamps.len(), values.len());
        debug_assert!(timestamps.windows(2).all(|w| w[0] < w[1]));
        Self { timestamps, values }
    }

    /// All-zero series over the given (sorted, unique) date index.
    pub(crate) fn zeros(timestamps: Vec<DateTime<Utc>>) -> Self {
        let values = vec![0.0; timestamps.len()];
        Self::from_sorted_unchecked(timestamps, values)
    }

    /// Number of observations
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series holds no observations
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Return values in timestamp order
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Timestamps in increasing order
    #[must_use]
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Look up the return at an exact timestamp
    #[must_use]
    pub fn value_at(&self, ts: DateTime<Utc>) -> Option<f64> {
        self.timestamps
            .binary_search(&ts)
            .ok()
            .map(|i| self.values[i])
    }

    /// Iterate (timestamp, return) pairs
    pub fn iter(&self) -> impl Iterator<Item = (DateTime<Utc>, f64)> + '_ {
        self.timestamps
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }
}

/// Metric discriminant for the flat [`MetricValue`] record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    /// Annualized volatility
    Volatility,
    /// Value at Risk (positive loss magnitude)
    ValueAtRisk,
    /// Conditional VaR / expected shortfall
    ConditionalValueAtRisk,
    /// Maximum drawdown (positive fraction)
    MaxDrawdown,
    /// Root-mean-square of the underwater series
    UlcerIndex,
    /// Mean absolute underwater value
    PainIndex,
    /// Annualized return over pain index
    PainRatio,
    /// Annualized geometric return
    AnnualizedReturn,
    /// Sample skewness of period returns
    Skewness,
    /// Sample excess kurtosis of period returns
    Kurtosis,
    /// Sharpe ratio
    Sharpe,
    /// Sortino ratio
    Sortino,
    /// Treynor ratio
    Treynor,
    /// Calmar ratio
    Calmar,
    /// Information ratio
    InformationRatio,
    /// Jensen's alpha
    Alpha,
    /// Beta against the benchmark
    Beta,
}

/// One named scalar result with optional context.
///
/// Flat tagged record instead of a metric class hierarchy; the `degenerate`
/// flag distinguishes "computed 0.0" from "defaulted to 0.0 on degenerate
/// input".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    /// Which metric this is
    pub kind: MetricKind,
    /// Scalar value
    pub value: f64,
    /// Confidence level, for tail metrics
    pub confidence: Option<f64>,
    /// Time period label, e.g. "annual"
    pub period: Option<String>,
    /// Benchmark comparator value, where one applies
    pub benchmark: Option<f64>,
    /// True when the value is a documented neutral default
    pub degenerate: bool,
}

impl MetricValue {
    /// A computed (non-degenerate) metric
    #[must_use]
    pub fn new(kind: MetricKind, value: f64) -> Self {
        Self {
            kind,
            value,
            confidence: None,
            period: None,
            benchmark: None,
            degenerate: false,
        }
    }

    /// A neutral default returned on degenerate input
    #[must_use]
    pub fn degenerate(kind: MetricKind, value: f64) -> Self {
        Self {
            degenerate: true,
            ..Self::new(kind, value)
        }
    }

    /// Attach a confidence level
    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Attach a period label
    #[must_use]
    pub fn with_period(mut self, period: &str) -> Self {
        self.period = Some(period.to_string());
        self
    }

    /// Attach a benchmark comparator value
    #[must_use]
    pub fn with_benchmark(mut self, benchmark: f64) -> Self {
        self.benchmark = Some(benchmark);
        self
    }
}

/// One contiguous peak-to-recovery drawdown episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownPeriod {
    /// Last at-peak point before the decline
    pub start: DateTime<Utc>,
    /// Point of deepest decline
    pub valley: DateTime<Utc>,
    /// First point back at the prior peak, absent while still underwater
    pub recovery: Option<DateTime<Utc>>,
    /// Peak-to-trough depth as a positive fraction
    pub depth: f64,
    /// Periods from start to recovery, or to the window end if unrecovered
    pub length: usize,
    /// Periods from valley to recovery, absent while unrecovered
    pub recovery_length: Option<usize>,
}

/// Full drawdown analysis of a return series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownAnalysis {
    /// Drawdown episodes in chronological order
    pub periods: Vec<DrawdownPeriod>,
    /// Current drawdown at every point in time (wealth/peak - 1, <= 0)
    pub underwater: ReturnSeries,
    /// Most negative underwater value, as a positive magnitude
    pub max_drawdown: f64,
}

/// Reserved shock-map key for a market-index shock applied through betas
pub const MARKET_FACTOR: &str = "market";

/// A named or custom shock scenario.
///
/// Shock keys may be asset tickers, sector names (resolved through
/// `sector_map`), or the [`MARKET_FACTOR`] market-wide factor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShockSpecification {
    /// Scenario name, e.g. "2008 Financial Crisis"
    pub name: Option<String>,
    /// Affected entity to fractional price move (-0.30 = -30%)
    pub shocks: FxHashMap<String, f64>,
    /// Asset ticker to sector name, for sector-level shocks
    pub sector_map: FxHashMap<String, String>,
    /// Shock duration in days, used for historical recovery estimates
    pub duration_days: Option<u32>,
    /// Whether the scenario replays a named historical period
    pub historical: bool,
}

impl ShockSpecification {
    /// Fail fast on empty or non-finite shock maps.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.shocks.is_empty() {
            return Err(AnalyticsError::InvalidShock(
                "shock map is empty".to_string(),
            ));
        }
        for (entity, magnitude) in &self.shocks {
            if !magnitude.is_finite() {
                return Err(AnalyticsError::InvalidShock(format!(
                    "non-finite shock magnitude for {entity}"
                )));
            }
        }
        Ok(())
    }
}

/// Impact of a shock on a single position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionImpact {
    /// Asset ticker
    pub asset: String,
    /// Normalized portfolio weight
    pub weight: f64,
    /// Fractional price move applied to the position
    pub shock_pct: f64,
    /// Currency impact on the portfolio (negative for losses)
    pub value_change: f64,
}

/// Estimated time to recover a stress-test loss
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecoveryEstimate {
    /// Estimated recovery time in days
    pub days: f64,
    /// Estimated recovery time in 30-day months
    pub months: f64,
}

/// Outcome of applying a shock specification to current holdings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressTestOutcome {
    /// Scenario name, when one was supplied
    pub scenario: Option<String>,
    /// Portfolio value before the shock
    pub initial_value: f64,
    /// Portfolio value after the shock
    pub stressed_value: f64,
    /// Currency loss (positive for losses, negative when the shock nets a gain)
    pub loss_amount: f64,
    /// Fractional loss (positive for losses)
    pub loss_pct: f64,
    /// Per-position breakdown, largest absolute impact first
    pub impacts: Vec<PositionImpact>,
    /// Recovery time estimate, absent when the shock nets a gain
    pub recovery: Option<RecoveryEstimate>,
}

/// Values of one percentile across all simulated years
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileBand {
    /// Percentile level in [0, 100]
    pub percentile: f64,
    /// One value per simulated year, year 1 first
    pub values: Vec<f64>,
}

/// Summary of a Monte Carlo run. Paths are generated, summarized and
/// discarded; only this summary (plus a small visualization sample) survives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Estimated annual mean return used to parameterize the draws
    pub annual_mean: f64,
    /// Estimated annual volatility used to parameterize the draws
    pub annual_volatility: f64,
    /// Percentile bands of portfolio value at each year, ascending percentile
    pub bands: Vec<PercentileBand>,
    /// (target value, probability of the terminal value exceeding it)
    pub goal_probabilities: Vec<(f64, f64)>,
    /// Small sample of raw paths for visualization (one value per year)
    pub sample_paths: Vec<Vec<f64>>,
}
