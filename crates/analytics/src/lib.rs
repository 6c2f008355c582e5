//! Portfolio Analytics Engine
//!
//! Risk and performance analytics over timestamped return series:
//! - Statistical primitives (moments, correlation, normality, outliers)
//! - Returns computation and weighted portfolio aggregation
//! - Risk metrics: volatility, VaR/CVaR, drawdowns, Ulcer and Pain indices
//! - Benchmark-relative ratios: Sharpe, Sortino, Treynor, alpha/beta
//! - Monte Carlo value projection with percentile bands
//! - Scenario stress testing with recovery estimates

pub mod errors;
pub mod performance;
pub mod returns;
pub mod risk;
pub mod simulation;
pub mod stats;
pub mod stress;
pub mod types;

pub use errors::{AnalyticsError, Result};
pub use performance::{performance_ratios, seasonal_returns, SeasonalBucket, SeasonalStat};
pub use returns::{aggregate_portfolio_returns, compute_returns, ReturnMethod};
pub use risk::{drawdown_analysis, risk_metrics, value_at_risk, VarMethod};
pub use simulation::{run_monte_carlo, MonteCarloConfig};
pub use stress::{stress_test, StressTestConfig};
pub use types::{
    DrawdownAnalysis, DrawdownPeriod, MetricKind, MetricValue, PercentileBand, PositionImpact,
    RecoveryEstimate, ReturnSeries, ShockSpecification, SimulationResult, StressTestOutcome,
    WeightMap, MARKET_FACTOR,
};
