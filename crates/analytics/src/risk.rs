//! Risk metrics calculator
//!
//! Volatility, Value-at-Risk (historical, parametric, Monte Carlo),
//! Conditional VaR, drawdown analysis, Ulcer/Pain indices, tail-risk
//! summaries, and rolling-window variants.

use crate::stats;
use crate::types::{
    DrawdownAnalysis, DrawdownPeriod, MetricKind, MetricValue, ReturnSeries,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal as NormalSampler};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::debug;

/// Value-at-Risk method selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VarMethod {
    /// Empirical quantile of observed returns
    Historical,
    /// Normal-distribution quantile from fitted mean/std
    Parametric,
    /// Historical rule over synthetic normal draws; seeded draws are
    /// reproducible, `None` uses OS entropy
    MonteCarlo {
        /// Number of synthetic returns to draw
        simulations: usize,
        /// Explicit seed, or `None` for entropy
        seed: Option<u64>,
    },
}

/// Build an RNG from an explicit seed or OS entropy. Seeding is always a
/// caller decision, never a hidden global.
pub(crate) fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Sample standard deviation of period returns annualized by
/// sqrt(periods-per-year). 0.0 below 2 observations.
#[must_use]
pub fn annualized_volatility(returns: &[f64], periods_per_year: f64) -> f64 {
    stats::std_dev(returns) * periods_per_year.sqrt()
}

/// Annualized geometric return from period returns. -1.0 once the wealth
/// index hits zero.
#[must_use]
pub fn annualized_return(returns: &[f64], periods_per_year: f64) -> f64 {
    let v = stats::finite(returns);
    if v.is_empty() {
        return 0.0;
    }
    let wealth = v.iter().fold(1.0_f64, |acc, r| (acc * (1.0 + r)).max(0.0));
    if wealth <= 0.0 {
        return -1.0;
    }
    wealth.powf(periods_per_year / v.len() as f64) - 1.0
}

/// Value at Risk as a non-negative loss magnitude.
#[must_use]
pub fn value_at_risk(returns: &[f64], confidence: f64, method: VarMethod) -> f64 {
    match method {
        VarMethod::Historical => historical_var(returns, confidence),
        VarMethod::Parametric => parametric_var(returns, confidence),
        VarMethod::MonteCarlo { simulations, seed } => {
            monte_carlo_var(returns, confidence, simulations, seed)
        }
    }
}

/// Historical VaR: the lower order statistic at rank (1-confidence)(n-1) of
/// the empirical distribution, reported as a positive loss. The floor
/// convention is deliberate; it is conservative for a loss threshold.
#[must_use]
pub fn historical_var(returns: &[f64], confidence: f64) -> f64 {
    (-historical_quantile(returns, confidence).unwrap_or(0.0)).max(0.0)
}

/// Parametric (variance-covariance) VaR assuming normally distributed
/// returns: -(mean + std * z_{1-confidence}), floored at zero.
#[must_use]
pub fn parametric_var(returns: &[f64], confidence: f64) -> f64 {
    let v = stats::finite(returns);
    if v.len() < 2 {
        return 0.0;
    }
    let Ok(standard_normal) = Normal::new(0.0, 1.0) else {
        return 0.0;
    };
    let z = standard_normal.inverse_cdf((1.0 - confidence).clamp(f64::MIN_POSITIVE, 1.0));
    (-(stats::mean(&v) + stats::std_dev(&v) * z)).max(0.0)
}

/// Monte Carlo VaR: the historical rule applied to synthetic draws from a
/// normal distribution fitted to the sample mean/std.
#[must_use]
pub fn monte_carlo_var(
    returns: &[f64],
    confidence: f64,
    simulations: usize,
    seed: Option<u64>,
) -> f64 {
    let v = stats::finite(returns);
    if v.len() < 2 || simulations == 0 {
        return 0.0;
    }
    let Ok(sampler) = NormalSampler::new(stats::mean(&v), stats::std_dev(&v)) else {
        debug!("degenerate normal fit, Monte Carlo VaR defaults to 0");
        return 0.0;
    };
    let mut rng = rng_from_seed(seed);
    let synthetic: Vec<f64> = (0..simulations).map(|_| sampler.sample(&mut rng)).collect();
    historical_var(&synthetic, confidence)
}

/// Conditional VaR (expected shortfall): mean of all returns at or below the
/// historical VaR threshold, as a positive loss. Falls back to the VaR value
/// when no returns lie below the threshold.
#[must_use]
pub fn conditional_var(returns: &[f64], confidence: f64) -> f64 {
    let v = stats::finite(returns);
    let Some(threshold) = historical_quantile(&v, confidence) else {
        return 0.0;
    };
    let tail: Vec<f64> = v.iter().copied().filter(|&r| r <= threshold).collect();
    if tail.is_empty() {
        return (-threshold).max(0.0);
    }
    (-stats::mean(&tail)).max(0.0)
}

/// Most negative underwater value as a positive magnitude. 0.0 for a series
/// that never declines from its running peak.
#[must_use]
pub fn max_drawdown(returns: &[f64]) -> f64 {
    underwater(returns)
        .into_iter()
        .fold(0.0_f64, |worst, u| worst.max(-u))
}

/// Full drawdown analysis: underwater series, maximum drawdown, and the
/// chronological list of drawdown episodes.
#[must_use]
pub fn drawdown_analysis(series: &ReturnSeries) -> DrawdownAnalysis {
    let uw = underwater(series.values());
    let timestamps = series.timestamps();
    let n = uw.len();

    let mut periods = Vec::new();
    let mut i = 0;
    while i < n {
        if uw[i] >= 0.0 {
            i += 1;
            continue;
        }
        // Last at-peak point before the decline
        let start_idx = i.saturating_sub(1);
        let mut recovery_idx = None;
        let mut j = i;
        while j < n {
            if uw[j] >= 0.0 {
                recovery_idx = Some(j);
                break;
            }
            j += 1;
        }
        let episode_end = recovery_idx.map_or(n - 1, |r| r - 1);
        let valley_idx = (i..=episode_end)
            .min_by(|&a, &b| {
                uw[a].partial_cmp(&uw[b]).unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(i);

        periods.push(DrawdownPeriod {
            start: timestamps[start_idx],
            valley: timestamps[valley_idx],
            recovery: recovery_idx.map(|r| timestamps[r]),
            depth: -uw[valley_idx],
            length: recovery_idx.map_or(n - 1, |r| r) - start_idx,
            recovery_length: recovery_idx.map(|r| r - valley_idx),
        });
        i = recovery_idx.map_or(n, |r| r);
    }

    let max_dd = uw.iter().fold(0.0_f64, |worst, &u| worst.max(-u));
    DrawdownAnalysis {
        periods,
        underwater: ReturnSeries::from_sorted_unchecked(timestamps.to_vec(), uw),
        max_drawdown: max_dd,
    }
}

/// Mean absolute underwater value over the whole series.
#[must_use]
pub fn pain_index(returns: &[f64]) -> f64 {
    let uw = underwater(returns);
    if uw.is_empty() {
        return 0.0;
    }
    uw.iter().map(|u| u.abs()).sum::<f64>() / uw.len() as f64
}

/// Annualized return over pain index. A painless series maps to +infinity
/// when the annualized return is positive, 0 otherwise.
#[must_use]
pub fn pain_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    let ann = annualized_return(returns, periods_per_year);
    let pain = pain_index(returns);
    if pain == 0.0 {
        return if ann > 0.0 { f64::INFINITY } else { 0.0 };
    }
    ann / pain
}

/// Root-mean-square of the underwater series.
#[must_use]
pub fn ulcer_index(returns: &[f64]) -> f64 {
    let uw = underwater(returns);
    if uw.is_empty() {
        return 0.0;
    }
    (uw.iter().map(|u| u.powi(2)).sum::<f64>() / uw.len() as f64).sqrt()
}

/// Tail-risk summary: distribution shape plus historical VaR/CVaR at the
/// given confidence level.
#[must_use]
pub fn tail_risk(returns: &[f64], confidence: f64) -> Vec<MetricValue> {
    let v = stats::finite(returns);
    vec![
        shaped(MetricKind::Skewness, stats::skewness(&v), v.len() < 3),
        shaped(MetricKind::Kurtosis, stats::kurtosis(&v), v.len() < 4),
        shaped(
            MetricKind::ValueAtRisk,
            historical_var(&v, confidence),
            v.is_empty(),
        )
        .with_confidence(confidence),
        shaped(
            MetricKind::ConditionalValueAtRisk,
            conditional_var(&v, confidence),
            v.is_empty(),
        )
        .with_confidence(confidence),
    ]
}

/// Apply `f` over a sliding window of `window` observations. Positions with
/// fewer than `min_periods` observations available produce NaN rather than
/// being skipped.
pub fn rolling_apply<F>(values: &[f64], window: usize, min_periods: usize, f: F) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let min_periods = min_periods.max(1);
    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let start = (i + 1).saturating_sub(window);
            if i + 1 - start < min_periods {
                f64::NAN
            } else {
                f(&values[start..=i])
            }
        })
        .collect()
}

/// Rolling annualized volatility.
#[must_use]
pub fn rolling_volatility(
    returns: &[f64],
    window: usize,
    min_periods: usize,
    periods_per_year: f64,
) -> Vec<f64> {
    rolling_apply(returns, window, min_periods.max(2), |w| {
        annualized_volatility(w, periods_per_year)
    })
}

/// Rolling historical VaR.
#[must_use]
pub fn rolling_var(
    returns: &[f64],
    window: usize,
    min_periods: usize,
    confidence: f64,
) -> Vec<f64> {
    rolling_apply(returns, window, min_periods, |w| {
        historical_var(w, confidence)
    })
}

/// Rolling maximum drawdown.
#[must_use]
pub fn rolling_max_drawdown(returns: &[f64], window: usize, min_periods: usize) -> Vec<f64> {
    rolling_apply(returns, window, min_periods, max_drawdown)
}

/// Standard risk-metric battery over one return series.
#[must_use]
pub fn risk_metrics(
    series: &ReturnSeries,
    confidence: f64,
    periods_per_year: f64,
) -> Vec<MetricValue> {
    let v = stats::finite(series.values());
    let thin = v.len() < 2;
    if thin {
        debug!(observations = v.len(), "thin return series, risk metrics degenerate");
    }
    let mut metrics = vec![
        shaped(
            MetricKind::AnnualizedReturn,
            annualized_return(&v, periods_per_year),
            v.is_empty(),
        )
        .with_period("annual"),
        shaped(
            MetricKind::Volatility,
            annualized_volatility(&v, periods_per_year),
            thin,
        )
        .with_period("annual"),
        shaped(MetricKind::ValueAtRisk, historical_var(&v, confidence), v.is_empty())
            .with_confidence(confidence),
        shaped(
            MetricKind::ConditionalValueAtRisk,
            conditional_var(&v, confidence),
            v.is_empty(),
        )
        .with_confidence(confidence),
        shaped(MetricKind::MaxDrawdown, max_drawdown(&v), v.is_empty()),
        shaped(MetricKind::UlcerIndex, ulcer_index(&v), v.is_empty()),
        shaped(MetricKind::PainIndex, pain_index(&v), v.is_empty()),
        shaped(
            MetricKind::PainRatio,
            pain_ratio(&v, periods_per_year),
            v.is_empty(),
        ),
    ];
    metrics.extend([
        shaped(MetricKind::Skewness, stats::skewness(&v), v.len() < 3),
        shaped(MetricKind::Kurtosis, stats::kurtosis(&v), v.len() < 4),
    ]);
    metrics
}

fn shaped(kind: MetricKind, value: f64, degenerate: bool) -> MetricValue {
    if degenerate {
        MetricValue::degenerate(kind, value)
    } else {
        MetricValue::new(kind, value)
    }
}

/// Lower order statistic at rank (1-confidence)(n-1); `None` on empty input.
fn historical_quantile(returns: &[f64], confidence: f64) -> Option<f64> {
    let mut v = stats::finite(returns);
    if v.is_empty() {
        return None;
    }
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let q = (1.0 - confidence).clamp(0.0, 1.0);
    let idx = (q * (v.len() - 1) as f64).floor() as usize;
    Some(v[idx.min(v.len() - 1)])
}

/// Underwater series: wealth / running-peak - 1, one entry per return.
/// Non-finite returns contribute a flat period.
fn underwater(returns: &[f64]) -> Vec<f64> {
    let mut wealth = 1.0_f64;
    let mut peak = 1.0_f64;
    returns
        .iter()
        .map(|&r| {
            let r = if r.is_finite() { r } else { 0.0 };
            wealth = (wealth * (1.0 + r)).max(0.0);
            peak = peak.max(wealth);
            if peak > 0.0 { wealth / peak - 1.0 } else { 0.0 }
        })
        .collect()
}
