//! Performance ratio calculator
//!
//! Risk-adjusted performance ratios over a period return series and an
//! annual risk-free rate, plus rolling and seasonal variants. Where two
//! series are involved they are aligned by timestamp intersection; the
//! bare-slice helpers truncate to the shorter length instead.

use crate::risk::{annualized_return, max_drawdown};
use crate::stats;
use crate::types::{MetricKind, MetricValue, ReturnSeries};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Convert an annual risk-free rate to a per-period rate:
/// (1 + annual)^(1/periods-per-year) - 1.
#[must_use]
pub fn period_risk_free(annual_rate: f64, periods_per_year: f64) -> f64 {
    (1.0 + annual_rate).powf(1.0 / periods_per_year) - 1.0
}

/// Annualized Sharpe ratio. Zero excess-return variance yields exactly 0.
#[must_use]
pub fn sharpe_ratio(returns: &[f64], annual_risk_free: f64, periods_per_year: f64) -> f64 {
    let rf = period_risk_free(annual_risk_free, periods_per_year);
    let excess: Vec<f64> = stats::finite(returns).iter().map(|r| r - rf).collect();
    let std = stats::std_dev(&excess);
    if std == 0.0 {
        return 0.0;
    }
    stats::mean(&excess) / std * periods_per_year.sqrt()
}

/// Annualized Sortino ratio: mean excess over downside deviation, where the
/// downside deviation is the RMS of only the negative excess returns. With
/// no downside observations the ratio is +infinity when the mean excess is
/// positive, 0 otherwise.
#[must_use]
pub fn sortino_ratio(returns: &[f64], annual_risk_free: f64, periods_per_year: f64) -> f64 {
    let rf = period_risk_free(annual_risk_free, periods_per_year);
    let excess: Vec<f64> = stats::finite(returns).iter().map(|r| r - rf).collect();
    if excess.is_empty() {
        return 0.0;
    }
    let mean_excess = stats::mean(&excess);
    let downside: Vec<f64> = excess.iter().copied().filter(|&e| e < 0.0).collect();
    if downside.is_empty() {
        return if mean_excess > 0.0 { f64::INFINITY } else { 0.0 };
    }
    let downside_dev =
        (downside.iter().map(|e| e.powi(2)).sum::<f64>() / downside.len() as f64).sqrt();
    if downside_dev == 0.0 {
        return if mean_excess > 0.0 { f64::INFINITY } else { 0.0 };
    }
    mean_excess / downside_dev * periods_per_year.sqrt()
}

/// Beta of the portfolio against the benchmark:
/// Cov(portfolio, benchmark) / Var(benchmark). Defaults to the
/// market-neutral 1.0 on insufficient data or zero benchmark variance.
#[must_use]
pub fn beta(portfolio: &[f64], benchmark: &[f64]) -> f64 {
    beta_inner(portfolio, benchmark).unwrap_or(1.0)
}

fn beta_inner(portfolio: &[f64], benchmark: &[f64]) -> Option<f64> {
    let n = portfolio.len().min(benchmark.len());
    if n < 2 {
        return None;
    }
    let var_b = stats::variance(&benchmark[..n]);
    if var_b == 0.0 {
        return None;
    }
    Some(stats::covariance(&portfolio[..n], &benchmark[..n]) / var_b)
}

/// Annualized Treynor ratio: mean excess return over beta. Zero benchmark
/// variance or zero beta yields 0.
#[must_use]
pub fn treynor_ratio(
    portfolio: &[f64],
    benchmark: &[f64],
    annual_risk_free: f64,
    periods_per_year: f64,
) -> f64 {
    let Some(b) = beta_inner(portfolio, benchmark) else {
        return 0.0;
    };
    if b == 0.0 {
        return 0.0;
    }
    let rf = period_risk_free(annual_risk_free, periods_per_year);
    let n = portfolio.len().min(benchmark.len());
    let mean_excess = stats::mean(&portfolio[..n]) - rf;
    mean_excess * periods_per_year / b
}

/// Annualized Jensen's alpha:
/// periods-per-year * [mean(portfolio excess) - beta * mean(benchmark excess)].
#[must_use]
pub fn jensen_alpha(
    portfolio: &[f64],
    benchmark: &[f64],
    annual_risk_free: f64,
    periods_per_year: f64,
) -> f64 {
    let n = portfolio.len().min(benchmark.len());
    if n == 0 {
        return 0.0;
    }
    let rf = period_risk_free(annual_risk_free, periods_per_year);
    let b = beta(&portfolio[..n], &benchmark[..n]);
    let mean_p_excess = stats::mean(&portfolio[..n]) - rf;
    let mean_b_excess = stats::mean(&benchmark[..n]) - rf;
    periods_per_year * (mean_p_excess - b * mean_b_excess)
}

/// Annualized information ratio: mean active return over tracking error,
/// where active return is portfolio minus benchmark per period. Zero
/// tracking error yields 0.
#[must_use]
pub fn information_ratio(portfolio: &[f64], benchmark: &[f64], periods_per_year: f64) -> f64 {
    let n = portfolio.len().min(benchmark.len());
    let active: Vec<f64> = (0..n).map(|i| portfolio[i] - benchmark[i]).collect();
    let std = stats::std_dev(&active);
    if std == 0.0 {
        return 0.0;
    }
    stats::mean(&active) / std * periods_per_year.sqrt()
}

/// Calmar ratio: annualized return over maximum drawdown. Zero drawdown
/// yields +infinity when the annualized return is positive, 0 otherwise.
#[must_use]
pub fn calmar_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    let ann = annualized_return(returns, periods_per_year);
    let mdd = max_drawdown(returns);
    if mdd == 0.0 {
        return if ann > 0.0 { f64::INFINITY } else { 0.0 };
    }
    ann / mdd
}

/// Align two series on their timestamp intersection, returning paired
/// observation vectors in timestamp order.
#[must_use]
pub fn align(a: &ReturnSeries, b: &ReturnSeries) -> (Vec<f64>, Vec<f64>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    for (ts, value) in a.iter() {
        if let Some(other) = b.value_at(ts) {
            left.push(value);
            right.push(other);
        }
    }
    (left, right)
}

/// Full performance-ratio battery over a portfolio series and benchmark,
/// aligned by timestamp intersection.
#[must_use]
pub fn performance_ratios(
    series: &ReturnSeries,
    benchmark: &ReturnSeries,
    annual_risk_free: f64,
    periods_per_year: f64,
) -> Vec<MetricValue> {
    let (portfolio, bench) = align(series, benchmark);
    if portfolio.len() < series.len().min(benchmark.len()) {
        debug!(
            aligned = portfolio.len(),
            portfolio = series.len(),
            benchmark = benchmark.len(),
            "benchmark alignment dropped unmatched timestamps"
        );
    }
    let beta_value = beta_inner(&portfolio, &bench);
    let bench_mean = stats::mean(&bench);

    vec![
        MetricValue::new(
            MetricKind::Sharpe,
            sharpe_ratio(&portfolio, annual_risk_free, periods_per_year),
        ),
        MetricValue::new(
            MetricKind::Sortino,
            sortino_ratio(&portfolio, annual_risk_free, periods_per_year),
        ),
        match beta_value {
            Some(b) => MetricValue::new(MetricKind::Beta, b),
            None => MetricValue::degenerate(MetricKind::Beta, 1.0),
        }
        .with_benchmark(bench_mean),
        MetricValue::new(
            MetricKind::Treynor,
            treynor_ratio(&portfolio, &bench, annual_risk_free, periods_per_year),
        ),
        MetricValue::new(
            MetricKind::Alpha,
            jensen_alpha(&portfolio, &bench, annual_risk_free, periods_per_year),
        )
        .with_benchmark(bench_mean),
        MetricValue::new(
            MetricKind::InformationRatio,
            information_ratio(&portfolio, &bench, periods_per_year),
        )
        .with_benchmark(bench_mean),
        MetricValue::new(
            MetricKind::Calmar,
            calmar_ratio(&portfolio, periods_per_year),
        ),
    ]
}

/// Rolling annualized Sharpe ratio with a minimum-periods floor.
#[must_use]
pub fn rolling_sharpe(
    returns: &[f64],
    window: usize,
    min_periods: usize,
    annual_risk_free: f64,
    periods_per_year: f64,
) -> Vec<f64> {
    crate::risk::rolling_apply(returns, window, min_periods.max(2), |w| {
        sharpe_ratio(w, annual_risk_free, periods_per_year)
    })
}

/// Calendar bucket for seasonal aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeasonalBucket {
    /// January = 1 .. December = 12
    Month,
    /// Monday = 0 .. Sunday = 6
    Weekday,
    /// Q1 = 1 .. Q4 = 4
    Quarter,
}

/// Mean return and observation count per calendar bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalStat {
    /// Bucket identifier (month, weekday or quarter number)
    pub bucket: u32,
    /// Mean period return inside the bucket
    pub mean_return: f64,
    /// Number of observations aggregated
    pub observations: usize,
}

/// Aggregate mean returns by calendar bucket, ascending bucket order.
/// Buckets with no observations are omitted.
#[must_use]
pub fn seasonal_returns(series: &ReturnSeries, bucket: SeasonalBucket) -> Vec<SeasonalStat> {
    let mut sums: std::collections::BTreeMap<u32, (f64, usize)> = std::collections::BTreeMap::new();
    for (ts, value) in series.iter() {
        if !value.is_finite() {
            continue;
        }
        let key = match bucket {
            SeasonalBucket::Month => ts.month(),
            SeasonalBucket::Weekday => ts.weekday().num_days_from_monday(),
            SeasonalBucket::Quarter => (ts.month() - 1) / 3 + 1,
        };
        let entry = sums.entry(key).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(bucket, (sum, count))| SeasonalStat {
            bucket,
            mean_return: sum / count as f64,
            observations: count,
        })
        .collect()
}

/// Two-sided confidence interval on the mean period return.
#[must_use]
pub fn mean_return_confidence_interval(returns: &[f64], confidence: f64) -> (f64, f64) {
    stats::confidence_interval(returns, confidence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};

    fn series(values: &[f64]) -> ReturnSeries {
        let timestamps = (0..values.len())
            .map(|i| Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + chrono::Duration::days(i as i64))
            .collect();
        ReturnSeries::new(timestamps, values.to_vec()).unwrap()
    }

    #[test]
    fn test_period_risk_free_conversion() {
        let rf = period_risk_free(0.05, 252.0);
        assert_relative_eq!((1.0 + rf).powf(252.0), 1.05, epsilon = 1e-10);
        assert_eq!(period_risk_free(0.0, 252.0), 0.0);
    }

    #[test]
    fn test_sharpe_zero_excess_variance_is_zero() {
        // Constant returns: excess-return std is exactly zero
        let returns = [0.01, 0.01, 0.01, 0.01];
        assert_eq!(sharpe_ratio(&returns, 0.0, 252.0), 0.0);
    }

    #[test]
    fn test_sharpe_sign_follows_mean_excess() {
        let winners = [0.01, 0.02, 0.005, 0.015];
        let losers = [-0.01, -0.02, -0.005, -0.015];
        assert!(sharpe_ratio(&winners, 0.0, 252.0) > 0.0);
        assert!(sharpe_ratio(&losers, 0.0, 252.0) < 0.0);
    }

    #[test]
    fn test_sortino_no_downside_conventions() {
        let gains = [0.01, 0.02, 0.015];
        assert_eq!(sortino_ratio(&gains, 0.0, 252.0), f64::INFINITY);

        // No downside but zero mean excess as well
        let flat = [0.0, 0.0, 0.0];
        assert_eq!(sortino_ratio(&flat, 0.0, 252.0), 0.0);
    }

    #[test]
    fn test_sortino_uses_downside_only() {
        let returns = [0.02, -0.01, 0.03, -0.02, 0.01];
        let downside_rms = ((0.01_f64.powi(2) + 0.02_f64.powi(2)) / 2.0).sqrt();
        let expected = stats::mean(&returns) / downside_rms * 252.0_f64.sqrt();
        assert_relative_eq!(sortino_ratio(&returns, 0.0, 252.0), expected, epsilon = 1e-10);
    }

    #[test]
    fn test_beta_defaults_to_one() {
        assert_eq!(beta(&[0.01], &[0.02]), 1.0);
        // Zero benchmark variance
        assert_eq!(beta(&[0.01, 0.02, 0.03], &[0.01, 0.01, 0.01]), 1.0);
    }

    #[test]
    fn test_beta_of_scaled_benchmark() {
        let benchmark = [0.01, -0.02, 0.015, -0.005, 0.02];
        let portfolio: Vec<f64> = benchmark.iter().map(|r| 2.0 * r).collect();
        assert_relative_eq!(beta(&portfolio, &benchmark), 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_treynor_zero_beta_is_zero() {
        // Benchmark with zero variance -> no beta -> 0
        assert_eq!(
            treynor_ratio(&[0.01, 0.02], &[0.01, 0.01], 0.0, 252.0),
            0.0
        );
    }

    #[test]
    fn test_alpha_zero_for_benchmark_itself() {
        let benchmark = [0.01, -0.02, 0.015, -0.005, 0.02];
        let alpha = jensen_alpha(&benchmark, &benchmark, 0.0, 252.0);
        assert_relative_eq!(alpha, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_information_ratio_identical_series_is_zero() {
        let returns = [0.01, -0.02, 0.015];
        assert_eq!(information_ratio(&returns, &returns, 252.0), 0.0);
    }

    #[test]
    fn test_calmar_conventions() {
        let rising = [0.01, 0.02, 0.005];
        assert_eq!(calmar_ratio(&rising, 252.0), f64::INFINITY);

        let falling = [-0.01, -0.02, -0.005];
        assert!(calmar_ratio(&falling, 252.0) < 0.0);

        let mixed = [0.05, -0.10, 0.08];
        assert!(calmar_ratio(&mixed, 252.0).is_finite());
    }

    #[test]
    fn test_align_by_timestamp_intersection() {
        let a = series(&[0.01, 0.02, 0.03, 0.04]);
        // Benchmark shifted by one day: overlap is days 2..4 of `a`
        let b_timestamps: Vec<_> = a.timestamps()[1..].to_vec();
        let b = ReturnSeries::new(b_timestamps, vec![0.1, 0.2, 0.3]).unwrap();

        let (left, right) = align(&a, &b);
        assert_eq!(left, vec![0.02, 0.03, 0.04]);
        assert_eq!(right, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_performance_ratios_battery() {
        let portfolio = series(&[0.01, -0.02, 0.015, -0.005, 0.02, 0.01]);
        let benchmark = series(&[0.005, -0.01, 0.01, -0.002, 0.015, 0.005]);
        let metrics = performance_ratios(&portfolio, &benchmark, 0.02, 252.0);

        let kinds: Vec<MetricKind> = metrics.iter().map(|m| m.kind).collect();
        for kind in [
            MetricKind::Sharpe,
            MetricKind::Sortino,
            MetricKind::Beta,
            MetricKind::Treynor,
            MetricKind::Alpha,
            MetricKind::InformationRatio,
            MetricKind::Calmar,
        ] {
            assert!(kinds.contains(&kind), "missing {kind:?}");
        }
        let beta_metric = metrics.iter().find(|m| m.kind == MetricKind::Beta).unwrap();
        assert!(!beta_metric.degenerate);
        assert!(beta_metric.value > 0.0);
    }

    #[test]
    fn test_performance_ratios_degenerate_beta() {
        let portfolio = series(&[0.01, 0.02]);
        let benchmark = series(&[0.01, 0.01]);
        let metrics = performance_ratios(&portfolio, &benchmark, 0.0, 252.0);
        let beta_metric = metrics.iter().find(|m| m.kind == MetricKind::Beta).unwrap();
        assert!(beta_metric.degenerate);
        assert_eq!(beta_metric.value, 1.0);
    }

    #[test]
    fn test_rolling_sharpe_floor() {
        let returns = [0.01, -0.02, 0.015, -0.01, 0.02];
        let rolled = rolling_sharpe(&returns, 3, 2, 0.0, 252.0);
        assert!(rolled[0].is_nan());
        assert!(rolled[1].is_finite());
        assert_relative_eq!(rolled[4], sharpe_ratio(&returns[2..5], 0.0, 252.0));
    }

    #[test]
    fn test_seasonal_weekday_buckets() {
        // 2024-01-01 is a Monday
        let s = series(&[0.01, 0.02, 0.03, 0.04, 0.05, 0.06, 0.07, 0.08]);
        let stats = seasonal_returns(&s, SeasonalBucket::Weekday);
        assert_eq!(stats.len(), 7);
        let monday = &stats[0];
        assert_eq!(monday.bucket, 0);
        assert_eq!(monday.observations, 2);
        // Mondays are day 1 (0.01) and day 8 (0.08)
        assert_relative_eq!(monday.mean_return, 0.045);
    }

    #[test]
    fn test_seasonal_quarter_buckets() {
        let timestamps = vec![
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 4, 15, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 8, 15, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 11, 15, 0, 0, 0).unwrap(),
        ];
        let s = ReturnSeries::new(timestamps, vec![0.01, 0.02, 0.03, 0.04]).unwrap();
        let stats = seasonal_returns(&s, SeasonalBucket::Quarter);
        let buckets: Vec<u32> = stats.iter().map(|s| s.bucket).collect();
        assert_eq!(buckets, vec![1, 2, 3, 4]);
    }
}
