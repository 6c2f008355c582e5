//! Returns engine
//!
//! Converts price series to period returns and aggregates per-asset returns
//! into a single portfolio series under a weight map.

use crate::errors::{AnalyticsError, Result};
use crate::types::{ReturnSeries, WeightMap};
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use tracing::debug;

/// Price-to-return conversion method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnMethod {
    /// (P_t - P_{t-1}) / P_{t-1}
    Simple,
    /// ln(P_t / P_{t-1})
    Log,
}

/// Convert a price series to period returns.
///
/// The first observation is dropped (no prior price). Observations with a
/// non-finite price, or a non-positive prior price, are skipped. Mismatched
/// timestamp/price lengths are truncated to the shorter.
pub fn compute_returns(
    timestamps: &[DateTime<Utc>],
    prices: &[f64],
    method: ReturnMethod,
) -> Result<ReturnSeries> {
    let n = timestamps.len().min(prices.len());
    if timestamps[..n].windows(2).any(|w| w[0] >= w[1]) {
        return Err(AnalyticsError::InvalidSeries(
            "price timestamps must be strictly increasing".to_string(),
        ));
    }

    let mut out_ts = Vec::with_capacity(n.saturating_sub(1));
    let mut out_values = Vec::with_capacity(n.saturating_sub(1));
    for i in 1..n {
        let prev = prices[i - 1];
        let curr = prices[i];
        if !prev.is_finite() || !curr.is_finite() || prev <= 0.0 {
            continue;
        }
        let r = match method {
            ReturnMethod::Simple => (curr - prev) / prev,
            ReturnMethod::Log => {
                if curr <= 0.0 {
                    continue;
                }
                (curr / prev).ln()
            }
        };
        out_ts.push(timestamps[i]);
        out_values.push(r);
    }
    Ok(ReturnSeries::from_sorted_unchecked(out_ts, out_values))
}

/// Aggregate per-asset return series into one portfolio series.
///
/// Weights are restricted to assets present in `asset_returns` and
/// renormalized by their sum. Each timestamp in the union date index gets the
/// weighted sum of the returns observed there; assets without an observation
/// at a timestamp contribute zero. A filtered weight sum of zero (or no
/// overlapping assets at all) yields an all-zero series over the same index.
#[must_use]
pub fn aggregate_portfolio_returns(
    asset_returns: &FxHashMap<String, ReturnSeries>,
    weights: &WeightMap,
) -> ReturnSeries {
    let index: Vec<DateTime<Utc>> = asset_returns
        .values()
        .flat_map(|series| series.timestamps().iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let included: Vec<(&ReturnSeries, f64)> = weights
        .iter()
        .filter_map(|(asset, &weight)| {
            if weight > 0.0 && weight.is_finite() {
                asset_returns.get(asset).map(|series| (series, weight))
            } else {
                None
            }
        })
        .collect();

    let total: f64 = included.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        debug!(
            assets = asset_returns.len(),
            "no usable weights overlap the return data, returning zero series"
        );
        return ReturnSeries::zeros(index);
    }

    let values: Vec<f64> = index
        .iter()
        .map(|&ts| {
            included
                .iter()
                .map(|(series, weight)| {
                    weight / total * series.value_at(ts).unwrap_or(0.0)
                })
                .sum()
        })
        .collect();
    ReturnSeries::from_sorted_unchecked(index, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn series(days: &[u32], values: &[f64]) -> ReturnSeries {
        ReturnSeries::new(days.iter().map(|&d| ts(d)).collect(), values.to_vec()).unwrap()
    }

    #[test]
    fn test_simple_returns_drop_first_observation() {
        let timestamps = vec![ts(1), ts(2), ts(3), ts(4)];
        let prices = vec![100.0, 105.0, 103.0, 110.0];
        let returns = compute_returns(&timestamps, &prices, ReturnMethod::Simple).unwrap();
        assert_eq!(returns.len(), 3);
        assert_eq!(returns.timestamps()[0], ts(2));
        assert_relative_eq!(returns.values()[0], 0.05);
        assert_relative_eq!(returns.values()[1], -2.0 / 105.0);
    }

    #[test]
    fn test_log_returns() {
        let timestamps = vec![ts(1), ts(2)];
        let prices = vec![100.0, 110.0];
        let returns = compute_returns(&timestamps, &prices, ReturnMethod::Log).unwrap();
        assert_relative_eq!(returns.values()[0], (1.1_f64).ln());
    }

    #[test]
    fn test_returns_skip_bad_prices() {
        let timestamps = vec![ts(1), ts(2), ts(3), ts(4)];
        let prices = vec![100.0, f64::NAN, 0.0, 110.0];
        let returns = compute_returns(&timestamps, &prices, ReturnMethod::Simple).unwrap();
        // NaN current, NaN prior, and zero prior all skipped
        assert!(returns.is_empty());
    }

    #[test]
    fn test_returns_reject_unsorted_timestamps() {
        let timestamps = vec![ts(2), ts(1)];
        let prices = vec![100.0, 105.0];
        assert!(compute_returns(&timestamps, &prices, ReturnMethod::Simple).is_err());
    }

    #[test]
    fn test_aggregate_weighted_sum() {
        let mut asset_returns = FxHashMap::default();
        asset_returns.insert("A".to_string(), series(&[1, 2], &[0.02, 0.04]));
        asset_returns.insert("B".to_string(), series(&[1, 2], &[-0.01, 0.01]));
        let mut weights = WeightMap::default();
        weights.insert("A".to_string(), 0.5);
        weights.insert("B".to_string(), 0.5);

        let portfolio = aggregate_portfolio_returns(&asset_returns, &weights);
        assert_relative_eq!(portfolio.values()[0], 0.005);
        assert_relative_eq!(portfolio.values()[1], 0.025);
    }

    #[test]
    fn test_aggregate_renormalizes_missing_assets() {
        // weights {A: 0.6, B: 0.4} but only column A present: A unchanged
        let mut asset_returns = FxHashMap::default();
        asset_returns.insert("A".to_string(), series(&[1, 2, 3], &[0.01, -0.02, 0.03]));
        let mut weights = WeightMap::default();
        weights.insert("A".to_string(), 0.6);
        weights.insert("B".to_string(), 0.4);

        let portfolio = aggregate_portfolio_returns(&asset_returns, &weights);
        assert_eq!(portfolio.values(), &[0.01, -0.02, 0.03]);
    }

    #[test]
    fn test_aggregate_zero_weight_sum_is_zero_series() {
        let mut asset_returns = FxHashMap::default();
        asset_returns.insert("A".to_string(), series(&[1, 2, 3], &[0.01, -0.02, 0.03]));
        let weights = WeightMap::default();

        let portfolio = aggregate_portfolio_returns(&asset_returns, &weights);
        assert_eq!(portfolio.len(), 3);
        assert!(portfolio.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_aggregate_union_index() {
        let mut asset_returns = FxHashMap::default();
        asset_returns.insert("A".to_string(), series(&[1, 2], &[0.02, 0.02]));
        asset_returns.insert("B".to_string(), series(&[2, 3], &[0.04, 0.04]));
        let mut weights = WeightMap::default();
        weights.insert("A".to_string(), 1.0);
        weights.insert("B".to_string(), 1.0);

        let portfolio = aggregate_portfolio_returns(&asset_returns, &weights);
        assert_eq!(portfolio.len(), 3);
        // Day 1: only A observed
        assert_relative_eq!(portfolio.values()[0], 0.01);
        // Day 2: both observed
        assert_relative_eq!(portfolio.values()[1], 0.03);
    }

    #[test]
    fn test_aggregate_ignores_negative_weights() {
        let mut asset_returns = FxHashMap::default();
        asset_returns.insert("A".to_string(), series(&[1], &[0.05]));
        asset_returns.insert("B".to_string(), series(&[1], &[0.10]));
        let mut weights = WeightMap::default();
        weights.insert("A".to_string(), 1.0);
        weights.insert("B".to_string(), -1.0);

        let portfolio = aggregate_portfolio_returns(&asset_returns, &weights);
        assert_relative_eq!(portfolio.values()[0], 0.05);
    }
}
