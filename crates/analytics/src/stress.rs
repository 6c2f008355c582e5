//! Stress test engine
//!
//! Applies a named or custom shock specification to current holdings and
//! reports post-shock value, loss, per-position impacts, and a recovery-time
//! estimate.

use crate::errors::{AnalyticsError, Result};
use crate::types::{
    PositionImpact, RecoveryEstimate, ShockSpecification, StressTestOutcome, WeightMap,
    MARKET_FACTOR,
};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Stress test tuning parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StressTestConfig {
    /// Estimated recovery days per percentage point of portfolio loss,
    /// used when the scenario carries no historical duration
    pub recovery_days_per_pct: f64,
}

impl Default for StressTestConfig {
    fn default() -> Self {
        Self {
            recovery_days_per_pct: 5.0,
        }
    }
}

/// Apply a shock specification to current holdings.
///
/// Per-position shocks resolve in order: direct ticker shock, sector shock
/// through the scenario's sector map, then a [`MARKET_FACTOR`] shock
/// scaled by the position's beta (default 1.0) and, when supplied, its
/// correlation to the shocked index. The portfolio shock is the
/// weight-normalized sum of position shocks. A filtered weight sum of zero
/// yields a neutral outcome rather than an error.
pub fn stress_test(
    spec: &ShockSpecification,
    weights: &WeightMap,
    portfolio_value: f64,
    betas: Option<&FxHashMap<String, f64>>,
    correlations: Option<&FxHashMap<String, f64>>,
    config: &StressTestConfig,
) -> Result<StressTestOutcome> {
    spec.validate()?;
    if !portfolio_value.is_finite() || portfolio_value <= 0.0 {
        return Err(AnalyticsError::InvalidParameter(format!(
            "portfolio value {portfolio_value} must be a finite positive number"
        )));
    }
    for (asset, &weight) in weights {
        if !weight.is_finite() {
            return Err(AnalyticsError::InvalidParameter(format!(
                "non-finite weight for {asset}"
            )));
        }
    }

    let held: Vec<(&String, f64)> = weights
        .iter()
        .filter(|&(_, &w)| w > 0.0)
        .map(|(asset, &w)| (asset, w))
        .collect();
    let total: f64 = held.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        debug!("no positive weights, stress test outcome is neutral");
        return Ok(StressTestOutcome {
            scenario: spec.name.clone(),
            initial_value: portfolio_value,
            stressed_value: portfolio_value,
            loss_amount: 0.0,
            loss_pct: 0.0,
            impacts: Vec::new(),
            recovery: None,
        });
    }

    let mut impacts: Vec<PositionImpact> = held
        .into_iter()
        .map(|(asset, weight)| {
            let normalized = weight / total;
            let shock_pct = position_shock(asset, spec, betas, correlations);
            PositionImpact {
                asset: asset.clone(),
                weight: normalized,
                shock_pct,
                value_change: normalized * portfolio_value * shock_pct,
            }
        })
        .collect();

    let portfolio_shock: f64 = impacts.iter().map(|i| i.weight * i.shock_pct).sum();
    impacts.sort_by(|a, b| {
        b.value_change
            .abs()
            .partial_cmp(&a.value_change.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let stressed_value = portfolio_value * (1.0 + portfolio_shock);
    let loss_pct = -portfolio_shock;
    let loss_amount = portfolio_value - stressed_value;

    Ok(StressTestOutcome {
        scenario: spec.name.clone(),
        initial_value: portfolio_value,
        stressed_value,
        loss_amount,
        loss_pct,
        impacts,
        recovery: recovery_estimate(spec, loss_pct, config),
    })
}

/// Resolve the fractional shock applied to one position.
fn position_shock(
    asset: &str,
    spec: &ShockSpecification,
    betas: Option<&FxHashMap<String, f64>>,
    correlations: Option<&FxHashMap<String, f64>>,
) -> f64 {
    if let Some(&direct) = spec.shocks.get(asset) {
        return direct;
    }
    if let Some(sector) = spec.sector_map.get(asset) {
        if let Some(&sector_shock) = spec.shocks.get(sector) {
            return sector_shock;
        }
    }
    if let Some(&market_shock) = spec.shocks.get(MARKET_FACTOR) {
        let beta = betas
            .and_then(|map| map.get(asset))
            .copied()
            .unwrap_or(1.0);
        let correlation = correlations
            .and_then(|map| map.get(asset))
            .copied()
            .unwrap_or(1.0);
        return market_shock * beta * correlation;
    }
    0.0
}

/// Recovery-time estimate in days and 30-day months. Historical scenarios
/// with an explicit duration report that duration; otherwise the estimate
/// scales with the loss magnitude. Absent when the shock nets a gain.
fn recovery_estimate(
    spec: &ShockSpecification,
    loss_pct: f64,
    config: &StressTestConfig,
) -> Option<RecoveryEstimate> {
    if loss_pct <= 0.0 {
        return None;
    }
    let days = match (spec.historical, spec.duration_days) {
        (true, Some(duration)) => f64::from(duration),
        _ => config.recovery_days_per_pct * loss_pct * 100.0,
    };
    Some(RecoveryEstimate {
        days,
        months: days / 30.0,
    })
}
