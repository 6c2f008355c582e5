//! Statistical primitives
//!
//! Pure functions over numeric sequences, with no dependency on the rest of
//! the engine. Every function drops non-finite entries before computing and
//! returns a neutral value when fewer than the statistically required
//! minimum of observations remain (std-dev needs 2, skewness 3, kurtosis 4).

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF, StudentsT};

/// Correlation method selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrelationMethod {
    /// Linear (Pearson) correlation
    Pearson,
    /// Rank (Spearman) correlation
    Spearman,
    /// Concordance (Kendall tau-b) correlation
    Kendall,
}

/// Outlier detection method selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutlierMethod {
    /// |z| > 3 against mean/std
    ZScore,
    /// Median/MAD-based modified z-score, factor 0.6745, threshold 3.5
    ModifiedZScore,
    /// Outside the 1.5x interquartile-range fences
    Iqr,
}

/// Normalization method selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalizationMethod {
    /// Scale to [0, 1]
    MinMax,
    /// Center and scale by standard deviation
    ZScore,
}

/// Jarque-Bera normality test result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalityTest {
    /// Jarque-Bera statistic
    pub statistic: f64,
    /// p-value from the chi-squared(2) distribution
    pub p_value: f64,
    /// Whether normality is not rejected at the 5% level
    pub normal: bool,
}

/// Drop NaN and infinite entries.
pub(crate) fn finite(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Arithmetic mean; 0.0 on an empty sequence.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    let v = finite(values);
    if v.is_empty() {
        return 0.0;
    }
    v.iter().sum::<f64>() / v.len() as f64
}

/// Median via linear-interpolated 50th percentile; 0.0 on empty input.
#[must_use]
pub fn median(values: &[f64]) -> f64 {
    percentile(values, 50.0)
}

/// Most frequent value; ties resolve to the smallest. 0.0 on empty input.
#[must_use]
pub fn mode(values: &[f64]) -> f64 {
    let mut v = finite(values);
    if v.is_empty() {
        return 0.0;
    }
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut best = v[0];
    let mut best_count = 0usize;
    let mut i = 0;
    while i < v.len() {
        let mut j = i + 1;
        while j < v.len() && v[j] == v[i] {
            j += 1;
        }
        if j - i > best_count {
            best_count = j - i;
            best = v[i];
        }
        i = j;
    }
    best
}

/// Sample variance (ddof = 1); 0.0 with fewer than 2 observations.
#[must_use]
pub fn variance(values: &[f64]) -> f64 {
    let v = finite(values);
    if v.len() < 2 {
        return 0.0;
    }
    let m = v.iter().sum::<f64>() / v.len() as f64;
    v.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (v.len() - 1) as f64
}

/// Sample standard deviation (ddof = 1); 0.0 with fewer than 2 observations.
#[must_use]
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Adjusted sample skewness; 0.0 with fewer than 3 observations or zero
/// variance.
#[must_use]
pub fn skewness(values: &[f64]) -> f64 {
    let v = finite(values);
    let n = v.len();
    if n < 3 {
        return 0.0;
    }
    let s = std_dev(&v);
    if s == 0.0 {
        return 0.0;
    }
    let m = mean(&v);
    let nf = n as f64;
    let sum_cubed = v.iter().map(|x| ((x - m) / s).powi(3)).sum::<f64>();
    nf / ((nf - 1.0) * (nf - 2.0)) * sum_cubed
}

/// Sample excess kurtosis; 0.0 with fewer than 4 observations or zero
/// variance.
#[must_use]
pub fn kurtosis(values: &[f64]) -> f64 {
    let v = finite(values);
    let n = v.len();
    if n < 4 {
        return 0.0;
    }
    let s = std_dev(&v);
    if s == 0.0 {
        return 0.0;
    }
    let m = mean(&v);
    let nf = n as f64;
    let sum_fourth = v.iter().map(|x| ((x - m) / s).powi(4)).sum::<f64>();
    nf * (nf + 1.0) / ((nf - 1.0) * (nf - 2.0) * (nf - 3.0)) * sum_fourth
        - 3.0 * (nf - 1.0).powi(2) / ((nf - 2.0) * (nf - 3.0))
}

/// Percentile `p` in [0, 100] with linear interpolation between order
/// statistics at rank `p/100 * (n-1)`. 0.0 on empty input.
#[must_use]
pub fn percentile(values: &[f64], p: f64) -> f64 {
    let mut v = finite(values);
    if v.is_empty() {
        return 0.0;
    }
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let p = p.clamp(0.0, 100.0);
    let rank = p / 100.0 * (v.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return v[lo];
    }
    let frac = rank - lo as f64;
    v[lo] + frac * (v[hi] - v[lo])
}

/// Sample covariance (ddof = 1) of two sequences, truncated to the shorter
/// length and filtered to pairwise-finite observations. 0.0 below 2 pairs.
#[must_use]
pub fn covariance(x: &[f64], y: &[f64]) -> f64 {
    let pairs = finite_pairs(x, y);
    if pairs.len() < 2 {
        return 0.0;
    }
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
    let my = pairs.iter().map(|(_, b)| b).sum::<f64>() / n;
    pairs
        .iter()
        .map(|(a, b)| (a - mx) * (b - my))
        .sum::<f64>()
        / (n - 1.0)
}

/// Correlation of two sequences, truncated to the shorter length.
/// Zero-variance inputs or fewer than 2 pairs yield 0.0.
#[must_use]
pub fn correlation(x: &[f64], y: &[f64], method: CorrelationMethod) -> f64 {
    let pairs = finite_pairs(x, y);
    if pairs.len() < 2 {
        return 0.0;
    }
    let xs: Vec<f64> = pairs.iter().map(|(a, _)| *a).collect();
    let ys: Vec<f64> = pairs.iter().map(|(_, b)| *b).collect();
    match method {
        CorrelationMethod::Pearson => pearson(&xs, &ys),
        CorrelationMethod::Spearman => pearson(&ranks(&xs), &ranks(&ys)),
        CorrelationMethod::Kendall => kendall_tau_b(&xs, &ys),
    }
}

/// Pairwise correlation matrix of the given columns: symmetric, 1.0 on the
/// diagonal for every column with non-zero variance.
#[must_use]
pub fn correlation_matrix(columns: &[Vec<f64>], method: CorrelationMethod) -> DMatrix<f64> {
    let n = columns.len();
    let mut matrix = DMatrix::zeros(n, n);
    for i in 0..n {
        for j in i..n {
            let c = if i == j {
                if variance(&columns[i]) > 0.0 { 1.0 } else { 0.0 }
            } else {
                correlation(&columns[i], &columns[j], method)
            };
            matrix[(i, j)] = c;
            matrix[(j, i)] = c;
        }
    }
    matrix
}

/// Two-sided confidence interval on the mean using the Student-t
/// distribution. Collapses to (mean, mean) below 2 observations.
#[must_use]
pub fn confidence_interval(values: &[f64], confidence: f64) -> (f64, f64) {
    let v = finite(values);
    let m = mean(&v);
    if v.len() < 2 {
        return (m, m);
    }
    let df = (v.len() - 1) as f64;
    let Ok(dist) = StudentsT::new(0.0, 1.0, df) else {
        return (m, m);
    };
    let t = dist.inverse_cdf(0.5 + confidence.clamp(0.0, 1.0) / 2.0);
    let half = t * std_dev(&v) / (v.len() as f64).sqrt();
    (m - half, m + half)
}

/// Jarque-Bera normality test. Below 4 observations the test is
/// inconclusive and reports normal with p = 1.
#[must_use]
pub fn jarque_bera(values: &[f64]) -> NormalityTest {
    let v = finite(values);
    if v.len() < 4 {
        return NormalityTest {
            statistic: 0.0,
            p_value: 1.0,
            normal: true,
        };
    }
    let s = skewness(&v);
    let k = kurtosis(&v);
    let statistic = v.len() as f64 / 6.0 * (s.powi(2) + k.powi(2) / 4.0);
    let p_value = match ChiSquared::new(2.0) {
        Ok(chi2) => 1.0 - chi2.cdf(statistic),
        Err(_) => 1.0,
    };
    NormalityTest {
        statistic,
        p_value,
        normal: p_value > 0.05,
    }
}

/// Boolean outlier mask aligned to the original length; non-finite
/// positions are marked not-outlier.
#[must_use]
pub fn outliers(values: &[f64], method: OutlierMethod) -> Vec<bool> {
    let v = finite(values);
    let is_outlier: Box<dyn Fn(f64) -> bool> = match method {
        OutlierMethod::ZScore => {
            let m = mean(&v);
            let s = std_dev(&v);
            if s == 0.0 {
                Box::new(|_| false)
            } else {
                Box::new(move |x| ((x - m) / s).abs() > 3.0)
            }
        }
        OutlierMethod::ModifiedZScore => {
            let med = median(&v);
            let deviations: Vec<f64> = v.iter().map(|x| (x - med).abs()).collect();
            let mad = median(&deviations);
            if mad == 0.0 {
                Box::new(|_| false)
            } else {
                Box::new(move |x| (0.6745 * (x - med) / mad).abs() > 3.5)
            }
        }
        OutlierMethod::Iqr => {
            let q1 = percentile(&v, 25.0);
            let q3 = percentile(&v, 75.0);
            let iqr = q3 - q1;
            let lo = q1 - 1.5 * iqr;
            let hi = q3 + 1.5 * iqr;
            Box::new(move |x| x < lo || x > hi)
        }
    };
    values
        .iter()
        .map(|x| x.is_finite() && is_outlier(*x))
        .collect()
}

/// Normalize a sequence, preserving length; non-finite entries map to NaN.
/// Zero-range (min-max) or zero-variance (z-score) inputs map to 0.0.
#[must_use]
pub fn normalize(values: &[f64], method: NormalizationMethod) -> Vec<f64> {
    let v = finite(values);
    let transform: Box<dyn Fn(f64) -> f64> = match method {
        NormalizationMethod::MinMax => {
            let min = v.iter().copied().fold(f64::INFINITY, f64::min);
            let max = v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let range = max - min;
            if v.is_empty() || range == 0.0 {
                Box::new(|_| 0.0)
            } else {
                Box::new(move |x| (x - min) / range)
            }
        }
        NormalizationMethod::ZScore => {
            let m = mean(&v);
            let s = std_dev(&v);
            if s == 0.0 {
                Box::new(|_| 0.0)
            } else {
                Box::new(move |x| (x - m) / s)
            }
        }
    };
    values
        .iter()
        .map(|x| if x.is_finite() { transform(*x) } else { f64::NAN })
        .collect()
}

/// Truncate to the shorter length and keep pairwise-finite observations.
fn finite_pairs(x: &[f64], y: &[f64]) -> Vec<(f64, f64)> {
    x.iter()
        .zip(y.iter())
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(a, b)| (*a, *b))
        .collect()
}

fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y.iter()) {
        let dx = a - mx;
        let dy = b - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return 0.0;
    }
    sxy / (sxx * syy).sqrt()
}

/// Average ranks (1-based), with tied values sharing their mean rank.
fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut result = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i + 1;
        while j < order.len() && values[order[j]] == values[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j + 1) as f64 / 2.0;
        for &idx in &order[i..j] {
            result[idx] = avg_rank;
        }
        i = j;
    }
    result
}

/// Kendall tau-b with tie correction.
fn kendall_tau_b(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len();
    let mut concordant = 0i64;
    let mut discordant = 0i64;
    let mut ties_x = 0i64;
    let mut ties_y = 0i64;
    for i in 0..n {
        for j in (i + 1)..n {
            let dx = x[i] - x[j];
            let dy = y[i] - y[j];
            // A pair tied in both counts toward both tie terms
            if dx == 0.0 {
                ties_x += 1;
            }
            if dy == 0.0 {
                ties_y += 1;
            }
            if dx == 0.0 || dy == 0.0 {
                continue;
            }
            if dx * dy > 0.0 {
                concordant += 1;
            } else {
                discordant += 1;
            }
        }
    }
    let n0 = (n * (n - 1) / 2) as f64;
    let denom = ((n0 - ties_x as f64) * (n0 - ties_y as f64)).sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    (concordant - discordant) as f64 / denom
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_drops_non_finite() {
        assert_relative_eq!(mean(&[1.0, f64::NAN, 2.0, f64::INFINITY, 3.0]), 2.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_percentile_linear_interpolation() {
        let values = [15.0, 20.0, 35.0, 40.0, 50.0];
        assert_relative_eq!(percentile(&values, 0.0), 15.0);
        assert_relative_eq!(percentile(&values, 50.0), 35.0);
        assert_relative_eq!(percentile(&values, 100.0), 50.0);
        // rank 0.3 * 4 = 1.2 -> 20 + 0.2 * 15
        assert_relative_eq!(percentile(&values, 30.0), 23.0);
    }

    #[test]
    fn test_std_dev_sample_variant() {
        // Sample std of [2, 4, 4, 4, 5, 5, 7, 9] with ddof=1
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(std_dev(&values), (32.0_f64 / 7.0).sqrt(), epsilon = 1e-12);
        assert_eq!(std_dev(&[1.0]), 0.0);
    }

    #[test]
    fn test_skewness_minimum_observations() {
        assert_eq!(skewness(&[1.0, 2.0]), 0.0);
        assert_eq!(kurtosis(&[1.0, 2.0, 3.0]), 0.0);
        // Symmetric data has ~zero skewness
        assert_relative_eq!(skewness(&[1.0, 2.0, 3.0, 4.0, 5.0]), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mode_ties_resolve_to_smallest() {
        assert_relative_eq!(mode(&[3.0, 1.0, 3.0, 2.0, 1.0]), 1.0);
        assert_relative_eq!(mode(&[5.0, 5.0, 2.0]), 5.0);
    }

    #[test]
    fn test_pearson_correlation_perfect() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        assert_relative_eq!(correlation(&x, &y, CorrelationMethod::Pearson), 1.0);
        let y_neg = [-2.0, -4.0, -6.0, -8.0];
        assert_relative_eq!(correlation(&x, &y_neg, CorrelationMethod::Pearson), -1.0);
    }

    #[test]
    fn test_spearman_handles_nonlinear_monotone() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [1.0, 8.0, 27.0, 64.0, 125.0];
        assert_relative_eq!(correlation(&x, &y, CorrelationMethod::Spearman), 1.0);
    }

    #[test]
    fn test_kendall_tau() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [1.0, 3.0, 2.0, 4.0];
        // 5 concordant, 1 discordant pairs -> tau = 4/6
        assert_relative_eq!(
            correlation(&x, &y, CorrelationMethod::Kendall),
            4.0 / 6.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_kendall_tau_with_ties() {
        // Pairs tied in both variables count toward both tie terms, so a
        // sequence correlated with itself stays at exactly 1.0
        let x = [1.0, 1.0, 2.0];
        assert_relative_eq!(correlation(&x, &x, CorrelationMethod::Kendall), 1.0);

        // Ties in x only: C = 5, D = 0, one x-tied pair of 6
        let x = [1.0, 1.0, 2.0, 3.0];
        let y = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(
            correlation(&x, &y, CorrelationMethod::Kendall),
            5.0 / 30.0_f64.sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_correlation_truncates_mismatched_lengths() {
        let x = [1.0, 2.0, 3.0, 4.0, 100.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        assert_relative_eq!(correlation(&x, &y, CorrelationMethod::Pearson), 1.0);
    }

    #[test]
    fn test_correlation_matrix_symmetric_unit_diagonal() {
        let columns = vec![
            vec![0.01, -0.02, 0.015, 0.03],
            vec![0.005, -0.01, 0.02, -0.005],
            vec![0.0, 0.01, -0.01, 0.02],
        ];
        let m = correlation_matrix(&columns, CorrelationMethod::Pearson);
        for i in 0..3 {
            assert_relative_eq!(m[(i, i)], 1.0);
            for j in 0..3 {
                assert_relative_eq!(m[(i, j)], m[(j, i)]);
            }
        }
    }

    #[test]
    fn test_zero_variance_column_diagonal() {
        let columns = vec![vec![0.01, 0.01, 0.01], vec![0.01, -0.02, 0.03]];
        let m = correlation_matrix(&columns, CorrelationMethod::Pearson);
        assert_eq!(m[(0, 0)], 0.0);
        assert_eq!(m[(1, 1)], 1.0);
    }

    #[test]
    fn test_outlier_mask_alignment() {
        let values = [1.0, 1.1, f64::NAN, 0.9, 100.0, 1.05];
        let mask = outliers(&values, OutlierMethod::ModifiedZScore);
        assert_eq!(mask.len(), values.len());
        assert!(!mask[2], "non-finite position must be not-outlier");
        assert!(mask[4], "100.0 must be flagged");
        assert!(!mask[0]);
    }

    #[test]
    fn test_iqr_outliers() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 50.0];
        let mask = outliers(&values, OutlierMethod::Iqr);
        assert!(mask[5]);
        assert!(!mask[0]);
    }

    #[test]
    fn test_normalize_min_max() {
        let out = normalize(&[1.0, 2.0, 3.0], NormalizationMethod::MinMax);
        assert_relative_eq!(out[0], 0.0);
        assert_relative_eq!(out[1], 0.5);
        assert_relative_eq!(out[2], 1.0);

        let flat = normalize(&[2.0, 2.0], NormalizationMethod::MinMax);
        assert_eq!(flat, vec![0.0, 0.0]);
    }

    #[test]
    fn test_normalize_preserves_nan_positions() {
        let out = normalize(&[1.0, f64::NAN, 3.0], NormalizationMethod::ZScore);
        assert!(out[1].is_nan());
        assert!(out[0].is_finite());
    }

    #[test]
    fn test_confidence_interval_brackets_mean() {
        let values = [0.01, 0.02, -0.01, 0.015, 0.005, -0.002, 0.01];
        let m = mean(&values);
        let (lo, hi) = confidence_interval(&values, 0.95);
        assert!(lo < m && m < hi);

        let (lo1, hi1) = confidence_interval(&[0.01], 0.95);
        assert_eq!(lo1, hi1);
    }

    #[test]
    fn test_jarque_bera_on_uniformish_data() {
        let values: Vec<f64> = (0..100).map(|i| f64::from(i) / 100.0).collect();
        let test = jarque_bera(&values);
        assert!(test.statistic >= 0.0);
        assert!((0.0..=1.0).contains(&test.p_value));

        let short = jarque_bera(&[1.0, 2.0]);
        assert!(short.normal);
        assert_eq!(short.p_value, 1.0);
    }
}
