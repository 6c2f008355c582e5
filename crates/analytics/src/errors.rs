//! Error types for the analytics engine
//!
//! Only genuine programming errors surface here. Degenerate market-data
//! conditions (empty series, zero variance, unmatched weights) return
//! documented neutral values instead; see the `degenerate` flag on
//! [`crate::types::MetricValue`].

use thiserror::Error;

/// Analytics error types
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Malformed return or price series
    #[error("Invalid series: {0}")]
    InvalidSeries(String),

    /// Malformed shock specification
    #[error("Invalid shock specification: {0}")]
    InvalidShock(String),

    /// Out-of-range or non-finite parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, AnalyticsError>;
