//! Structured error types that cross the pipeline boundary.
//!
//! Only `ValidationError` is ever returned to callers. Short histories and
//! model-fit problems degrade to documented defaults instead of failing.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Malformed input: the series or the configuration cannot be analyzed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("price series is empty")]
    EmptySeries,

    #[error("non-finite {field} at index {index}")]
    NonFinite { index: usize, field: &'static str },

    #[error("non-positive {field} at index {index}: {value}")]
    NonPositivePrice {
        index: usize,
        field: &'static str,
        value: f64,
    },

    #[error("negative volume at index {index}: {value}")]
    NegativeVolume { index: usize, value: f64 },

    #[error("open/close outside [low, high] at index {index}")]
    InconsistentRange { index: usize },

    #[error("timestamp at index {index} ({current}) is not after previous ({previous})")]
    NonMonotonicTimestamp {
        index: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Configuration problems detected by `AnalysisConfig::validate` or while parsing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be >= {min}, got {value}")]
    TooSmall {
        name: &'static str,
        min: usize,
        value: usize,
    },

    #[error("macd_fast ({fast}) must be smaller than macd_slow ({slow})")]
    MacdPeriods { fast: usize, slow: usize },

    #[error("{name} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        name: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("{name} must sum to 1.0, got {sum}")]
    WeightsSum { name: &'static str, sum: f64 },

    #[error("{name} must be non-negative with a positive total")]
    WeightsDegenerate { name: &'static str },

    #[error("{name}: {lower} must be below {upper}")]
    ThresholdOrder {
        name: &'static str,
        lower: f64,
        upper: f64,
    },

    #[error("parse config TOML: {0}")]
    Parse(String),

    #[error("read config file: {0}")]
    Io(String),
}
