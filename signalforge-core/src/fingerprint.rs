//! Content fingerprints used to key trained models.
//!
//! - `SeriesFingerprint`: BLAKE3 over the timestamps, closes and every
//!   configuration value that influences model training.
//! - `ModelKey`: symbol + fingerprint, the cache key.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::AnalysisConfig;
use crate::domain::PriceSeries;

/// Hex-encoded BLAKE3 digest identifying a (series, model config) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesFingerprint(pub String);

impl SeriesFingerprint {
    pub fn compute(series: &PriceSeries, config: &AnalysisConfig) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(series.len() as u64).to_le_bytes());
        for point in series.points() {
            hasher.update(&point.timestamp.timestamp().to_le_bytes());
            hasher.update(&point.timestamp.timestamp_subsec_nanos().to_le_bytes());
            hasher.update(&point.close.to_bits().to_le_bytes());
        }

        // Canonical JSON of the model-relevant settings (struct field order is fixed).
        let model = serde_json::json!({
            "forecast": &config.forecast,
            "forecast_horizon": config.forecast_horizon,
            "macd_fast": config.macd_fast,
            "macd_slow": config.macd_slow,
        });
        hasher.update(model.to_string().as_bytes());

        Self(hasher.finalize().to_hex().to_string())
    }

    /// First 12 hex characters, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for SeriesFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cache key for a trained forecast model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelKey {
    pub symbol: String,
    pub fingerprint: SeriesFingerprint,
}

impl ModelKey {
    pub fn new(symbol: impl Into<String>, fingerprint: SeriesFingerprint) -> Self {
        Self {
            symbol: symbol.into(),
            fingerprint,
        }
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.symbol, self.fingerprint.short())
    }
}
