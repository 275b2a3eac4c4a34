//! Technical indicators.
//!
//! Series indicators implement [`Indicator`]: a full price history in, a
//! `Vec<f64>` of the same length out, `NaN` during warmup. The snapshot layer
//! (`snapshot.rs`) reads the latest values and turns them into finite,
//! classified fields, falling back to documented defaults when a value is
//! still undefined.
//!
//! Multi-output indicators (MACD, Bollinger) are exposed as one named
//! instance per output line, keeping the single-series trait unchanged.

pub mod bollinger;
pub mod ema;
pub mod levels;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod snapshot;

pub use bollinger::{Bollinger, BollingerBand};
pub use ema::Ema;
pub use levels::PriceLevels;
pub use macd::{Crossover, CrossoverEvent, Macd, MacdLine, MacdSeries};
pub use rsi::Rsi;
pub use sma::Sma;
pub use snapshot::{
    BollingerValues, IndicatorSnapshot, MacdSignal, MacdValues, RsiTrend,
};

use crate::domain::PricePoint;

/// A pure function from price history to a numeric series.
///
/// No value at index t may depend on data after t.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g. "rsi_14", "macd_signal_12_26_9").
    fn name(&self) -> &str;

    /// Number of leading values that are `NaN`.
    fn lookback(&self) -> usize;

    /// Compute the indicator over the whole history.
    fn compute(&self, points: &[PricePoint]) -> Vec<f64>;
}

/// Last element of a series, if it is defined.
pub fn last_defined(values: &[f64]) -> Option<f64> {
    values.last().copied().filter(|v| v.is_finite())
}

/// Close-to-close changes; element 0 is `NaN`.
pub(crate) fn changes(closes: &[f64]) -> Vec<f64> {
    let mut out = vec![f64::NAN; closes.len()];
    for i in 1..closes.len() {
        out[i] = closes[i] - closes[i - 1];
    }
    out
}

/// Synthetic points from closes for tests: open = previous close,
/// high/low one unit outside the body, volume 1000.
#[cfg(test)]
pub fn make_points(closes: &[f64]) -> Vec<PricePoint> {
    use chrono::{Duration, TimeZone, Utc};
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            PricePoint {
                timestamp: start + Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: (open.min(close) - 1.0).max(0.01),
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
