//! Scale-free features for the return regressor.
//!
//! Row t describes the market at the close of bar t using only closes up to
//! t. Its target is the forward return over `horizon` bars. Rows whose
//! features are undefined (warmup) or whose target lies beyond the series are
//! left out of the training set.

use crate::indicators::bollinger::mean_and_stddev;
use crate::indicators::macd::macd_series;
use crate::indicators::rsi::rolling_rsi;
use crate::indicators::sma::sma_of_series;

pub const FEATURE_NAMES: [&str; 8] = [
    "return_1",
    "return_2",
    "return_3",
    "return_5",
    "volatility",
    "sma_gap",
    "rsi",
    "macd_relative",
];

pub const N_FEATURES: usize = FEATURE_NAMES.len();

const RETURN_LAGS: [usize; 4] = [1, 2, 3, 5];

/// Training rows plus the feature row of the latest bar.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    pub rows: Vec<[f64; N_FEATURES]>,
    pub targets: Vec<f64>,
    /// Features of the last bar, the row the forecast is made from.
    pub latest: Option<[f64; N_FEATURES]>,
}

impl FeatureSet {
    pub fn build(
        closes: &[f64],
        horizon: usize,
        window: usize,
        macd_fast: usize,
        macd_slow: usize,
    ) -> Self {
        let n = closes.len();
        let mut returns = vec![f64::NAN; n];
        for t in 1..n {
            returns[t] = closes[t] / closes[t - 1] - 1.0;
        }
        let sma = sma_of_series(closes, window);
        let rsi = rolling_rsi(closes, window);
        let macd = macd_series(closes, macd_fast, macd_slow, 1).line;

        let row_at = |t: usize| -> Option<[f64; N_FEATURES]> {
            if t < window || t < RETURN_LAGS[RETURN_LAGS.len() - 1] {
                return None;
            }
            let mut row = [0.0; N_FEATURES];
            for (slot, &lag) in row.iter_mut().zip(&RETURN_LAGS) {
                *slot = closes[t] / closes[t - lag] - 1.0;
            }
            let (_, vol) = mean_and_stddev(returns[(t + 1 - window)..=t].iter().copied());
            row[4] = vol;
            row[5] = closes[t] / sma[t] - 1.0;
            row[6] = rsi[t] / 100.0;
            row[7] = macd[t] / closes[t];
            row.iter().all(|v| v.is_finite()).then_some(row)
        };

        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for t in 0..n.saturating_sub(horizon) {
            if let Some(row) = row_at(t) {
                rows.push(row);
                targets.push(closes[t + horizon] / closes[t] - 1.0);
            }
        }
        let latest = n.checked_sub(1).and_then(row_at);

        Self {
            rows,
            targets,
            latest,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
