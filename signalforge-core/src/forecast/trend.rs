//! Additive trend + seasonal model.
//!
//! Y = T + S + R, where T is an OLS line over the trailing `trend_window`
//! closes, S is a zero-mean seasonal index per phase of `seasonal_period`
//! (estimated from the detrended values when at least two full periods are
//! available), and R is the residual. Prediction intervals are the usual OLS
//! ones, `z * sigma * sqrt(1 + 1/n + (x - x_mean)^2 / Sxx)`.

use serde::{Deserialize, Serialize};

use super::FitError;
use crate::config::ForecastSettings;

/// The trend model needs at least this many closes.
pub const MIN_TREND_POINTS: usize = 10;
/// Two-sided 80% normal quantile.
pub const Z_80: f64 = 1.2816;

/// Fitting entry point.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrendSeasonalModel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendFit {
    intercept: f64,
    slope: f64,
    /// Empty when the window holds fewer than two periods.
    seasonal: Vec<f64>,
    sigma: f64,
    n: usize,
    x_mean: f64,
    sxx: f64,
    /// Residual RMS relative to the mean close.
    relative_error: f64,
}

impl TrendSeasonalModel {
    pub fn fit(closes: &[f64], settings: &ForecastSettings) -> Result<TrendFit, FitError> {
        let window = &closes[closes.len().saturating_sub(settings.trend_window)..];
        let n = window.len();
        if n < MIN_TREND_POINTS {
            return Err(FitError::TooFewPoints {
                points: n,
                min: MIN_TREND_POINTS,
            });
        }

        let nf = n as f64;
        let x_mean = (nf - 1.0) / 2.0;
        let y_mean = window.iter().sum::<f64>() / nf;
        let (mut sxy, mut sxx) = (0.0, 0.0);
        for (i, &y) in window.iter().enumerate() {
            let dx = i as f64 - x_mean;
            sxy += dx * (y - y_mean);
            sxx += dx * dx;
        }
        let slope = sxy / sxx;
        let intercept = y_mean - slope * x_mean;

        let detrended: Vec<f64> = window
            .iter()
            .enumerate()
            .map(|(i, &y)| y - (intercept + slope * i as f64))
            .collect();

        let period = settings.seasonal_period;
        let seasonal = if period >= 2 && n >= 2 * period {
            seasonal_indices(&detrended, period)
        } else {
            Vec::new()
        };

        let sse: f64 = detrended
            .iter()
            .enumerate()
            .map(|(i, r)| (r - phase(&seasonal, i)).powi(2))
            .sum();
        let sigma = (sse / (nf - 2.0)).sqrt();
        let relative_error = (sse / nf).sqrt() / y_mean;

        let fit = TrendFit {
            intercept,
            slope,
            seasonal,
            sigma,
            n,
            x_mean,
            sxx,
            relative_error,
        };
        if [slope, intercept, sigma, relative_error]
            .iter()
            .any(|v| !v.is_finite())
        {
            return Err(FitError::NonFinite {
                model: "trend_seasonal",
            });
        }
        Ok(fit)
    }
}

impl TrendFit {
    /// Point prediction and 80% interval `step` bars after the last close.
    pub fn predict(&self, step: usize) -> (f64, f64, f64) {
        let x = (self.n - 1 + step) as f64;
        let value = self.intercept + self.slope * x + phase(&self.seasonal, self.n - 1 + step);
        let nf = self.n as f64;
        let half = Z_80
            * self.sigma
            * (1.0 + 1.0 / nf + (x - self.x_mean).powi(2) / self.sxx).sqrt();
        (value, value - half, value + half)
    }

    pub fn relative_error(&self) -> f64 {
        self.relative_error
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }

    pub fn has_seasonality(&self) -> bool {
        !self.seasonal.is_empty()
    }
}

fn phase(seasonal: &[f64], i: usize) -> f64 {
    if seasonal.is_empty() {
        0.0
    } else {
        seasonal[i % seasonal.len()]
    }
}

/// Mean detrended value per phase, centered to sum to zero.
fn seasonal_indices(detrended: &[f64], period: usize) -> Vec<f64> {
    let mut sums = vec![0.0; period];
    let mut counts = vec![0usize; period];
    for (i, &v) in detrended.iter().enumerate() {
        sums[i % period] += v;
        counts[i % period] += 1;
    }
    let mut indices: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
        .collect();
    let avg = indices.iter().sum::<f64>() / period as f64;
    for s in &mut indices {
        *s -= avg;
    }
    indices
}
