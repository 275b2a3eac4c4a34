//! Relative Strength Index (RSI).
//!
//! Wilder smoothing: the averages are seeded with the simple mean of the first
//! `period` changes, then avg = (prev * (period - 1) + current) / period.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss).
//! Lookback: period.
//! Edge cases: no movement → 50; no losses → 100; no gains → 0.

use super::{changes, Indicator};
use crate::domain::PricePoint;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, points: &[PricePoint]) -> Vec<f64> {
        let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
        wilder_rsi(&closes, self.period)
    }
}

/// Wilder RSI over closes. The first `period` values are `NaN`.
pub fn wilder_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period + 1 {
        return result;
    }

    let deltas = changes(closes);
    let (mut avg_gain, mut avg_loss) = deltas[1..=period]
        .iter()
        .fold((0.0, 0.0), |(g, l), &d| (g + d.max(0.0), l + (-d).max(0.0)));
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    result[period] = rsi_from_averages(avg_gain, avg_loss);

    let alpha = 1.0 / period as f64;
    for i in (period + 1)..n {
        avg_gain = alpha * deltas[i].max(0.0) + (1.0 - alpha) * avg_gain;
        avg_loss = alpha * (-deltas[i]).max(0.0) + (1.0 - alpha) * avg_loss;
        result[i] = rsi_from_averages(avg_gain, avg_loss);
    }
    result
}

/// RSI from simple rolling means of gains and losses (no smoothing memory).
///
/// Used as a forecast feature: it only depends on the trailing window, so a
/// row's value does not drift with the length of history before it.
pub fn rolling_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period + 1 {
        return result;
    }

    let deltas = changes(closes);
    for i in period..n {
        let window = &deltas[(i + 1 - period)..=i];
        let gain: f64 = window.iter().map(|d| d.max(0.0)).sum();
        let loss: f64 = window.iter().map(|d| (-d).max(0.0)).sum();
        result[i] = rsi_from_averages(gain / period as f64, loss / period as f64);
    }
    result
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_points};

    #[test]
    fn rsi_all_gains() {
        let points = make_points(&[100.0, 101.0, 102.0, 103.0, 104.0, 105.0]);
        let result = Rsi::new(3).compute(&points);
        assert_approx(result[3], 100.0, 1e-9);
        assert_approx(result[5], 100.0, 1e-9);
    }

    #[test]
    fn rsi_all_losses() {
        let points = make_points(&[105.0, 104.0, 103.0, 102.0, 101.0, 100.0]);
        let result = Rsi::new(3).compute(&points);
        assert_approx(result[3], 0.0, 1e-9);
    }

    #[test]
    fn rsi_flat_is_fifty() {
        let result = wilder_rsi(&[100.0; 20], 14);
        assert_approx(result[19], 50.0, 1e-12);
    }

    #[test]
    fn rsi_seed_value() {
        // Changes: +0.34, -0.25, -0.48 → avg_gain = 0.34/3, avg_loss = 0.73/3
        // RSI = 100 - 100 / (1 + 0.34 / 0.73)
        let result = wilder_rsi(&[44.0, 44.34, 44.09, 43.61, 44.33], 3);
        assert!(result[..3].iter().all(|v| v.is_nan()));
        let expected = 100.0 - 100.0 / (1.0 + 0.34 / 0.73);
        assert_approx(result[3], expected, 1e-9);
    }

    #[test]
    fn rsi_wilder_step() {
        // Seed (period 2): changes +2, -1 → gain 1.0, loss 0.5
        // Next change +1: gain = 0.5*1 + 0.5*1.0 = 1.0, loss = 0.5*0 + 0.5*0.5 = 0.25
        let result = wilder_rsi(&[10.0, 12.0, 11.0, 12.0], 2);
        assert_approx(result[2], 100.0 - 100.0 / 3.0, 1e-9);
        assert_approx(result[3], 100.0 - 100.0 / 5.0, 1e-9);
    }

    #[test]
    fn rsi_bounds() {
        let result = wilder_rsi(&[100.0, 105.0, 98.0, 110.0, 95.0, 115.0, 90.0, 120.0], 3);
        for (i, &v) in result.iter().enumerate() {
            if !v.is_nan() {
                assert!((0.0..=100.0).contains(&v), "RSI out of bounds at {i}: {v}");
            }
        }
    }

    #[test]
    fn rsi_needs_period_plus_one_points() {
        assert!(wilder_rsi(&[1.0, 2.0, 3.0], 3).iter().all(|v| v.is_nan()));
        assert!(rolling_rsi(&[1.0, 2.0, 3.0], 3).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn rolling_rsi_forgets_old_moves() {
        // Window of 2 changes only sees the final two gains.
        let result = rolling_rsi(&[100.0, 50.0, 51.0, 52.0], 2);
        assert_approx(result[3], 100.0, 1e-12);
        assert!(wilder_rsi(&[100.0, 50.0, 51.0, 52.0], 2)[3] < 100.0);
    }

    #[test]
    fn rsi_lookback() {
        assert_eq!(Rsi::new(14).lookback(), 14);
    }
}
