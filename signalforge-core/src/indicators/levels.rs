//! Support and resistance levels.
//!
//! Two derivations, selected by `LevelMethod`:
//! - rolling extremes: min/max close over a short and a long trailing window;
//! - percentiles: 25/10/75/90th percentile of all closes, with a fixed
//!   ±5%/±10% band around the current price when history is short.
//!
//! Either way the result is clamped so that
//! `support_2 <= support_1 <= current <= resistance_1 <= resistance_2`.

use serde::{Deserialize, Serialize};

use crate::config::{IndicatorSettings, LevelMethod};

/// Percentile levels need at least this many closes.
pub const MIN_PERCENTILE_POINTS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevels {
    pub support_1: f64,
    pub support_2: f64,
    pub resistance_1: f64,
    pub resistance_2: f64,
}

impl PriceLevels {
    pub fn compute(closes: &[f64], current: f64, settings: &IndicatorSettings) -> Self {
        let raw = match settings.level_method {
            LevelMethod::RollingExtremes => rolling_extremes(
                closes,
                settings.level_window_short,
                settings.level_window_long,
            ),
            LevelMethod::Percentile => percentile_levels(closes, current),
        };
        raw.clamped(current)
    }

    /// Enforce the ordering invariant around `current`.
    pub fn clamped(self, current: f64) -> Self {
        let support_1 = self.support_1.min(current);
        let support_2 = self.support_2.min(support_1);
        let resistance_1 = self.resistance_1.max(current);
        let resistance_2 = self.resistance_2.max(resistance_1);
        Self {
            support_1,
            support_2,
            resistance_1,
            resistance_2,
        }
    }

    pub fn is_ordered(&self, current: f64) -> bool {
        self.support_2 <= self.support_1
            && self.support_1 <= current
            && current <= self.resistance_1
            && self.resistance_1 <= self.resistance_2
    }
}

fn rolling_extremes(closes: &[f64], short: usize, long: usize) -> PriceLevels {
    let tail = |w: usize| &closes[closes.len().saturating_sub(w)..];
    let min = |s: &[f64]| s.iter().copied().fold(f64::INFINITY, f64::min);
    let max = |s: &[f64]| s.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    PriceLevels {
        support_1: min(tail(short)),
        support_2: min(tail(long)),
        resistance_1: max(tail(short)),
        resistance_2: max(tail(long)),
    }
}

fn percentile_levels(closes: &[f64], current: f64) -> PriceLevels {
    if closes.len() < MIN_PERCENTILE_POINTS {
        return PriceLevels {
            support_1: current * 0.95,
            support_2: current * 0.90,
            resistance_1: current * 1.05,
            resistance_2: current * 1.10,
        };
    }
    let mut sorted = closes.to_vec();
    sorted.sort_by(f64::total_cmp);
    PriceLevels {
        support_1: percentile(&sorted, 25.0),
        support_2: percentile(&sorted, 10.0),
        resistance_1: percentile(&sorted, 75.0),
        resistance_2: percentile(&sorted, 90.0),
    }
}

/// Linear-interpolated percentile of ascending `sorted` values (`q` in 0..=100).
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = q / 100.0 * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    fn settings(method: LevelMethod) -> IndicatorSettings {
        IndicatorSettings {
            level_method: method,
            ..IndicatorSettings::default()
        }
    }

    #[test]
    fn rolling_extremes_use_both_windows() {
        // Last 20: 81..=100 with a dip to 50 at position 5 from the end of 20.
        let mut closes: Vec<f64> = (1..=100).map(|i| i as f64).collect();
        closes[85] = 50.0;
        let levels = PriceLevels::compute(&closes, 100.0, &settings(LevelMethod::RollingExtremes));
        assert_eq!(levels.support_1, 91.0);
        assert_eq!(levels.support_2, 50.0);
        assert_eq!(levels.resistance_1, 100.0);
        assert_eq!(levels.resistance_2, 100.0);
    }

    #[test]
    fn flat_series_collapses_levels() {
        let levels =
            PriceLevels::compute(&[100.0; 30], 100.0, &settings(LevelMethod::RollingExtremes));
        assert_eq!(levels.support_1, 100.0);
        assert_eq!(levels.resistance_1, 100.0);
        assert!(levels.is_ordered(100.0));
    }

    #[test]
    fn short_series_uses_whole_history() {
        let levels =
            PriceLevels::compute(&[3.0, 1.0, 2.0], 2.0, &settings(LevelMethod::RollingExtremes));
        assert_eq!(levels.support_2, 1.0);
        assert_eq!(levels.resistance_2, 3.0);
    }

    #[test]
    fn percentile_fallback_for_short_history() {
        let levels = PriceLevels::compute(&[100.0; 10], 100.0, &settings(LevelMethod::Percentile));
        assert_approx(levels.support_1, 95.0, DEFAULT_EPSILON);
        assert_approx(levels.support_2, 90.0, DEFAULT_EPSILON);
        assert_approx(levels.resistance_1, 105.0, DEFAULT_EPSILON);
        assert_approx(levels.resistance_2, 110.0, DEFAULT_EPSILON);
    }

    #[test]
    fn percentile_levels_are_clamped_around_current() {
        // Current price sits far above the 75th/90th percentile.
        let mut closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        closes.push(300.0);
        let levels = PriceLevels::compute(&closes, 300.0, &settings(LevelMethod::Percentile));
        assert!(levels.is_ordered(300.0));
        assert_eq!(levels.resistance_1, 300.0);
        assert_eq!(levels.resistance_2, 300.0);
    }

    #[test]
    fn percentile_interpolates_linearly() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_approx(percentile(&sorted, 25.0), 2.0, DEFAULT_EPSILON);
        assert_approx(percentile(&sorted, 10.0), 1.4, DEFAULT_EPSILON);
        assert_approx(percentile(&sorted, 90.0), 4.6, DEFAULT_EPSILON);
        assert_eq!(percentile(&[7.0], 50.0), 7.0);
    }

    #[test]
    fn clamping_repairs_inverted_levels() {
        let raw = PriceLevels {
            support_1: 110.0,
            support_2: 120.0,
            resistance_1: 90.0,
            resistance_2: 80.0,
        };
        let fixed = raw.clamped(100.0);
        assert!(fixed.is_ordered(100.0));
        assert_eq!(fixed.support_1, 100.0);
        assert_eq!(fixed.resistance_2, 100.0);
    }
}
