//! Moving Average Convergence Divergence (MACD).
//!
//! - Line: EMA(close, fast) - EMA(close, slow)
//! - Signal: EMA(line, signal_period)
//! - Histogram: line - signal
//!
//! All EMAs are seeded with their first input, so every output is defined
//! from bar 0. Lookback: 0.

use serde::{Deserialize, Serialize};

use super::ema::ema_of_series;
use super::Indicator;
use crate::domain::PricePoint;

/// Histogram values within `price * CROSSOVER_TOLERANCE_REL` of zero count as zero.
pub const CROSSOVER_TOLERANCE_REL: f64 = 1e-9;

/// Which MACD output an instance computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdLine {
    Line,
    Signal,
    Histogram,
}

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    output: MacdLine,
    name: String,
}

/// All three MACD outputs, same length as the input.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize, output: MacdLine) -> Self {
        assert!(fast >= 1 && signal >= 1, "MACD periods must be >= 1");
        assert!(fast < slow, "MACD fast period must be below slow period");
        let prefix = match output {
            MacdLine::Line => "macd",
            MacdLine::Signal => "macd_signal",
            MacdLine::Histogram => "macd_hist",
        };
        Self {
            fast,
            slow,
            signal,
            output,
            name: format!("{prefix}_{fast}_{slow}_{signal}"),
        }
    }

    pub fn series(&self, closes: &[f64]) -> MacdSeries {
        macd_series(closes, self.fast, self.slow, self.signal)
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, points: &[PricePoint]) -> Vec<f64> {
        let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
        let series = self.series(&closes);
        match self.output {
            MacdLine::Line => series.line,
            MacdLine::Signal => series.signal,
            MacdLine::Histogram => series.histogram,
        }
    }
}

pub fn macd_series(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let fast_ema = ema_of_series(closes, fast);
    let slow_ema = ema_of_series(closes, slow);
    let line: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();
    let signal = ema_of_series(&line, signal);
    let histogram = line.iter().zip(&signal).map(|(l, s)| l - s).collect();
    MacdSeries {
        line,
        signal,
        histogram,
    }
}

/// Direction of a histogram zero crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Crossover {
    /// Histogram moved from <= 0 to > 0.
    Golden,
    /// Histogram moved from >= 0 to < 0.
    Death,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossoverEvent {
    pub index: usize,
    pub kind: Crossover,
}

/// Every zero crossing of the histogram, oldest first.
pub fn crossovers(histogram: &[f64], tolerance: f64) -> Vec<CrossoverEvent> {
    let snap = |v: f64| if v.abs() <= tolerance { 0.0 } else { v };
    let mut events = Vec::new();
    for i in 1..histogram.len() {
        let (prev, cur) = (snap(histogram[i - 1]), snap(histogram[i]));
        if prev.is_nan() || cur.is_nan() {
            continue;
        }
        let kind = if prev <= 0.0 && cur > 0.0 {
            Crossover::Golden
        } else if prev >= 0.0 && cur < 0.0 {
            Crossover::Death
        } else {
            continue;
        };
        events.push(CrossoverEvent { index: i, kind });
    }
    events
}

/// Most recent crossover no older than `lookback` bars before the last bar.
pub fn recent_crossover(events: &[CrossoverEvent], len: usize, lookback: usize) -> Crossover {
    match events.last() {
        Some(event) if len.saturating_sub(1) - event.index <= lookback => event.kind,
        _ => Crossover::None,
    }
}
