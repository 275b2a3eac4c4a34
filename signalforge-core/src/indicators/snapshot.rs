//! Latest-value view of the indicators for one analysis request.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::bollinger::{Bollinger, BollingerBand};
use super::macd::{crossovers, recent_crossover, Crossover, Macd, MacdLine, CROSSOVER_TOLERANCE_REL};
use super::rsi::Rsi;
use super::sma::Sma;
use super::{last_defined, Indicator};
use crate::config::AnalysisConfig;
use crate::domain::PriceSeries;

/// RSI returned when history is too short to compute one.
pub const NEUTRAL_RSI: f64 = 50.0;
/// RSI strength reported alongside the neutral default.
pub const DEFAULT_RSI_STRENGTH: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RsiTrend {
    Overbought,
    Neutral,
    Oversold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MacdSignal {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdValues {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerValues {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    /// Position of the close inside the bands: 0 at lower, 1 at upper.
    pub percent_b: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub rsi_value: f64,
    pub rsi_trend: RsiTrend,
    /// |rsi - 50| / 50, or 0.5 when RSI is undefined.
    pub rsi_strength: f64,
    pub macd: MacdValues,
    pub macd_signal: MacdSignal,
    pub macd_crossover: Crossover,
    /// |histogram| relative to recent close-to-close volatility, in [0, 1].
    pub trend_strength: f64,
    pub sma: Option<f64>,
    pub bollinger: Option<BollingerValues>,
}

impl IndicatorSnapshot {
    pub fn compute(series: &PriceSeries, config: &AnalysisConfig) -> Self {
        let points = series.points();
        let closes = series.closes();
        let current = series.current_price();
        let ind = &config.indicators;

        let (rsi_value, rsi_trend, rsi_strength) =
            match last_defined(&Rsi::new(config.rsi_period).compute(points)) {
                Some(rsi) => (
                    rsi,
                    classify_rsi(
                        rsi,
                        config.thresholds.rsi_overbought,
                        config.thresholds.rsi_oversold,
                    ),
                    ((rsi - 50.0).abs() / 50.0).clamp(0.0, 1.0),
                ),
                None => (NEUTRAL_RSI, RsiTrend::Neutral, DEFAULT_RSI_STRENGTH),
            };

        let macd = Macd::new(
            config.macd_fast,
            config.macd_slow,
            config.macd_signal_period,
            MacdLine::Histogram,
        )
        .series(&closes);
        let tolerance = current * CROSSOVER_TOLERANCE_REL;
        let macd_values = MacdValues {
            line: last_defined(&macd.line).unwrap_or(0.0),
            signal: last_defined(&macd.signal).unwrap_or(0.0),
            histogram: last_defined(&macd.histogram).unwrap_or(0.0),
        };
        let macd_signal = classify_macd(&macd_values, tolerance);
        let events = crossovers(&macd.histogram, tolerance);
        let macd_crossover = recent_crossover(&events, closes.len(), ind.crossover_lookback);
        let trend_strength =
            trend_strength(macd_values.histogram, &closes, ind.trend_lookback);

        let sma = last_defined(&Sma::new(ind.sma_period).compute(points));
        let bollinger = bollinger_values(series, ind.bollinger_period, ind.bollinger_multiplier);

        debug!(
            rsi = rsi_value,
            ?rsi_trend,
            histogram = macd_values.histogram,
            ?macd_signal,
            ?macd_crossover,
            trend_strength,
            "indicators computed"
        );

        Self {
            rsi_value,
            rsi_trend,
            rsi_strength,
            macd: macd_values,
            macd_signal,
            macd_crossover,
            trend_strength,
            sma,
            bollinger,
        }
    }
}

pub fn classify_rsi(rsi: f64, overbought: f64, oversold: f64) -> RsiTrend {
    if rsi > overbought {
        RsiTrend::Overbought
    } else if rsi < oversold {
        RsiTrend::Oversold
    } else {
        RsiTrend::Neutral
    }
}

/// Histogram sign first; when the histogram is flat, the side of zero the line is on.
fn classify_macd(values: &MacdValues, tolerance: f64) -> MacdSignal {
    for v in [values.histogram, values.line] {
        if v > tolerance {
            return MacdSignal::Bullish;
        }
        if v < -tolerance {
            return MacdSignal::Bearish;
        }
    }
    MacdSignal::Neutral
}

/// |histogram| over the RMS of the last `lookback` close-to-close changes.
fn trend_strength(histogram: f64, closes: &[f64], lookback: usize) -> f64 {
    let start = closes.len().saturating_sub(lookback + 1);
    let window = &closes[start..];
    if window.len() < 2 {
        return 0.0;
    }
    let sum_sq: f64 = window.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum();
    let baseline = (sum_sq / (window.len() - 1) as f64).sqrt();
    if baseline == 0.0 {
        return 0.0;
    }
    (histogram.abs() / baseline).clamp(0.0, 1.0)
}

fn bollinger_values(series: &PriceSeries, period: usize, multiplier: f64) -> Option<BollingerValues> {
    let points = series.points();
    let band = |b| last_defined(&Bollinger::new(period, multiplier, b).compute(points));
    let upper = band(BollingerBand::Upper)?;
    let middle = band(BollingerBand::Middle)?;
    let lower = band(BollingerBand::Lower)?;
    let width = upper - lower;
    let percent_b = if width > 0.0 {
        (series.current_price() - lower) / width
    } else {
        0.5
    };
    Some(BollingerValues {
        upper,
        middle,
        lower,
        percent_b,
    })
}
