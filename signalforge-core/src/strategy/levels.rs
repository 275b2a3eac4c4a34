//! Entry, exit and stop-loss prices.
//!
//! Entry sits between the nearest level and the current price; a stronger
//! signal moves it closer to the current price (more urgency). Exits are
//! capped by the first level on the other side and the forecast band.

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::forecast::ForecastResult;
use crate::indicators::PriceLevels;
use crate::signals::{Direction, FusedSignal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bias {
    Long,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradingLevels {
    pub bias: Bias,
    pub optimal_entry: f64,
    pub optimal_exit: f64,
    pub stop_loss: f64,
}

impl TradingLevels {
    pub fn compute(
        levels: &PriceLevels,
        signal: &FusedSignal,
        current: f64,
        forecast: &ForecastResult,
        config: &AnalysisConfig,
    ) -> Self {
        let urgency = signal.strength / 100.0 * config.thresholds.max_entry_urgency;
        let margin = config.safety_margin_pct;

        match signal.direction {
            Direction::Bearish => {
                let entry = levels.resistance_1 - (levels.resistance_1 - current) * urgency;
                let exit = if levels.support_1 < current {
                    levels.support_1.max(forecast.lower_bound)
                } else {
                    forecast.lower_bound
                };
                Self {
                    bias: Bias::Short,
                    optimal_entry: entry,
                    optimal_exit: exit.min(entry),
                    stop_loss: levels.resistance_2 * (1.0 + margin),
                }
            }
            Direction::Bullish | Direction::Neutral => {
                let entry = if signal.direction == Direction::Bullish {
                    levels.support_1 + (current - levels.support_1) * urgency
                } else {
                    current
                };
                Self {
                    bias: Bias::Long,
                    optimal_entry: entry,
                    optimal_exit: long_exit(levels, current, forecast, entry),
                    stop_loss: long_stop(levels, margin),
                }
            }
        }
    }
}

/// First resistance or the forecast upper bound, whichever is lower; never below `entry`.
pub fn long_exit(levels: &PriceLevels, current: f64, forecast: &ForecastResult, entry: f64) -> f64 {
    let exit = if levels.resistance_1 > current {
        levels.resistance_1.min(forecast.upper_bound)
    } else {
        forecast.upper_bound
    };
    exit.max(entry)
}

pub fn long_stop(levels: &PriceLevels, margin: f64) -> f64 {
    levels.support_2 * (1.0 - margin)
}
