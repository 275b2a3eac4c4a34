//! Staged buy and take-profit plan.

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::forecast::ForecastResult;
use crate::indicators::PriceLevels;
use crate::signals::FusedSignal;

use super::levels::{long_exit, long_stop, TradingLevels};
use super::risk::RiskLevel;

/// Ranges narrower than this (relative to their top) collapse to one tranche.
const DEGENERATE_WIDTH: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tranche {
    pub price: f64,
    pub allocation_fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitStrategy {
    pub take_profit: Vec<Tranche>,
    pub stop_loss: f64,
    pub trailing_stop_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcaPlan {
    pub entry_points: Vec<Tranche>,
    pub risk_level: RiskLevel,
    pub risk_explanation: String,
    pub exit_strategy: ExitStrategy,
    pub schedule_description: String,
}

impl DcaPlan {
    /// The plan is always long: entries step down toward second support,
    /// exits step up toward second resistance.
    pub fn build(
        trading: &TradingLevels,
        levels: &PriceLevels,
        signal: &FusedSignal,
        current: f64,
        forecast: &ForecastResult,
        config: &AnalysisConfig,
    ) -> Self {
        let spread = forecast.spread_pct().max(0.0);
        let risk_level =
            RiskLevel::assess(signal.confidence, signal.strength, spread, &config.risk);

        let entry_top = trading.optimal_entry.min(current);
        let entry_bottom = levels.support_2.min(entry_top);
        let entry_points = ladder(
            entry_top,
            entry_bottom,
            config.dca_tranche_count.clamp(2, 4),
            Weighting::BackLoaded,
        );

        let tp_start = long_exit(levels, current, forecast, current.min(trading.optimal_entry));
        let tp_end = levels.resistance_2.max(tp_start);
        let take_profit = ladder(
            tp_start,
            tp_end,
            config.take_profit_tranche_count.clamp(2, 3),
            Weighting::FrontLoaded,
        );

        Self {
            entry_points,
            risk_level,
            risk_explanation: risk_level.explanation().to_string(),
            exit_strategy: ExitStrategy {
                take_profit,
                stop_loss: long_stop(levels, config.safety_margin_pct),
                trailing_stop_pct: risk_level.trailing_stop_pct(spread),
            },
            schedule_description: risk_level.schedule().to_string(),
        }
    }

    pub fn entry_allocation(&self) -> f64 {
        self.entry_points.iter().map(|t| t.allocation_fraction).sum()
    }

    pub fn take_profit_allocation(&self) -> f64 {
        self.exit_strategy
            .take_profit
            .iter()
            .map(|t| t.allocation_fraction)
            .sum()
    }
}

#[derive(Debug, Clone, Copy)]
enum Weighting {
    /// Tranche i gets weight i + 1: the last price carries the most.
    BackLoaded,
    /// Tranche i gets weight n - i: the first price carries the most.
    FrontLoaded,
}

/// `n` evenly spaced prices from `from` to `to` (inclusive) with normalized weights.
fn ladder(from: f64, to: f64, n: usize, weighting: Weighting) -> Vec<Tranche> {
    let scale = from.abs().max(to.abs());
    if n < 2 || scale == 0.0 || (to - from).abs() / scale < DEGENERATE_WIDTH {
        return vec![Tranche {
            price: from,
            allocation_fraction: 1.0,
        }];
    }

    let total = (n * (n + 1) / 2) as f64;
    let step = (to - from) / (n - 1) as f64;
    (0..n)
        .map(|i| {
            let weight = match weighting {
                Weighting::BackLoaded => i + 1,
                Weighting::FrontLoaded => n - i,
            };
            Tranche {
                price: if i == n - 1 { to } else { from + step * i as f64 },
                allocation_fraction: weight as f64 / total,
            }
        })
        .collect()
}
