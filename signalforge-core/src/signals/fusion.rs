//! Weighted vote of RSI, MACD and the forecast.
//!
//! - Direction: the direction with the largest total vote weight; a tie at
//!   the top is Neutral.
//! - Strength: weighted blend of RSI strength, MACD trend strength and
//!   forecast confidence, on 0..=100.
//! - Confidence: forecast confidence, discounted once per indicator that
//!   votes against a non-neutral forecast.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{RsiVoteMode, SignalThresholds};
use crate::forecast::ForecastResult;
use crate::indicators::{IndicatorSnapshot, MacdSignal, RsiTrend};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

impl Direction {
    pub fn opposes(self, other: Direction) -> bool {
        matches!(
            (self, other),
            (Direction::Bullish, Direction::Bearish) | (Direction::Bearish, Direction::Bullish)
        )
    }
}

/// Per-source direction breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalVotes {
    pub rsi: Direction,
    pub macd: Direction,
    pub forecast: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedSignal {
    pub direction: Direction,
    pub strength: f64,
    pub confidence: f64,
    pub votes: SignalVotes,
}

pub fn fuse(
    snapshot: &IndicatorSnapshot,
    forecast: &ForecastResult,
    current: f64,
    thresholds: &SignalThresholds,
) -> FusedSignal {
    let votes = SignalVotes {
        rsi: rsi_vote(snapshot.rsi_trend, thresholds.rsi_vote),
        macd: macd_vote(snapshot.macd_signal),
        forecast: forecast_vote(
            forecast.combined_prediction,
            current,
            thresholds.forecast_neutral_band_pct,
        ),
    };

    let vw = &thresholds.vote_weights;
    let direction = tally(&[
        (votes.rsi, vw.rsi),
        (votes.macd, vw.macd),
        (votes.forecast, vw.forecast),
    ]);

    let sw = &thresholds.strength_weights;
    let strength = (100.0
        * (sw.rsi * snapshot.rsi_strength
            + sw.macd * snapshot.trend_strength
            + sw.forecast * forecast.confidence / 100.0))
        .clamp(0.0, 100.0);

    let dissent = [votes.rsi, votes.macd]
        .iter()
        .filter(|v| v.opposes(votes.forecast))
        .count();
    let confidence = (forecast.confidence
        * thresholds.disagreement_penalty.powi(dissent as i32))
    .clamp(0.0, 100.0);

    debug!(?direction, strength, confidence, ?votes, "signals fused");

    FusedSignal {
        direction,
        strength,
        confidence,
        votes,
    }
}

fn rsi_vote(trend: RsiTrend, mode: RsiVoteMode) -> Direction {
    match (trend, mode) {
        (RsiTrend::Neutral, _) => Direction::Neutral,
        (RsiTrend::Overbought, RsiVoteMode::Momentum)
        | (RsiTrend::Oversold, RsiVoteMode::Contrarian) => Direction::Bullish,
        (RsiTrend::Oversold, RsiVoteMode::Momentum)
        | (RsiTrend::Overbought, RsiVoteMode::Contrarian) => Direction::Bearish,
    }
}

fn macd_vote(signal: MacdSignal) -> Direction {
    match signal {
        MacdSignal::Bullish => Direction::Bullish,
        MacdSignal::Bearish => Direction::Bearish,
        MacdSignal::Neutral => Direction::Neutral,
    }
}

fn forecast_vote(combined: f64, current: f64, band_pct: f64) -> Direction {
    let band = current * band_pct;
    if combined > current + band {
        Direction::Bullish
    } else if combined < current - band {
        Direction::Bearish
    } else {
        Direction::Neutral
    }
}

fn tally(votes: &[(Direction, f64)]) -> Direction {
    let total = |d: Direction| -> f64 {
        votes.iter().filter(|(v, _)| *v == d).map(|(_, w)| w).sum()
    };
    let scores = [
        (Direction::Bullish, total(Direction::Bullish)),
        (Direction::Bearish, total(Direction::Bearish)),
        (Direction::Neutral, total(Direction::Neutral)),
    ];
    let top = scores.iter().map(|(_, s)| *s).fold(f64::NEG_INFINITY, f64::max);
    let mut leaders = scores.iter().filter(|(_, s)| *s == top);
    match (leaders.next(), leaders.next()) {
        (Some((d, _)), None) => *d,
        _ => Direction::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::indicators::macd::Crossover;
    use crate::indicators::MacdValues;

    fn snapshot(rsi_trend: RsiTrend, macd_signal: MacdSignal) -> IndicatorSnapshot {
        IndicatorSnapshot {
            rsi_value: match rsi_trend {
                RsiTrend::Overbought => 80.0,
                RsiTrend::Oversold => 20.0,
                RsiTrend::Neutral => 50.0,
            },
            rsi_trend,
            rsi_strength: 0.6,
            macd: MacdValues {
                line: 0.0,
                signal: 0.0,
                histogram: 0.0,
            },
            macd_signal,
            macd_crossover: Crossover::None,
            trend_strength: 0.5,
            sma: None,
            bollinger: None,
        }
    }

    fn forecast_at(combined: f64, confidence: f64) -> ForecastResult {
        let mut f = ForecastResult::naive(100.0, &AnalysisConfig::default(), "test");
        f.combined_prediction = combined;
        f.upper_bound = combined + 1.0;
        f.lower_bound = combined - 1.0;
        f.confidence = confidence;
        f
    }

    fn thresholds() -> SignalThresholds {
        SignalThresholds::default()
    }

    #[test]
    fn unanimous_bullish() {
        let s = fuse(
            &snapshot(RsiTrend::Overbought, MacdSignal::Bullish),
            &forecast_at(105.0, 80.0),
            100.0,
            &thresholds(),
        );
        assert_eq!(s.direction, Direction::Bullish);
        assert_eq!(s.confidence, 80.0);
        // 100 * (0.3*0.6 + 0.3*0.5 + 0.4*0.8) = 65
        assert!((s.strength - 65.0).abs() < 1e-9);
    }

    #[test]
    fn disagreement_lowers_confidence() {
        let agree = fuse(
            &snapshot(RsiTrend::Overbought, MacdSignal::Neutral),
            &forecast_at(105.0, 80.0),
            100.0,
            &thresholds(),
        );
        let disagree = fuse(
            &snapshot(RsiTrend::Oversold, MacdSignal::Neutral),
            &forecast_at(105.0, 80.0),
            100.0,
            &thresholds(),
        );
        assert!(disagree.confidence < agree.confidence);
        assert!((disagree.confidence - 56.0).abs() < 1e-9);

        let both = fuse(
            &snapshot(RsiTrend::Oversold, MacdSignal::Bearish),
            &forecast_at(105.0, 80.0),
            100.0,
            &thresholds(),
        );
        assert!((both.confidence - 80.0 * 0.49).abs() < 1e-9);
        assert_eq!(both.direction, Direction::Bearish);
    }

    #[test]
    fn neutral_forecast_is_never_opposed() {
        let s = fuse(
            &snapshot(RsiTrend::Oversold, MacdSignal::Bearish),
            &forecast_at(100.05, 60.0),
            100.0,
            &thresholds(),
        );
        assert_eq!(s.votes.forecast, Direction::Neutral);
        assert_eq!(s.confidence, 60.0);
    }

    #[test]
    fn three_way_split_is_neutral() {
        let s = fuse(
            &snapshot(RsiTrend::Overbought, MacdSignal::Bearish),
            &forecast_at(100.0, 50.0),
            100.0,
            &thresholds(),
        );
        assert_eq!(s.direction, Direction::Neutral);
    }

    #[test]
    fn contrarian_mode_inverts_rsi() {
        let t = SignalThresholds {
            rsi_vote: RsiVoteMode::Contrarian,
            ..thresholds()
        };
        let s = fuse(
            &snapshot(RsiTrend::Overbought, MacdSignal::Neutral),
            &forecast_at(100.0, 50.0),
            100.0,
            &t,
        );
        assert_eq!(s.votes.rsi, Direction::Bearish);
    }

    #[test]
    fn vote_weights_break_ties() {
        let mut t = thresholds();
        t.vote_weights.forecast = 2.0;
        let s = fuse(
            &snapshot(RsiTrend::Oversold, MacdSignal::Neutral),
            &forecast_at(105.0, 50.0),
            100.0,
            &t,
        );
        assert_eq!(s.direction, Direction::Bullish);
    }

    #[test]
    fn tally_ties_at_top_are_neutral() {
        assert_eq!(
            tally(&[(Direction::Bullish, 1.0), (Direction::Bearish, 1.0), (Direction::Neutral, 0.5)]),
            Direction::Neutral
        );
        assert_eq!(
            tally(&[(Direction::Bullish, 1.0), (Direction::Bullish, 1.0), (Direction::Bearish, 1.5)]),
            Direction::Bullish
        );
    }
}
