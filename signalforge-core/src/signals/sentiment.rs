//! Market sentiment score.
//!
//! Starts at 50 and adds one term per factor: last close change, RSI zone,
//! proximity to support/resistance, MACD signal and price vs SMA. The score
//! is clamped to 0..=100 and bucketed into a label. Every contributing term
//! is also reported as a short human-readable factor.

use serde::{Deserialize, Serialize};

use crate::domain::PriceSeries;
use crate::indicators::{IndicatorSnapshot, MacdSignal, PriceLevels, RsiTrend};

const BASE_SCORE: f64 = 50.0;
const PRICE_CHANGE_WEIGHT: f64 = 4.0;
const RSI_ZONE_POINTS: f64 = 15.0;
const RSI_SLOPE: f64 = 0.3;
const PROXIMITY_PCT: f64 = 0.03;
const PROXIMITY_POINTS: f64 = 10.0;
const MACD_POINTS: f64 = 5.0;
const SMA_POINTS: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
    ExtremelyBearish,
    Bearish,
    SlightlyBearish,
    Neutral,
    SlightlyBullish,
    Bullish,
    ExtremelyBullish,
}

impl SentimentLabel {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 80.0 => Self::ExtremelyBullish,
            s if s >= 65.0 => Self::Bullish,
            s if s >= 55.0 => Self::SlightlyBullish,
            s if s >= 45.0 => Self::Neutral,
            s if s >= 35.0 => Self::SlightlyBearish,
            s if s >= 20.0 => Self::Bearish,
            _ => Self::ExtremelyBearish,
        }
    }
}

/// Last volume relative to the recent average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeActivity {
    Explosion,
    High,
    Rising,
    Normal,
    Low,
}

impl VolumeActivity {
    /// Classify the last volume against the mean of the `window` volumes before it.
    pub fn classify(volumes: &[f64], window: usize) -> Self {
        let Some((&last, history)) = volumes.split_last() else {
            return Self::Normal;
        };
        let recent = &history[history.len().saturating_sub(window)..];
        if recent.is_empty() {
            return Self::Normal;
        }
        let mean = recent.iter().sum::<f64>() / recent.len() as f64;
        if mean <= 0.0 {
            return Self::Normal;
        }
        match (last / mean - 1.0) * 100.0 {
            c if c >= 100.0 => Self::Explosion,
            c if c >= 50.0 => Self::High,
            c if c >= 20.0 => Self::Rising,
            c if c <= -50.0 => Self::Low,
            _ => Self::Normal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSentiment {
    pub score: f64,
    pub label: SentimentLabel,
    pub factors: Vec<String>,
    pub volume_activity: VolumeActivity,
}

impl MarketSentiment {
    pub fn assess(
        series: &PriceSeries,
        snapshot: &IndicatorSnapshot,
        levels: &PriceLevels,
        volume_window: usize,
    ) -> Self {
        let current = series.current_price();
        let mut score = BASE_SCORE;
        let mut factors = Vec::new();

        let points = series.points();
        let change_pct = match points {
            [.., prev, last] => (last.close / prev.close - 1.0) * 100.0,
            _ => 0.0,
        };
        score += PRICE_CHANGE_WEIGHT * change_pct;
        factors.push(format!("Last period change {change_pct:+.2}%"));

        match snapshot.rsi_trend {
            RsiTrend::Overbought => {
                score += RSI_ZONE_POINTS;
                factors.push(format!("RSI overbought ({:.1})", snapshot.rsi_value));
            }
            RsiTrend::Oversold => {
                score -= RSI_ZONE_POINTS;
                factors.push(format!("RSI oversold ({:.1})", snapshot.rsi_value));
            }
            RsiTrend::Neutral => {
                score += RSI_SLOPE * (snapshot.rsi_value - 50.0);
                factors.push(format!("RSI neutral ({:.1})", snapshot.rsi_value));
            }
        }

        if (current - levels.support_1) / current < PROXIMITY_PCT {
            score -= PROXIMITY_POINTS;
            factors.push(format!("Price within 3% of support {:.2}", levels.support_1));
        } else if (levels.resistance_1 - current) / current < PROXIMITY_PCT {
            score += PROXIMITY_POINTS;
            factors.push(format!("Price within 3% of resistance {:.2}", levels.resistance_1));
        }

        match snapshot.macd_signal {
            MacdSignal::Bullish => {
                score += MACD_POINTS;
                factors.push("MACD bullish".to_string());
            }
            MacdSignal::Bearish => {
                score -= MACD_POINTS;
                factors.push("MACD bearish".to_string());
            }
            MacdSignal::Neutral => {}
        }

        if let Some(sma) = snapshot.sma {
            if current > sma {
                score += SMA_POINTS;
                factors.push(format!("Price above SMA ({sma:.2})"));
            } else if current < sma {
                score -= SMA_POINTS;
                factors.push(format!("Price below SMA ({sma:.2})"));
            }
        }

        let score = score.clamp(0.0, 100.0);
        Self {
            score,
            label: SentimentLabel::from_score(score),
            factors,
            volume_activity: VolumeActivity::classify(&series.volumes(), volume_window),
        }
    }
}
