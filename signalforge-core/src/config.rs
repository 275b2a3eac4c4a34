//! Serializable analysis configuration.
//!
//! Every tunable of the pipeline lives here. All structs use
//! `#[serde(default)]`, so a TOML file only needs the keys it overrides:
//!
//! ```toml
//! rsi_period = 10
//! safety_margin_pct = 0.05
//!
//! [ensemble_weights]
//! random_forest = 0.7
//! trend_seasonal = 0.3
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::forecast::trend::MIN_TREND_POINTS;

pub const DEFAULT_RSI_PERIOD: usize = 14;
pub const DEFAULT_MACD_FAST: usize = 12;
pub const DEFAULT_MACD_SLOW: usize = 26;
pub const DEFAULT_MACD_SIGNAL: usize = 9;
pub const DEFAULT_SAFETY_MARGIN_PCT: f64 = 0.03;
pub const DEFAULT_DCA_TRANCHES: usize = 3;

/// RSI above this is Overbought.
pub const RSI_OVERBOUGHT: f64 = 70.0;
/// RSI below this is Oversold.
pub const RSI_OVERSOLD: f64 = 30.0;

/// Confidence at or above which a moderate signal is Low risk.
pub const LOW_RISK_MIN_CONFIDENCE: f64 = 70.0;
/// Confidence below which the plan is always High risk.
pub const HIGH_RISK_MAX_CONFIDENCE: f64 = 40.0;
/// Strength band considered "moderate" for Low risk.
pub const MODERATE_STRENGTH_MIN: f64 = 20.0;
pub const MODERATE_STRENGTH_MAX: f64 = 70.0;
/// Strength above this is "extreme"; High risk when the forecast spread is also wide.
pub const EXTREME_STRENGTH: f64 = 80.0;
/// Relative forecast spread ((upper - lower) / combined) considered wide.
pub const HIGH_SPREAD_PCT: f64 = 0.10;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal_period: usize,
    /// Bars ahead the forecast targets.
    pub forecast_horizon: usize,
    pub ensemble_weights: EnsembleWeights,
    /// Stop-loss distance beyond the outer support/resistance, as a fraction.
    pub safety_margin_pct: f64,
    /// Number of DCA entry tranches (2..=4).
    pub dca_tranche_count: usize,
    /// Number of take-profit tranches (2..=3).
    pub take_profit_tranche_count: usize,
    pub indicators: IndicatorSettings,
    pub thresholds: SignalThresholds,
    pub forecast: ForecastSettings,
    pub risk: RiskThresholds,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            rsi_period: DEFAULT_RSI_PERIOD,
            macd_fast: DEFAULT_MACD_FAST,
            macd_slow: DEFAULT_MACD_SLOW,
            macd_signal_period: DEFAULT_MACD_SIGNAL,
            forecast_horizon: 1,
            ensemble_weights: EnsembleWeights::default(),
            safety_margin_pct: DEFAULT_SAFETY_MARGIN_PCT,
            dca_tranche_count: DEFAULT_DCA_TRANCHES,
            take_profit_tranche_count: 3,
            indicators: IndicatorSettings::default(),
            thresholds: SignalThresholds::default(),
            forecast: ForecastSettings::default(),
            risk: RiskThresholds::default(),
        }
    }
}

/// Relative weight of each forecaster in the combined prediction.
///
/// Normalized at use, so only the ratio matters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleWeights {
    pub random_forest: f64,
    pub trend_seasonal: f64,
}

impl Default for EnsembleWeights {
    fn default() -> Self {
        Self {
            random_forest: 0.5,
            trend_seasonal: 0.5,
        }
    }
}

impl EnsembleWeights {
    /// Weights scaled to sum to 1.
    pub fn normalized(&self) -> (f64, f64) {
        let total = self.random_forest + self.trend_seasonal;
        (self.random_forest / total, self.trend_seasonal / total)
    }
}

/// How support/resistance levels are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelMethod {
    /// Min/max close over a short and a long trailing window.
    RollingExtremes,
    /// 10/25/75/90th percentiles of all closes.
    Percentile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorSettings {
    pub sma_period: usize,
    pub bollinger_period: usize,
    pub bollinger_multiplier: f64,
    /// A MACD crossover older than this many bars is reported as None.
    pub crossover_lookback: usize,
    /// Window of the volatility baseline used for MACD trend strength.
    pub trend_lookback: usize,
    pub level_method: LevelMethod,
    pub level_window_short: usize,
    pub level_window_long: usize,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            sma_period: 20,
            bollinger_period: 20,
            bollinger_multiplier: 2.0,
            crossover_lookback: 10,
            trend_lookback: 26,
            level_method: LevelMethod::RollingExtremes,
            level_window_short: 10,
            level_window_long: 20,
        }
    }
}

/// How an RSI reading votes on direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiVoteMode {
    /// Overbought is bullish pressure, Oversold bearish.
    Momentum,
    /// Overbought votes Bearish (expect reversal), Oversold Bullish.
    Contrarian,
}

/// Weights of the three direction votes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoteWeights {
    pub rsi: f64,
    pub macd: f64,
    pub forecast: f64,
}

impl Default for VoteWeights {
    fn default() -> Self {
        Self {
            rsi: 1.0,
            macd: 1.0,
            forecast: 1.0,
        }
    }
}

/// Weights of the strength composite. Must sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrengthWeights {
    pub rsi: f64,
    pub macd: f64,
    pub forecast: f64,
}

impl Default for StrengthWeights {
    fn default() -> Self {
        Self {
            rsi: 0.3,
            macd: 0.3,
            forecast: 0.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalThresholds {
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    pub rsi_vote: RsiVoteMode,
    /// Forecast within this fraction of the current price votes Neutral.
    pub forecast_neutral_band_pct: f64,
    pub vote_weights: VoteWeights,
    pub strength_weights: StrengthWeights,
    /// Confidence multiplier per indicator that opposes the forecast.
    pub disagreement_penalty: f64,
    /// Fraction of the support-to-price distance a maximal signal may close.
    pub max_entry_urgency: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            rsi_overbought: RSI_OVERBOUGHT,
            rsi_oversold: RSI_OVERSOLD,
            rsi_vote: RsiVoteMode::Momentum,
            forecast_neutral_band_pct: 0.001,
            vote_weights: VoteWeights::default(),
            strength_weights: StrengthWeights::default(),
            disagreement_penalty: 0.7,
            max_entry_urgency: 0.9,
        }
    }
}

/// Random forest hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestSettings {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Master seed; per-tree seeds are derived from it.
    pub seed: u64,
}

impl Default for ForestSettings {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 8,
            min_samples_split: 5,
            min_samples_leaf: 2,
            seed: 42,
        }
    }
}

/// Weights of the forecast confidence components. Must sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceWeights {
    pub agreement: f64,
    pub spread: f64,
    pub error: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            agreement: 0.4,
            spread: 0.3,
            error: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    pub forest: ForestSettings,
    /// Rolling window for the engineered features.
    pub feature_window: usize,
    /// Fewer usable training rows than this is a fit failure.
    pub min_training_rows: usize,
    /// Trailing closes used to fit the linear trend.
    pub trend_window: usize,
    pub seasonal_period: usize,
    /// Minimum width of the forecast band as a fraction of the prediction.
    pub min_band_pct: f64,
    /// Confidence reported by the naive fallback forecast.
    pub naive_confidence_cap: f64,
    pub confidence_weights: ConfidenceWeights,
    /// Scales relative disagreement/spread/error into confidence loss.
    pub confidence_sensitivity: f64,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            forest: ForestSettings::default(),
            feature_window: 14,
            min_training_rows: 10,
            trend_window: 90,
            seasonal_period: 7,
            min_band_pct: 0.01,
            naive_confidence_cap: 30.0,
            confidence_weights: ConfidenceWeights::default(),
            confidence_sensitivity: 10.0,
        }
    }
}

/// Cutoffs for the DCA risk label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub low_confidence_min: f64,
    pub high_confidence_max: f64,
    pub moderate_strength_min: f64,
    pub moderate_strength_max: f64,
    pub extreme_strength: f64,
    pub high_spread_pct: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            low_confidence_min: LOW_RISK_MIN_CONFIDENCE,
            high_confidence_max: HIGH_RISK_MAX_CONFIDENCE,
            moderate_strength_min: MODERATE_STRENGTH_MIN,
            moderate_strength_max: MODERATE_STRENGTH_MAX,
            extreme_strength: EXTREME_STRENGTH,
            high_spread_pct: HIGH_SPREAD_PCT,
        }
    }
}

impl AnalysisConfig {
    /// Load and validate a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check every field against its documented domain.
    pub fn validate(&self) -> Result<(), ConfigError> {
        at_least("rsi_period", self.rsi_period, 1)?;
        at_least("macd_fast", self.macd_fast, 1)?;
        at_least("macd_signal_period", self.macd_signal_period, 1)?;
        if self.macd_fast >= self.macd_slow {
            return Err(ConfigError::MacdPeriods {
                fast: self.macd_fast,
                slow: self.macd_slow,
            });
        }
        at_least("forecast_horizon", self.forecast_horizon, 1)?;
        non_negative_weights(
            "ensemble_weights",
            &[
                self.ensemble_weights.random_forest,
                self.ensemble_weights.trend_seasonal,
            ],
        )?;
        in_range("safety_margin_pct", self.safety_margin_pct, 0.0, 0.5)?;
        in_range("dca_tranche_count", self.dca_tranche_count as f64, 2.0, 4.0)?;
        in_range(
            "take_profit_tranche_count",
            self.take_profit_tranche_count as f64,
            2.0,
            3.0,
        )?;

        let ind = &self.indicators;
        at_least("indicators.sma_period", ind.sma_period, 1)?;
        at_least("indicators.bollinger_period", ind.bollinger_period, 1)?;
        in_range(
            "indicators.bollinger_multiplier",
            ind.bollinger_multiplier,
            0.0,
            10.0,
        )?;
        at_least("indicators.trend_lookback", ind.trend_lookback, 2)?;
        at_least("indicators.level_window_short", ind.level_window_short, 1)?;
        at_least(
            "indicators.level_window_long",
            ind.level_window_long,
            ind.level_window_short,
        )?;

        let th = &self.thresholds;
        in_range("thresholds.rsi_oversold", th.rsi_oversold, 0.0, 100.0)?;
        in_range("thresholds.rsi_overbought", th.rsi_overbought, 0.0, 100.0)?;
        ordered("thresholds.rsi", th.rsi_oversold, th.rsi_overbought)?;
        in_range(
            "thresholds.forecast_neutral_band_pct",
            th.forecast_neutral_band_pct,
            0.0,
            0.5,
        )?;
        non_negative_weights(
            "thresholds.vote_weights",
            &[th.vote_weights.rsi, th.vote_weights.macd, th.vote_weights.forecast],
        )?;
        unit_sum(
            "thresholds.strength_weights",
            &[
                th.strength_weights.rsi,
                th.strength_weights.macd,
                th.strength_weights.forecast,
            ],
        )?;
        in_range(
            "thresholds.disagreement_penalty",
            th.disagreement_penalty,
            0.0,
            1.0,
        )?;
        in_range("thresholds.max_entry_urgency", th.max_entry_urgency, 0.0, 1.0)?;

        let fc = &self.forecast;
        at_least("forecast.forest.n_trees", fc.forest.n_trees, 1)?;
        at_least("forecast.forest.max_depth", fc.forest.max_depth, 1)?;
        at_least("forecast.forest.min_samples_split", fc.forest.min_samples_split, 2)?;
        at_least("forecast.forest.min_samples_leaf", fc.forest.min_samples_leaf, 1)?;
        at_least("forecast.feature_window", fc.feature_window, 2)?;
        at_least("forecast.min_training_rows", fc.min_training_rows, 2)?;
        at_least("forecast.trend_window", fc.trend_window, MIN_TREND_POINTS)?;
        at_least("forecast.seasonal_period", fc.seasonal_period, 1)?;
        if fc.min_band_pct <= 0.0 {
            return Err(ConfigError::OutOfRange {
                name: "forecast.min_band_pct",
                min: f64::MIN_POSITIVE,
                max: 0.5,
                value: fc.min_band_pct,
            });
        }
        in_range("forecast.min_band_pct", fc.min_band_pct, 0.0, 0.5)?;
        in_range(
            "forecast.naive_confidence_cap",
            fc.naive_confidence_cap,
            0.0,
            100.0,
        )?;
        unit_sum(
            "forecast.confidence_weights",
            &[
                fc.confidence_weights.agreement,
                fc.confidence_weights.spread,
                fc.confidence_weights.error,
            ],
        )?;
        in_range(
            "forecast.confidence_sensitivity",
            fc.confidence_sensitivity,
            0.0,
            1000.0,
        )?;

        let risk = &self.risk;
        in_range("risk.low_confidence_min", risk.low_confidence_min, 0.0, 100.0)?;
        in_range("risk.high_confidence_max", risk.high_confidence_max, 0.0, 100.0)?;
        ordered(
            "risk.confidence",
            risk.high_confidence_max,
            risk.low_confidence_min,
        )?;
        ordered(
            "risk.moderate_strength",
            risk.moderate_strength_min,
            risk.moderate_strength_max,
        )?;
        in_range("risk.extreme_strength", risk.extreme_strength, 0.0, 100.0)?;
        in_range("risk.high_spread_pct", risk.high_spread_pct, 0.0, 10.0)?;

        Ok(())
    }
}

fn at_least(name: &'static str, value: usize, min: usize) -> Result<(), ConfigError> {
    if value < min {
        return Err(ConfigError::TooSmall { name, min, value });
    }
    Ok(())
}

fn in_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if !(min..=max).contains(&value) {
        return Err(ConfigError::OutOfRange {
            name,
            min,
            max,
            value,
        });
    }
    Ok(())
}

fn ordered(name: &'static str, lower: f64, upper: f64) -> Result<(), ConfigError> {
    if lower > upper {
        return Err(ConfigError::ThresholdOrder { name, lower, upper });
    }
    Ok(())
}

fn non_negative_weights(name: &'static str, weights: &[f64]) -> Result<(), ConfigError> {
    let total: f64 = weights.iter().sum();
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) || total <= 0.0 {
        return Err(ConfigError::WeightsDegenerate { name });
    }
    Ok(())
}

fn unit_sum(name: &'static str, weights: &[f64]) -> Result<(), ConfigError> {
    non_negative_weights(name, weights)?;
    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(ConfigError::WeightsSum { name, sum });
    }
    Ok(())
}
