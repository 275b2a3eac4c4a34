//! Combination of the two forecasters and the naive fallback.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::cache::ModelCache;
use super::features::FeatureSet;
use super::forest::{ForestPrediction, RandomForest};
use super::trend::{TrendFit, TrendSeasonalModel};
use super::FitError;
use crate::config::{AnalysisConfig, ForecastSettings};
use crate::domain::PriceSeries;
use crate::fingerprint::ModelKey;

/// Closes whose range is below this fraction of the last close count as constant.
const CONSTANT_RANGE_REL: f64 = 1e-12;

/// Everything trained for one (series, config) pair. This is what the model
/// cache stores.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedModels {
    pub forest: RandomForest,
    pub forest_prediction: ForestPrediction,
    pub trend: TrendFit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForecastSource {
    Ensemble,
    Naive { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastStep {
    pub step: usize,
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub rf_prediction: f64,
    pub prophet_prediction: f64,
    pub combined_prediction: f64,
    pub upper_bound: f64,
    pub lower_bound: f64,
    /// 0..=100
    pub confidence: f64,
    pub horizon: usize,
    pub source: ForecastSource,
    pub path: Vec<ForecastStep>,
}

/// Train both models on the closes of a series.
pub fn fit_models(closes: &[f64], config: &AnalysisConfig) -> Result<FittedModels, FitError> {
    let fc = &config.forecast;
    let Some(&last) = closes.last() else {
        return Err(FitError::TooFewPoints { points: 0, min: 1 });
    };
    let (lo, hi) = closes
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &c| (lo.min(c), hi.max(c)));
    if hi - lo <= last.abs() * CONSTANT_RANGE_REL {
        return Err(FitError::ConstantSeries);
    }

    let features = FeatureSet::build(
        closes,
        config.forecast_horizon,
        fc.feature_window,
        config.macd_fast,
        config.macd_slow,
    );
    let forest = RandomForest::fit(&features, &fc.forest, fc.min_training_rows)?;
    let latest = features.latest.ok_or(FitError::InsufficientRows {
        rows: features.len(),
        min: fc.min_training_rows,
    })?;
    let forest_prediction = forest.predict(&latest);
    if ![forest_prediction.mean, forest_prediction.low, forest_prediction.high]
        .iter()
        .all(|v| v.is_finite())
    {
        return Err(FitError::NonFinite {
            model: "random_forest",
        });
    }

    let trend = TrendSeasonalModel::fit(closes, fc)?;

    Ok(FittedModels {
        forest,
        forest_prediction,
        trend,
    })
}

/// Forecast the series, training through `cache`. Never fails: any training
/// problem yields the naive forecast.
pub fn forecast(
    series: &PriceSeries,
    config: &AnalysisConfig,
    key: &ModelKey,
    cache: &dyn ModelCache,
) -> ForecastResult {
    let current = series.current_price();
    let closes = series.closes();
    let fit = cache.get_or_fit(key, &|| fit_models(&closes, config).map(Arc::new));

    match fit.and_then(|models| ForecastResult::from_models(&models, current, config)) {
        Ok(result) => {
            debug!(
                %key,
                combined = result.combined_prediction,
                lower = result.lower_bound,
                upper = result.upper_bound,
                confidence = result.confidence,
                "ensemble forecast"
            );
            result
        }
        Err(err) => {
            warn!(%key, error = %err, "model fit failed, falling back to naive forecast");
            ForecastResult::naive(current, config, err.to_string())
        }
    }
}

impl ForecastResult {
    pub fn from_models(
        models: &FittedModels,
        current: f64,
        config: &AnalysisConfig,
    ) -> Result<Self, FitError> {
        let fc = &config.forecast;
        let horizon = config.forecast_horizon;

        let fp = &models.forest_prediction;
        let rf = current * (1.0 + fp.mean);
        let (rf_lower, rf_upper) = (current * (1.0 + fp.low), current * (1.0 + fp.high));
        let (prophet, prophet_lower, prophet_upper) = models.trend.predict(horizon);

        for (model, value) in [("random_forest", rf), ("trend_seasonal", prophet)] {
            if !value.is_finite() {
                return Err(FitError::NonFinite { model });
            }
            if value <= 0.0 {
                return Err(FitError::NonPositive { model, value });
            }
        }

        let (w_rf, w_trend) = config.ensemble_weights.normalized();
        let combined = w_rf * rf + w_trend * prophet;
        let (lower, upper) = widen(
            combined,
            rf_lower.min(prophet_lower),
            rf_upper.max(prophet_upper),
            fc.min_band_pct,
        );

        let mean_error = (models.forest.oob_mae() + models.trend.relative_error()) / 2.0;
        let confidence = confidence(rf, prophet, combined, lower, upper, current, mean_error, fc);

        let mut path = Vec::with_capacity(horizon);
        for step in 1..=horizon {
            let (value, lo, hi) = models.trend.predict(step);
            if !value.is_finite() || value <= 0.0 {
                return Err(FitError::NonPositive {
                    model: "trend_seasonal",
                    value,
                });
            }
            let (lower, upper) = widen(value, lo, hi, fc.min_band_pct);
            path.push(ForecastStep {
                step,
                value,
                lower,
                upper,
            });
        }

        let result = Self {
            rf_prediction: rf,
            prophet_prediction: prophet,
            combined_prediction: combined,
            upper_bound: upper,
            lower_bound: lower,
            confidence,
            horizon,
            source: ForecastSource::Ensemble,
            path,
        };
        if !result.is_finite() {
            return Err(FitError::NonFinite { model: "ensemble" });
        }
        Ok(result)
    }

    /// Flat forecast at the current price.
    pub fn naive(current: f64, config: &AnalysisConfig, reason: impl Into<String>) -> Self {
        let half = current * config.forecast.min_band_pct / 2.0;
        let horizon = config.forecast_horizon;
        Self {
            rf_prediction: current,
            prophet_prediction: current,
            combined_prediction: current,
            upper_bound: current + half,
            lower_bound: current - half,
            confidence: config.forecast.naive_confidence_cap,
            horizon,
            source: ForecastSource::Naive {
                reason: reason.into(),
            },
            path: (1..=horizon)
                .map(|step| ForecastStep {
                    step,
                    value: current,
                    lower: current - half,
                    upper: current + half,
                })
                .collect(),
        }
    }

    pub fn is_naive(&self) -> bool {
        matches!(self.source, ForecastSource::Naive { .. })
    }

    /// Band width relative to the combined prediction.
    pub fn spread_pct(&self) -> f64 {
        (self.upper_bound - self.lower_bound) / self.combined_prediction
    }

    fn is_finite(&self) -> bool {
        let headline = [
            self.rf_prediction,
            self.prophet_prediction,
            self.combined_prediction,
            self.upper_bound,
            self.lower_bound,
            self.confidence,
        ];
        headline.iter().all(|v| v.is_finite())
            && self
                .path
                .iter()
                .all(|s| s.value.is_finite() && s.lower.is_finite() && s.upper.is_finite())
    }
}

/// Extend `[lower, upper]` so it contains `center ± center * min_band_pct / 2`.
fn widen(center: f64, lower: f64, upper: f64, min_band_pct: f64) -> (f64, f64) {
    let half = center.abs() * min_band_pct / 2.0;
    (lower.min(center - half), upper.max(center + half))
}

#[allow(clippy::too_many_arguments)]
fn confidence(
    rf: f64,
    prophet: f64,
    combined: f64,
    lower: f64,
    upper: f64,
    current: f64,
    mean_error: f64,
    fc: &ForecastSettings,
) -> f64 {
    let s = fc.confidence_sensitivity;
    let score = |loss: f64| (100.0 * (1.0 - loss)).clamp(0.0, 100.0);
    let agreement = score(s * (rf - prophet).abs() / current);
    let spread = score(s / 2.0 * (upper - lower) / combined);
    let error = score(s * mean_error);
    let w = &fc.confidence_weights;
    (w.agreement * agreement + w.spread * spread + w.error * error).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::SeriesFingerprint;
    use crate::forecast::cache::{InMemoryModelCache, NoopModelCache};
    use chrono::{Duration, TimeZone, Utc};

    fn series(closes: &[f64]) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        PriceSeries::from_closes(start, Duration::days(1), closes).unwrap()
    }

    fn ramp(n: usize, from: f64, to: f64) -> Vec<f64> {
        (0..n)
            .map(|i| from + (to - from) * i as f64 / (n - 1) as f64)
            .collect()
    }

    fn fast_config() -> AnalysisConfig {
        let mut config = AnalysisConfig::default();
        config.forecast.forest.n_trees = 20;
        config
    }

    fn run(closes: &[f64], config: &AnalysisConfig) -> ForecastResult {
        let s = series(closes);
        let key = ModelKey::new("TEST", SeriesFingerprint::compute(&s, config));
        forecast(&s, config, &key, &NoopModelCache)
    }

    #[test]
    fn naive_forecast_is_flat_with_minimum_band() {
        let config = AnalysisConfig {
            forecast_horizon: 3,
            ..AnalysisConfig::default()
        };
        let f = ForecastResult::naive(200.0, &config, "test");
        assert_eq!(f.combined_prediction, 200.0);
        assert_eq!(f.lower_bound, 199.0);
        assert_eq!(f.upper_bound, 201.0);
        assert_eq!(f.confidence, 30.0);
        assert_eq!(f.path.len(), 3);
        assert!(f.is_naive());
    }

    #[test]
    fn constant_series_is_a_fit_failure() {
        let err = fit_models(&[100.0; 40], &fast_config()).unwrap_err();
        assert_eq!(err, FitError::ConstantSeries);
        let f = run(&[100.0; 40], &fast_config());
        assert!(f.is_naive());
        assert_eq!(f.combined_prediction, 100.0);
    }

    #[test]
    fn short_series_is_a_fit_failure() {
        let err = fit_models(&ramp(15, 100.0, 110.0), &fast_config()).unwrap_err();
        assert!(matches!(err, FitError::InsufficientRows { .. }));
    }

    #[test]
    fn rising_series_forecasts_higher() {
        let f = run(&ramp(90, 100.0, 200.0), &fast_config());
        assert_eq!(f.source, ForecastSource::Ensemble);
        assert!(f.rf_prediction > 200.0);
        assert!(f.prophet_prediction > 200.0);
        assert!(f.lower_bound < f.combined_prediction && f.combined_prediction < f.upper_bound);
        assert!((0.0..=100.0).contains(&f.confidence));
        assert!(f.confidence > 30.0);
        assert_eq!(f.path.len(), 1);
        assert_eq!(f.path[0].value, f.prophet_prediction);
    }

    #[test]
    fn multi_step_path_follows_the_trend() {
        let config = AnalysisConfig {
            forecast_horizon: 5,
            ..fast_config()
        };
        let f = run(&ramp(90, 100.0, 200.0), &config);
        assert_eq!(f.horizon, 5);
        let steps: Vec<usize> = f.path.iter().map(|s| s.step).collect();
        assert_eq!(steps, vec![1, 2, 3, 4, 5]);
        assert!(f.path.windows(2).all(|w| w[1].value > w[0].value));
        assert!(f.path.iter().all(|s| s.lower < s.value && s.value < s.upper));
    }

    #[test]
    fn steep_collapse_predicting_negative_prices_falls_back() {
        // The trend line crosses zero within the horizon.
        let config = AnalysisConfig {
            forecast_horizon: 30,
            ..fast_config()
        };
        let f = run(&ramp(60, 300.0, 5.0), &config);
        assert!(f.is_naive());
    }

    #[test]
    fn cached_models_give_identical_forecasts() {
        let config = fast_config();
        let s = series(&ramp(60, 50.0, 80.0));
        let key = ModelKey::new("TEST", SeriesFingerprint::compute(&s, &config));
        let cache = InMemoryModelCache::new();
        let a = forecast(&s, &config, &key, &cache);
        let b = forecast(&s, &config, &key, &cache);
        assert_eq!(a, b);
        assert_eq!(cache.trainings(), 1);
    }

    #[test]
    fn widen_enforces_minimum_half_width() {
        let (lo, hi) = widen(100.0, 100.0, 100.0, 0.01);
        assert_eq!((lo, hi), (99.5, 100.5));
        let (lo, hi) = widen(100.0, 90.0, 120.0, 0.01);
        assert_eq!((lo, hi), (90.0, 120.0));
    }

    #[test]
    fn confidence_drops_when_models_disagree() {
        let fc = ForecastSettings::default();
        let close = confidence(101.0, 101.0, 101.0, 100.0, 102.0, 100.0, 0.001, &fc);
        let apart = confidence(101.0, 95.0, 98.0, 94.0, 102.0, 100.0, 0.001, &fc);
        assert!(apart < close);
        assert!((0.0..=100.0).contains(&apart));
    }
}
