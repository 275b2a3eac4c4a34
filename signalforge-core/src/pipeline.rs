//! End-to-end analysis: indicators, levels, forecast, fusion, strategy.
//!
//! An [`Analyzer`] holds a validated configuration and a model cache. Each
//! call to [`Analyzer::analyze`] is independent; batches fan out over rayon
//! and come back in input order.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

use crate::config::AnalysisConfig;
use crate::domain::PriceSeries;
use crate::error::ValidationError;
use crate::fingerprint::{ModelKey, SeriesFingerprint};
use crate::forecast::{self, ForecastResult, ModelCache, NoopModelCache};
use crate::indicators::{IndicatorSnapshot, PriceLevels};
use crate::signals::{fuse, FusedSignal, MarketSentiment};
use crate::strategy::{self, DcaPlan, TradingLevels};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub symbol: String,
    pub points: usize,
    pub first_timestamp: DateTime<Utc>,
    pub last_timestamp: DateTime<Utc>,
    pub current_price: f64,
    pub fingerprint: SeriesFingerprint,
    pub indicators: IndicatorSnapshot,
    pub levels: PriceLevels,
    pub forecast: ForecastResult,
    pub signal: FusedSignal,
    pub trading_levels: TradingLevels,
    pub dca_plan: DcaPlan,
    pub sentiment: MarketSentiment,
}

pub struct Analyzer {
    config: AnalysisConfig,
    cache: Arc<dyn ModelCache>,
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Analyzer {
    /// Validates `config`. Models are refit on every call until a cache is
    /// attached with [`Analyzer::with_cache`].
    pub fn new(config: AnalysisConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self {
            config,
            cache: Arc::new(NoopModelCache),
        })
    }

    pub fn with_cache(mut self, cache: Arc<dyn ModelCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn analyze(
        &self,
        symbol: &str,
        series: &PriceSeries,
    ) -> Result<AnalysisReport, ValidationError> {
        if series.is_empty() {
            return Err(ValidationError::EmptySeries);
        }
        let span = info_span!("analyze", symbol, points = series.len());
        let _guard = span.enter();

        let config = &self.config;
        let current = series.current_price();
        let closes = series.closes();

        let indicators = IndicatorSnapshot::compute(series, config);
        let levels = PriceLevels::compute(&closes, current, &config.indicators);

        let fingerprint = SeriesFingerprint::compute(series, config);
        let key = ModelKey::new(symbol, fingerprint.clone());
        let forecast = forecast::forecast(series, config, &key, self.cache.as_ref());

        let signal = fuse(&indicators, &forecast, current, &config.thresholds);
        let (trading_levels, dca_plan) =
            strategy::synthesize(&levels, &signal, current, &forecast, config);
        let sentiment =
            MarketSentiment::assess(series, &indicators, &levels, config.indicators.sma_period);

        debug!(?trading_levels, risk = ?dca_plan.risk_level, "strategy synthesized");
        info!(
            direction = ?signal.direction,
            strength = signal.strength,
            confidence = signal.confidence,
            naive = forecast.is_naive(),
            "analysis complete"
        );

        Ok(AnalysisReport {
            symbol: symbol.to_string(),
            points: series.len(),
            first_timestamp: series.first().timestamp,
            last_timestamp: series.last().timestamp,
            current_price: current,
            fingerprint,
            indicators,
            levels,
            forecast,
            signal,
            trading_levels,
            dca_plan,
            sentiment,
        })
    }

    /// Analyze every `(symbol, series)` pair in parallel. Output order matches input.
    pub fn analyze_batch(
        &self,
        requests: &[(String, PriceSeries)],
    ) -> Vec<Result<AnalysisReport, ValidationError>> {
        requests
            .par_iter()
            .map(|(symbol, series)| self.analyze(symbol, series))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::forecast::InMemoryModelCache;
    use chrono::{Duration, TimeZone};

    fn series(closes: &[f64]) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        PriceSeries::from_closes(start, Duration::days(1), closes).unwrap()
    }

    fn wave(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + 0.3 * i as f64 + 4.0 * (i as f64 * 0.4).sin())
            .collect()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = AnalysisConfig {
            macd_fast: 30,
            ..AnalysisConfig::default()
        };
        let err = Analyzer::new(config).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Config(ConfigError::MacdPeriods { .. })
        ));
    }

    #[test]
    fn report_carries_series_metadata() {
        let s = series(&wave(60));
        let report = Analyzer::new(AnalysisConfig::default())
            .unwrap()
            .analyze("BTC", &s)
            .unwrap();
        assert_eq!(report.symbol, "BTC");
        assert_eq!(report.points, 60);
        assert_eq!(report.first_timestamp, s.first().timestamp);
        assert_eq!(report.last_timestamp, s.last().timestamp);
        assert_eq!(report.current_price, s.current_price());
        assert!(report.levels.is_ordered(report.current_price));
    }

    #[test]
    fn batch_preserves_order() {
        let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();
        let requests: Vec<(String, PriceSeries)> = (0..6)
            .map(|i| (format!("SYM{i}"), series(&wave(40 + i * 5))))
            .collect();
        let reports = analyzer.analyze_batch(&requests);
        assert_eq!(reports.len(), 6);
        for (i, report) in reports.iter().enumerate() {
            let report = report.as_ref().unwrap();
            assert_eq!(report.symbol, format!("SYM{i}"));
            assert_eq!(report.points, 40 + i * 5);
        }
    }

    #[test]
    fn cached_analyzer_matches_uncached() {
        let s = series(&wave(80));
        let plain = Analyzer::new(AnalysisConfig::default()).unwrap();
        let cache = Arc::new(InMemoryModelCache::new());
        let cached = Analyzer::new(AnalysisConfig::default())
            .unwrap()
            .with_cache(cache.clone());

        let a = plain.analyze("ETH", &s).unwrap();
        let b = cached.analyze("ETH", &s).unwrap();
        let c = cached.analyze("ETH", &s).unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(cache.trainings(), 1);
    }
}
