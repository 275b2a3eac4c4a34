//! SignalForge Core — market-signal synthesis over a single price series.
//!
//! Stages, in pipeline order:
//! - Technical indicators (RSI, MACD, SMA, Bollinger) and support/resistance
//! - Forecast ensemble: random forest on lagged features plus a
//!   trend/seasonal model, with a naive fallback
//! - Signal fusion into direction, strength and confidence
//! - Strategy synthesis: entry/exit/stop levels and a risk-scored DCA plan
//!
//! [`pipeline::Analyzer`] runs all of them and returns an
//! [`pipeline::AnalysisReport`].

pub mod config;
pub mod domain;
pub mod error;
pub mod fingerprint;
pub mod forecast;
pub mod indicators;
pub mod pipeline;
pub mod rng;
pub mod signals;
pub mod strategy;

pub use config::AnalysisConfig;
pub use domain::{PricePoint, PriceSeries};
pub use error::{ConfigError, ValidationError};
pub use pipeline::{AnalysisReport, Analyzer};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: report types and the analyzer can cross threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::PricePoint>();
        require_sync::<domain::PricePoint>();
        require_send::<domain::PriceSeries>();
        require_sync::<domain::PriceSeries>();

        require_send::<config::AnalysisConfig>();
        require_sync::<config::AnalysisConfig>();
        require_send::<fingerprint::ModelKey>();
        require_sync::<fingerprint::ModelKey>();
        require_send::<rng::SeedHierarchy>();
        require_sync::<rng::SeedHierarchy>();

        require_send::<indicators::IndicatorSnapshot>();
        require_sync::<indicators::IndicatorSnapshot>();
        require_send::<indicators::PriceLevels>();
        require_sync::<indicators::PriceLevels>();

        require_send::<forecast::ForecastResult>();
        require_sync::<forecast::ForecastResult>();
        require_send::<forecast::FittedModels>();
        require_sync::<forecast::FittedModels>();
        require_send::<forecast::InMemoryModelCache>();
        require_sync::<forecast::InMemoryModelCache>();

        require_send::<signals::FusedSignal>();
        require_sync::<signals::FusedSignal>();
        require_send::<signals::MarketSentiment>();
        require_sync::<signals::MarketSentiment>();

        require_send::<strategy::TradingLevels>();
        require_sync::<strategy::TradingLevels>();
        require_send::<strategy::DcaPlan>();
        require_sync::<strategy::DcaPlan>();

        require_send::<pipeline::AnalysisReport>();
        require_sync::<pipeline::AnalysisReport>();
        require_send::<pipeline::Analyzer>();
        require_sync::<pipeline::Analyzer>();
    }

    /// Indicators are usable as trait objects behind `Send + Sync`.
    #[test]
    fn indicators_are_object_safe() {
        let boxed: Vec<Box<dyn indicators::Indicator>> = vec![
            Box::new(indicators::Rsi::new(14)),
            Box::new(indicators::Sma::new(20)),
            Box::new(indicators::Ema::new(12)),
        ];
        let names: Vec<&str> = boxed.iter().map(|i| i.name()).collect();
        assert_eq!(names, vec!["rsi_14", "sma_20", "ema_12"]);
    }
}
