//! Forecast ensemble: a random forest over engineered return features and a
//! linear trend + seasonal model, combined into one prediction with bounds
//! and a confidence score.
//!
//! Training failures never escape this module. They are logged and replaced
//! by the naive forecast (see [`ensemble`]).

pub mod cache;
pub mod ensemble;
pub mod features;
pub mod forest;
pub mod trend;
pub mod tree;

pub use cache::{InMemoryModelCache, ModelCache, ModelFit, NoopModelCache};
pub use ensemble::{fit_models, forecast, FittedModels, ForecastResult, ForecastSource, ForecastStep};
pub use features::{FeatureSet, FEATURE_NAMES};
pub use forest::{ForestPrediction, RandomForest};
pub use trend::{TrendFit, TrendSeasonalModel};
pub use tree::{RegressionTree, TreeParams};

use thiserror::Error;

/// A model could not be trained or produced an unusable prediction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("{rows} usable training rows, need at least {min}")]
    InsufficientRows { rows: usize, min: usize },

    #[error("{points} points for the trend model, need at least {min}")]
    TooFewPoints { points: usize, min: usize },

    #[error("close series is constant")]
    ConstantSeries,

    #[error("{model} produced a non-finite value")]
    NonFinite { model: &'static str },

    #[error("{model} predicted a non-positive price: {value}")]
    NonPositive { model: &'static str, value: f64 },
}
