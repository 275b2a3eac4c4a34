//! Trading levels and DCA plan derived from price levels, the fused signal
//! and the forecast band.

pub mod dca;
pub mod levels;
pub mod risk;

pub use dca::{DcaPlan, ExitStrategy, Tranche};
pub use levels::{Bias, TradingLevels};
pub use risk::RiskLevel;

use crate::config::AnalysisConfig;
use crate::forecast::ForecastResult;
use crate::indicators::PriceLevels;
use crate::signals::FusedSignal;

/// Compute both the trading levels and the DCA plan built on them.
pub fn synthesize(
    levels: &PriceLevels,
    signal: &FusedSignal,
    current: f64,
    forecast: &ForecastResult,
    config: &AnalysisConfig,
) -> (TradingLevels, DcaPlan) {
    let trading = TradingLevels::compute(levels, signal, current, forecast, config);
    let plan = DcaPlan::build(&trading, levels, signal, current, forecast, config);
    (trading, plan)
}
