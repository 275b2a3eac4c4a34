//! Risk label for a DCA plan.

use serde::{Deserialize, Serialize};

use crate::config::RiskThresholds;

/// Trailing stops never exceed this percentage.
pub const MAX_TRAILING_STOP_PCT: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// - High: confidence below `high_confidence_max`, or an extreme signal
    ///   with a wide forecast band.
    /// - Low: confident forecast and a moderate signal.
    /// - Medium: everything else.
    ///
    /// `spread_pct` is the forecast band width relative to the prediction.
    pub fn assess(confidence: f64, strength: f64, spread_pct: f64, t: &RiskThresholds) -> Self {
        if confidence < t.high_confidence_max
            || (strength > t.extreme_strength && spread_pct > t.high_spread_pct)
        {
            RiskLevel::High
        } else if confidence >= t.low_confidence_min
            && (t.moderate_strength_min..=t.moderate_strength_max).contains(&strength)
        {
            RiskLevel::Low
        } else {
            RiskLevel::Medium
        }
    }

    pub fn explanation(self) -> &'static str {
        match self {
            RiskLevel::High => "Strong market momentum detected. Consider smaller position sizes.",
            RiskLevel::Medium => "Moderate market conditions. Standard position sizing recommended.",
            RiskLevel::Low => "Stable market conditions. Optimal for DCA strategy.",
        }
    }

    pub fn schedule(self) -> &'static str {
        match self {
            RiskLevel::High => "Weekly small purchases spread across 6-8 weeks",
            RiskLevel::Medium => "Bi-weekly purchases spread across 4-6 weeks",
            RiskLevel::Low => "Monthly purchases spread across 3-4 months",
        }
    }

    /// Trailing stop before the forecast spread adjustment.
    pub fn base_trailing_stop_pct(self) -> f64 {
        match self {
            RiskLevel::Low => 5.0,
            RiskLevel::Medium => 8.0,
            RiskLevel::High => 12.0,
        }
    }

    /// Base stop plus half the forecast spread, in percent, capped.
    pub fn trailing_stop_pct(self, spread_pct: f64) -> f64 {
        (self.base_trailing_stop_pct() + spread_pct.max(0.0) * 100.0 / 2.0)
            .min(MAX_TRAILING_STOP_PCT)
    }
}
