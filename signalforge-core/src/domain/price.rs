//! PricePoint and PriceSeries — the validated market data input.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// OHLCV observation for a single period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PricePoint {
    /// A flat bar where open, high, low and close are all `close`.
    pub fn flat(timestamp: DateTime<Utc>, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume,
        }
    }

    /// Check a single point in isolation. `index` is used for error reporting.
    fn check(&self, index: usize) -> Result<(), ValidationError> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(ValidationError::NonFinite { index, field });
            }
        }
        for &(field, value) in &fields[..4] {
            if value <= 0.0 {
                return Err(ValidationError::NonPositivePrice {
                    index,
                    field,
                    value,
                });
            }
        }
        if self.volume < 0.0 {
            return Err(ValidationError::NegativeVolume {
                index,
                value: self.volume,
            });
        }
        if self.high < self.low
            || self.close > self.high
            || self.close < self.low
            || self.open > self.high
            || self.open < self.low
        {
            return Err(ValidationError::InconsistentRange { index });
        }
        Ok(())
    }
}

/// Chronologically ascending, validated price history.
///
/// The only way to obtain a `PriceSeries` is through validation, so every
/// downstream stage can rely on: at least one point, strictly increasing
/// timestamps, finite positive prices, non-negative volume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(points: Vec<PricePoint>) -> Result<Self, ValidationError> {
        if points.is_empty() {
            return Err(ValidationError::EmptySeries);
        }
        for (i, point) in points.iter().enumerate() {
            point.check(i)?;
            if i > 0 && point.timestamp <= points[i - 1].timestamp {
                return Err(ValidationError::NonMonotonicTimestamp {
                    index: i,
                    previous: points[i - 1].timestamp,
                    current: point.timestamp,
                });
            }
        }
        Ok(Self { points })
    }

    /// Build a series of flat bars from closes, spaced `interval` apart.
    pub fn from_closes(
        start: DateTime<Utc>,
        interval: Duration,
        closes: &[f64],
    ) -> Result<Self, ValidationError> {
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint::flat(start + interval * i as i32, close, 0.0))
            .collect();
        Self::new(points)
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; kept for API symmetry with slices.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.volume).collect()
    }

    pub fn last(&self) -> &PricePoint {
        // Non-empty by construction.
        &self.points[self.points.len() - 1]
    }

    pub fn first(&self) -> &PricePoint {
        &self.points[0]
    }

    /// Most recent close.
    pub fn current_price(&self) -> f64 {
        self.last().close
    }
}

impl<'de> Deserialize<'de> for PriceSeries {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            points: Vec<PricePoint>,
        }
        let raw = Raw::deserialize(deserializer)?;
        PriceSeries::new(raw.points).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(day)
    }

    fn sample_point(day: i64) -> PricePoint {
        PricePoint {
            timestamp: ts(day),
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            volume: 50_000.0,
        }
    }

    #[test]
    fn accepts_valid_series() {
        let series = PriceSeries::new(vec![sample_point(0), sample_point(1)]).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.current_price(), 103.0);
    }

    #[test]
    fn rejects_empty_series() {
        assert!(matches!(
            PriceSeries::new(vec![]),
            Err(ValidationError::EmptySeries)
        ));
    }

    #[test]
    fn rejects_duplicate_timestamps() {
        let err = PriceSeries::new(vec![sample_point(0), sample_point(0)]).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::NonMonotonicTimestamp { index: 1, .. }
        ));
    }

    #[test]
    fn rejects_descending_timestamps() {
        let err = PriceSeries::new(vec![sample_point(2), sample_point(1)]).unwrap_err();
        assert!(matches!(err, ValidationError::NonMonotonicTimestamp { .. }));
    }

    #[test]
    fn rejects_non_positive_prices() {
        let mut p = sample_point(0);
        p.low = 0.0;
        p.open = 0.0;
        let err = PriceSeries::new(vec![p]).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::NonPositivePrice { index: 0, .. }
        ));

        let err = PriceSeries::from_closes(ts(0), Duration::days(1), &[100.0, -1.0]).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::NonPositivePrice { index: 1, .. }
        ));
    }

    #[test]
    fn rejects_nan() {
        let mut p = sample_point(0);
        p.close = f64::NAN;
        let err = PriceSeries::new(vec![p]).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::NonFinite { field: "close", .. }
        ));
    }

    #[test]
    fn rejects_inverted_range() {
        let mut p = sample_point(0);
        p.high = 97.0;
        let err = PriceSeries::new(vec![p]).unwrap_err();
        assert!(matches!(err, ValidationError::InconsistentRange { index: 0 }));
    }

    #[test]
    fn rejects_negative_volume_but_allows_zero() {
        let mut p = sample_point(0);
        p.volume = 0.0;
        assert!(PriceSeries::new(vec![p]).is_ok());
        p.volume = -5.0;
        assert!(matches!(
            PriceSeries::new(vec![p]),
            Err(ValidationError::NegativeVolume { .. })
        ));
    }

    #[test]
    fn from_closes_spaces_timestamps() {
        let series =
            PriceSeries::from_closes(ts(0), Duration::hours(1), &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(series.points()[2].timestamp, ts(0) + Duration::hours(2));
        assert_eq!(series.closes(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn deserialization_validates() {
        let series = PriceSeries::new(vec![sample_point(0), sample_point(1)]).unwrap();
        let json = serde_json::to_string(&series).unwrap();
        let back: PriceSeries = serde_json::from_str(&json).unwrap();
        assert_eq!(series, back);

        let bad = json.replace("103.0", "-103.0");
        assert!(serde_json::from_str::<PriceSeries>(&bad).is_err());
    }
}
