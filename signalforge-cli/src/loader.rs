//! CSV price history loading.
//!
//! Expected header: `timestamp,open,high,low,close,volume`. Timestamps are
//! RFC 3339 strings or integer unix seconds. Rows must already be in
//! ascending time order; the series constructor rejects anything else.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use signalforge_core::domain::{PricePoint, PriceSeries};

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

pub fn load_series(path: &Path) -> Result<PriceSeries> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut points = Vec::new();
    for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
        // Header is line 1.
        let line = i + 2;
        let row = row.with_context(|| format!("{}: bad row at line {line}", path.display()))?;
        let timestamp = parse_timestamp(&row.timestamp)
            .with_context(|| format!("{}: line {line}", path.display()))?;
        points.push(PricePoint {
            timestamp,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }

    PriceSeries::new(points).with_context(|| format!("{}: invalid price series", path.display()))
}

/// Symbol from the file stem, upper-cased (`data/btc.csv` → `BTC`).
pub fn symbol_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_uppercase)
        .unwrap_or_else(|| "UNKNOWN".to_string())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(secs) = raw.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| anyhow!("unix timestamp out of range: {secs}"));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("unrecognized timestamp {raw:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "timestamp,open,high,low,close,volume").unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_rfc3339_rows() {
        let file = csv_file(
            "2024-01-01T00:00:00Z,100,101,99,100.5,1000\n\
             2024-01-02T00:00:00Z,100.5,102,100,101.5,1200\n",
        );
        let series = load_series(file.path()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.current_price(), 101.5);
    }

    #[test]
    fn loads_unix_seconds() {
        let file = csv_file("1704067200,1,1,1,1,0\n1704153600,2,2,2,2,0\n");
        let series = load_series(file.path()).unwrap();
        assert_eq!(series.first().timestamp.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn rejects_bad_timestamp_with_line_number() {
        let file = csv_file("2024-01-01T00:00:00Z,1,1,1,1,0\nyesterday,1,1,1,1,0\n");
        let err = format!("{:#}", load_series(file.path()).unwrap_err());
        assert!(err.contains("line 3"), "{err}");
    }

    #[test]
    fn rejects_out_of_order_rows() {
        let file = csv_file("1704153600,1,1,1,1,0\n1704067200,1,1,1,1,0\n");
        let err = format!("{:#}", load_series(file.path()).unwrap_err());
        assert!(err.contains("invalid price series"), "{err}");
    }

    #[test]
    fn rejects_empty_file() {
        let file = csv_file("");
        assert!(load_series(file.path()).is_err());
    }

    #[test]
    fn symbol_is_file_stem() {
        assert_eq!(symbol_from_path(Path::new("data/btc-usd.csv")), "BTC-USD");
    }
}
