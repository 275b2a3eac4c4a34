//! Domain types for SignalForge

pub mod price;

pub use price::{PricePoint, PriceSeries};
