//! Signal fusion: indicator votes and the ensemble forecast blended into one
//! directional call, plus a market sentiment score.

pub mod fusion;
pub mod sentiment;

pub use fusion::{fuse, Direction, FusedSignal, SignalVotes};
pub use sentiment::{MarketSentiment, SentimentLabel, VolumeActivity};
