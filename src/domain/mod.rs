pub mod entities;
pub mod errors;
pub mod feed_roster;
pub mod pair;
pub mod ports;
pub mod temporal_join;
pub mod validation;

pub use entities::{Article, Candle, CachedPairSignal, HistoryEntry, SentimentLabel, SentimentSignal};
