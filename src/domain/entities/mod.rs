pub mod article;
pub mod candle;
pub mod sentiment;

pub use article::Article;
pub use candle::Candle;
pub use sentiment::{CachedPairSignal, HistoryEntry, SentimentLabel, SentimentSignal};
