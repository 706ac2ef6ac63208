pub mod consumer;
pub mod market_streamer;
pub mod news_poller;
pub mod sentiment_processor;
pub mod signal_cacher;
pub mod strategy_join;
