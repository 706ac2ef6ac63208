pub mod binance_source;

pub use binance_source::BinanceCandleSource;
