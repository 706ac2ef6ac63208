pub mod cascade;
pub mod http_oracle;
pub mod keyword_oracle;

pub use cascade::{OracleCascade, ScoredText};
pub use http_oracle::HttpOracle;
pub use keyword_oracle::KeywordOracle;
