pub mod redis_client;

pub use redis_client::RedisCache;
