//! Volume limiter backends

mod in_memory;
mod redis;

pub use self::redis::{RedisLimiterConfig, RedisVolumeLimiter};
pub use in_memory::InMemoryVolumeLimiter;
