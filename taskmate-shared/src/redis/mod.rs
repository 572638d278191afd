/// Redis integration
///
/// Redis backs the session store when `REDIS_URL` is configured; see
/// `auth::session::RedisSessionStore`.

pub mod client;

pub use client::{RedisClient, RedisClientError, RedisConfig};
