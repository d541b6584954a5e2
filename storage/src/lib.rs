//! # Counter Storage
//!
//! Windowed counter backends for the rate limiter: a shared Redis store and
//! an in-process fallback.

pub mod local;
pub mod redis;

pub use local::LocalCounterStore;
pub use redis::RedisCounterStore;
