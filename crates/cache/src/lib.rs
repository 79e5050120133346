#![warn(clippy::unwrap_used)]

pub mod client;
pub mod local;
pub mod store;

pub use client::RedisCache;
pub use local::LocalCache;
pub use store::{get_json, put_json, KeyValueStore};
