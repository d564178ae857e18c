//! Cache module
//!
//! Key-value store access in three layers:
//! - `store`: the `KvStore` port plus an in-process implementation
//! - `redis`: the production implementation over a Redis connection manager
//! - `facade`: the typed, best-effort cache the services consume
//!
//! The facade never propagates backend failures to callers; a broken store
//! degrades to "no cache", not to request errors.

pub mod facade;
pub mod redis;
pub mod store;

pub use facade::{listing_key, Cache};
pub use self::redis::RedisKvStore;
pub use store::{CacheError, KvStore, MemoryKvStore};
