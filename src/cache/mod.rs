//! Multi-namespace TTL caching

mod service;
mod ttl;

pub use service::{scoped_key, CacheService, Namespace};
pub use ttl::{CacheEntry, TtlCache};
