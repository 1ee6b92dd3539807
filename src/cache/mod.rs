//! Persistent prediction cache.
//!
//! - [`CacheKey`]: deterministic SHA-256 fingerprint of a request.
//! - [`CacheStore`]: sharded on-disk store with TTL expiry, a size bound
//!   and crash-safe writes. See the [`store`] module docs for the file
//!   layout and recovery rules.
//! - [`CacheMetadata`] / [`CacheEntry`]: the persisted index format.

pub mod entry;
pub mod key;
pub mod store;

pub use entry::{CacheEntry, CacheMetadata, METADATA_VERSION};
pub use key::CacheKey;
pub use store::{CacheConfig, CacheStats, CacheStore, METADATA_FILE};
