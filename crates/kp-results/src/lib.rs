//! kp-results: memoized views and chart data.
//!
//! Entries are addressed by a content hash of the query plus the revision
//! stamps of the scenario's ancestor chain, so an edit anywhere on the chain
//! yields a fresh key instead of needing explicit invalidation.

pub mod cache;
pub mod hash;

pub use cache::{CacheStats, Memo, DEFAULT_MAX_ENTRIES};
pub use hash::{compute_cache_key, CacheKey, CacheQuery, QueryKind};
