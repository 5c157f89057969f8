//! # Bridge Resilience
//!
//! Retry policy and response caching for the translation bridge.
//!
//! - [`retry`] — bounded exponential backoff with jitter, honoring
//!   server-provided retry hints for rate limits.
//! - [`cache`] — exact-match and semantic response caching with strict
//!   fail-open semantics: a broken cache never fails a request.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod retry;

pub use cache::{
    compute_cache_key, CacheStore, CachedEntry, CosineSimilarityIndex, MemoryCacheStore,
    ResponseCache, ResponseCacheConfig, SimilarityIndex,
};
pub use retry::{RetryConfig, RetryPolicy};
