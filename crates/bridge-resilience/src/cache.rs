//! Response caching with strict fail-open semantics.
//!
//! Two lookup paths share one store:
//! - **Exact match** — a SHA-256 key over the canonical role/content
//!   sequence of the conversation. Identical conversations always hash to
//!   the same key regardless of how the request was serialized.
//! - **Semantic match** — an optional [`SimilarityIndex`] collaborator maps
//!   a flattened prompt to the nearest previously seen prompt; a hit above
//!   the cosine threshold reuses that entry.
//!
//! Every cache failure is logged at warn level and treated as a miss (on
//! read) or a no-op (on write). The cache can never fail a request.
//!
//! There is no single-flight coalescing: concurrent identical misses each
//! generate, and the last write wins.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bridge_core::{BridgeResult, Message, StopReason};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// A cached generation result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedEntry {
    /// Generated text
    pub text: String,
    /// Input token count recorded at generation time
    pub input_tokens: u32,
    /// Output token count recorded at generation time
    pub output_tokens: u32,
    /// Stop reason recorded at generation time, replayed on hits
    pub stop_reason: StopReason,
    /// When the entry was created (Unix timestamp)
    pub created_at: u64,
    /// TTL in seconds
    pub ttl_secs: u64,
}

impl CachedEntry {
    /// Create a new entry stamped with the current time
    pub fn new(text: impl Into<String>, input_tokens: u32, output_tokens: u32, ttl: Duration) -> Self {
        Self {
            text: text.into(),
            input_tokens,
            output_tokens,
            stop_reason: StopReason::EndTurn,
            created_at: unix_now(),
            ttl_secs: ttl.as_secs(),
        }
    }

    /// Record the stop reason of the cached generation
    #[must_use]
    pub fn with_stop_reason(mut self, stop_reason: StopReason) -> Self {
        self.stop_reason = stop_reason;
        self
    }

    /// Check if the entry is expired
    #[must_use]
    pub fn is_expired(&self) -> bool {
        unix_now() > self.created_at + self.ttl_secs
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Compute the exact-match cache key for a conversation.
///
/// The key covers only the role/content sequence; generation parameters and
/// serialization order of unrelated fields do not affect it. Content blocks
/// are flattened to text before hashing, so block and plain encodings of
/// the same text produce the same key.
#[must_use]
pub fn compute_cache_key(messages: &[Message]) -> String {
    let mut hasher = Sha256::new();
    for message in messages {
        hasher.update(message.role.to_string().as_bytes());
        hasher.update([0x1f]);
        hasher.update(message.content.extract_text().as_bytes());
        hasher.update([0x1e]);
    }
    hex::encode(hasher.finalize())
}

/// Storage abstraction behind the response cache
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get an entry by key
    async fn get(&self, key: &str) -> BridgeResult<Option<CachedEntry>>;

    /// Store an entry under a key (last write wins)
    async fn set(&self, key: &str, entry: CachedEntry) -> BridgeResult<()>;

    /// Check if the store is reachable
    async fn health_check(&self) -> BridgeResult<()>;

    /// Store name for logs and health output
    fn name(&self) -> &'static str;
}

/// In-memory cache store for single-instance deployments
pub struct MemoryCacheStore {
    entries: Arc<RwLock<HashMap<String, CachedEntry>>>,
    max_entries: usize,
}

impl MemoryCacheStore {
    /// Create a store bounded to `max_entries` live entries
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            max_entries,
        }
    }

    async fn evict_if_needed(&self) {
        let mut entries = self.entries.write().await;

        // Drop expired entries first
        entries.retain(|_, entry| !entry.is_expired());

        // If still over capacity, drop the oldest entries
        if entries.len() >= self.max_entries {
            let to_remove = entries.len() - self.max_entries + 1;
            let mut by_age: Vec<(String, u64)> = entries
                .iter()
                .map(|(k, v)| (k.clone(), v.created_at))
                .collect();
            by_age.sort_by_key(|(_, created_at)| *created_at);

            for (key, _) in by_age.into_iter().take(to_remove) {
                entries.remove(&key);
            }
        }
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> BridgeResult<Option<CachedEntry>> {
        let mut entries = self.entries.write().await;

        if let Some(entry) = entries.get(key) {
            if entry.is_expired() {
                entries.remove(key);
                return Ok(None);
            }
            return Ok(Some(entry.clone()));
        }

        Ok(None)
    }

    async fn set(&self, key: &str, entry: CachedEntry) -> BridgeResult<()> {
        self.evict_if_needed().await;

        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn health_check(&self) -> BridgeResult<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Similarity lookup collaborator for the semantic cache path.
///
/// Maps a flattened prompt to the cache key of the nearest previously seen
/// prompt. The embedding service behind this seam is pluggable; the
/// in-crate [`CosineSimilarityIndex`] serves single-process deployments.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Record a prompt under a cache key
    async fn insert(&self, prompt: &str, key: &str) -> BridgeResult<()>;

    /// Find the nearest recorded prompt; returns `(key, score)` with
    /// score in `[0, 1]`
    async fn nearest(&self, prompt: &str) -> BridgeResult<Option<(String, f32)>>;
}

/// In-memory cosine-similarity index over word-frequency vectors
pub struct CosineSimilarityIndex {
    entries: Arc<RwLock<Vec<(HashMap<String, f32>, String)>>>,
    max_entries: usize,
}

impl CosineSimilarityIndex {
    /// Create an index bounded to `max_entries` prompts
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            max_entries,
        }
    }

    fn vectorize(prompt: &str) -> HashMap<String, f32> {
        let mut counts: HashMap<String, f32> = HashMap::new();
        for word in prompt.to_lowercase().split_whitespace() {
            *counts.entry(word.to_string()).or_insert(0.0) += 1.0;
        }
        counts
    }

    fn cosine(a: &HashMap<String, f32>, b: &HashMap<String, f32>) -> f32 {
        let dot: f32 = a
            .iter()
            .filter_map(|(word, weight)| b.get(word).map(|other| weight * other))
            .sum();
        let norm_a: f32 = a.values().map(|w| w * w).sum::<f32>().sqrt();
        let norm_b: f32 = b.values().map(|w| w * w).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            0.0
        } else {
            dot / (norm_a * norm_b)
        }
    }
}

impl Default for CosineSimilarityIndex {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl SimilarityIndex for CosineSimilarityIndex {
    async fn insert(&self, prompt: &str, key: &str) -> BridgeResult<()> {
        let mut entries = self.entries.write().await;
        if entries.len() >= self.max_entries {
            entries.remove(0);
        }
        entries.push((Self::vectorize(prompt), key.to_string()));
        Ok(())
    }

    async fn nearest(&self, prompt: &str) -> BridgeResult<Option<(String, f32)>> {
        let vector = Self::vectorize(prompt);
        let entries = self.entries.read().await;

        let best = entries
            .iter()
            .map(|(candidate, key)| (key.clone(), Self::cosine(&vector, candidate)))
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        Ok(best)
    }
}

/// Response cache configuration
#[derive(Debug, Clone)]
pub struct ResponseCacheConfig {
    /// Entry lifetime
    pub ttl: Duration,
    /// Enable the semantic lookup path
    pub semantic: bool,
    /// Cosine threshold for a semantic hit
    pub similarity_threshold: f32,
}

impl Default for ResponseCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(86_400),
            semantic: false,
            similarity_threshold: 0.8,
        }
    }
}

/// Fail-open wrapper around a [`CacheStore`] and optional [`SimilarityIndex`]
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    index: Option<Arc<dyn SimilarityIndex>>,
    config: ResponseCacheConfig,
}

impl ResponseCache {
    /// Create a cache over the given store
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>, config: ResponseCacheConfig) -> Self {
        Self {
            store,
            index: None,
            config,
        }
    }

    /// Attach a similarity index for the semantic path
    #[must_use]
    pub fn with_similarity_index(mut self, index: Arc<dyn SimilarityIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Look up a conversation. Exact match first, then semantic when
    /// enabled. Any store or index failure degrades to a miss.
    pub async fn get(&self, messages: &[Message]) -> Option<CachedEntry> {
        let key = compute_cache_key(messages);

        match self.store.get(&key).await {
            Ok(Some(entry)) => {
                debug!(key = %key, "Exact cache hit");
                return Some(entry);
            }
            Ok(None) => {}
            Err(error) => {
                warn!(error = %error, "Cache get failed, treating as miss");
                return None;
            }
        }

        if self.config.semantic {
            if let Some(index) = &self.index {
                return self.semantic_get(index, messages).await;
            }
        }

        None
    }

    async fn semantic_get(
        &self,
        index: &Arc<dyn SimilarityIndex>,
        messages: &[Message],
    ) -> Option<CachedEntry> {
        let prompt = flatten_prompt(messages);

        let (key, score) = match index.nearest(&prompt).await {
            Ok(Some(hit)) => hit,
            Ok(None) => return None,
            Err(error) => {
                warn!(error = %error, "Similarity lookup failed, treating as miss");
                return None;
            }
        };

        if score < self.config.similarity_threshold {
            return None;
        }

        match self.store.get(&key).await {
            Ok(Some(entry)) => {
                debug!(key = %key, score = score, "Semantic cache hit");
                Some(entry)
            }
            Ok(None) => None,
            Err(error) => {
                warn!(error = %error, "Cache get failed, treating as miss");
                None
            }
        }
    }

    /// Store a generation result. Failures are logged and dropped.
    pub async fn put(&self, messages: &[Message], entry: CachedEntry) {
        let key = compute_cache_key(messages);

        if let Err(error) = self.store.set(&key, entry).await {
            warn!(error = %error, "Cache put failed, skipping");
            return;
        }

        if self.config.semantic {
            if let Some(index) = &self.index {
                let prompt = flatten_prompt(messages);
                if let Err(error) = index.insert(&prompt, &key).await {
                    warn!(error = %error, "Similarity insert failed, skipping");
                }
            }
        }
    }

    /// Check if the underlying store is reachable
    pub async fn health_check(&self) -> BridgeResult<()> {
        self.store.health_check().await
    }

    /// Name of the underlying store
    #[must_use]
    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }
}

/// Flatten a conversation into a role-labeled prompt string
#[must_use]
pub fn flatten_prompt(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content.extract_text()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::{BridgeError, Content, ContentBlock, Role};

    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, _key: &str) -> BridgeResult<Option<CachedEntry>> {
            Err(BridgeError::cache("store offline"))
        }

        async fn set(&self, _key: &str, _entry: CachedEntry) -> BridgeResult<()> {
            Err(BridgeError::cache("store offline"))
        }

        async fn health_check(&self) -> BridgeResult<()> {
            Err(BridgeError::cache("store offline"))
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    fn conversation(text: &str) -> Vec<Message> {
        vec![Message::user(text)]
    }

    #[test]
    fn test_key_determinism() {
        let a = conversation("Explain X");
        let b = conversation("Explain X");
        assert_eq!(compute_cache_key(&a), compute_cache_key(&b));

        let c = conversation("Explain Y");
        assert_ne!(compute_cache_key(&a), compute_cache_key(&c));
    }

    #[test]
    fn test_key_ignores_content_encoding() {
        let plain = vec![Message::user("Explain X")];
        let blocks = vec![Message {
            role: Role::User,
            content: Content::Blocks(vec![ContentBlock::Text {
                text: "Explain X".to_string(),
            }]),
        }];
        assert_eq!(compute_cache_key(&plain), compute_cache_key(&blocks));
    }

    #[test]
    fn test_key_sensitive_to_role() {
        let user = vec![Message::user("hello")];
        let assistant = vec![Message::assistant("hello")];
        assert_ne!(compute_cache_key(&user), compute_cache_key(&assistant));
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryCacheStore::new(10);
        let entry = CachedEntry::new("answer", 3, 1, Duration::from_secs(60));

        store.set("k", entry).await.unwrap();
        let got = store.get("k").await.unwrap().unwrap();
        assert_eq!(got.text, "answer");
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let store = MemoryCacheStore::new(10);
        let mut entry = CachedEntry::new("stale", 1, 1, Duration::from_secs(60));
        entry.created_at -= 120;
        store.set("k", entry).await.unwrap();

        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_eviction_drops_oldest() {
        let store = MemoryCacheStore::new(2);
        let mut old = CachedEntry::new("old", 1, 1, Duration::from_secs(600));
        old.created_at -= 100;
        store.set("old", old).await.unwrap();
        store
            .set("mid", CachedEntry::new("mid", 1, 1, Duration::from_secs(600)))
            .await
            .unwrap();
        store
            .set("new", CachedEntry::new("new", 1, 1, Duration::from_secs(600)))
            .await
            .unwrap();

        assert!(store.get("old").await.unwrap().is_none());
        assert!(store.get("new").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_fail_open_on_broken_store() {
        let cache = ResponseCache::new(Arc::new(BrokenStore), ResponseCacheConfig::default());
        let messages = conversation("Explain X");

        // Both operations complete without error
        assert!(cache.get(&messages).await.is_none());
        cache
            .put(
                &messages,
                CachedEntry::new("answer", 1, 1, Duration::from_secs(60)),
            )
            .await;
    }

    #[tokio::test]
    async fn test_exact_hit_roundtrip() {
        let cache = ResponseCache::new(
            Arc::new(MemoryCacheStore::default()),
            ResponseCacheConfig::default(),
        );
        let messages = conversation("Explain X");

        assert!(cache.get(&messages).await.is_none());
        cache
            .put(
                &messages,
                CachedEntry::new("cached answer", 3, 2, Duration::from_secs(60)),
            )
            .await;

        let hit = cache.get(&messages).await.unwrap();
        assert_eq!(hit.text, "cached answer");
        assert_eq!(hit.input_tokens, 3);
    }

    #[tokio::test]
    async fn test_stop_reason_survives_roundtrip() {
        let cache = ResponseCache::new(
            Arc::new(MemoryCacheStore::default()),
            ResponseCacheConfig::default(),
        );
        let messages = conversation("write a long essay");

        cache
            .put(
                &messages,
                CachedEntry::new("truncated...", 4, 200, Duration::from_secs(60))
                    .with_stop_reason(StopReason::MaxTokens),
            )
            .await;

        let hit = cache.get(&messages).await.unwrap();
        assert_eq!(hit.stop_reason, StopReason::MaxTokens);
    }

    #[tokio::test]
    async fn test_semantic_hit_above_threshold() {
        let config = ResponseCacheConfig {
            semantic: true,
            similarity_threshold: 0.8,
            ..Default::default()
        };
        let cache = ResponseCache::new(Arc::new(MemoryCacheStore::default()), config)
            .with_similarity_index(Arc::new(CosineSimilarityIndex::default()));

        let original = conversation("how do I sort a vector in rust");
        cache
            .put(
                &original,
                CachedEntry::new("use sort()", 5, 2, Duration::from_secs(60)),
            )
            .await;

        // Identical wording but different message object: semantic path
        // still finds it even though this is also an exact hit; a close
        // paraphrase exercises the similarity path alone.
        let paraphrase = conversation("how do I sort a vector in rust please");
        let hit = cache.get(&paraphrase).await;
        assert!(hit.is_some());
        assert_eq!(hit.unwrap().text, "use sort()");
    }

    #[tokio::test]
    async fn test_semantic_miss_below_threshold() {
        let config = ResponseCacheConfig {
            semantic: true,
            similarity_threshold: 0.8,
            ..Default::default()
        };
        let cache = ResponseCache::new(Arc::new(MemoryCacheStore::default()), config)
            .with_similarity_index(Arc::new(CosineSimilarityIndex::default()));

        cache
            .put(
                &conversation("how do I sort a vector in rust"),
                CachedEntry::new("use sort()", 5, 2, Duration::from_secs(60)),
            )
            .await;

        let unrelated = conversation("what is the weather in tokyo");
        assert!(cache.get(&unrelated).await.is_none());
    }

    #[test]
    fn test_cosine_identical_prompts() {
        let a = CosineSimilarityIndex::vectorize("hello world");
        let b = CosineSimilarityIndex::vectorize("hello world");
        assert!((CosineSimilarityIndex::cosine(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_flatten_prompt_labels_roles() {
        let messages = vec![Message::system("be brief"), Message::user("hi")];
        assert_eq!(flatten_prompt(&messages), "system: be brief\nuser: hi");
    }
}
