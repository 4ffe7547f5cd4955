//! Cost-bounded TTL cache for remote pages and rendered charts
//!
//! Every entry carries its own time-to-live. Admission is bounded by a total
//! cost budget; an entry the cache declines to keep behaves exactly like a
//! miss, so callers never depend on a write having been retained.

use moka::{future::Cache, Expiry};
use stargraph_common::{Page, RepositoryIdentity, StarEvent};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::mem::size_of;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// Default lifetime of cached pages
pub const DEFAULT_TTL: Duration = Duration::from_secs(48 * 60 * 60);

/// Default total cost budget
pub const DEFAULT_MAX_COST: u64 = 150_000_000;

/// Fixed per-entry bookkeeping cost added to every weighed value
const ENTRY_OVERHEAD: usize = 64;

/// Configuration for the cache system
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Total cost budget across all entries
    pub max_cost: u64,
    /// Time-to-live used by [`TtlCache::set_default`]
    pub default_ttl: Duration,
    /// When false, nothing is ever retained and every lookup misses
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_cost: DEFAULT_MAX_COST,
            default_ttl: DEFAULT_TTL,
            enabled: true,
        }
    }
}

impl CacheConfig {
    /// A cache that never retains anything
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Approximate memory cost of a cached value
pub trait CacheCost {
    fn cost(&self) -> u64;
}

/// Cache performance metrics
#[derive(Debug, Default)]
pub struct CacheMetrics {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub inserts: AtomicU64,
}

impl CacheMetrics {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed) as f64;
        let total = hits + self.misses.load(Ordering::Relaxed) as f64;
        if total > 0.0 {
            hits / total
        } else {
            0.0
        }
    }

    pub fn get_stats(&self) -> HashMap<String, u64> {
        let mut stats = HashMap::new();
        stats.insert("hits".to_string(), self.hits.load(Ordering::Relaxed));
        stats.insert("misses".to_string(), self.misses.load(Ordering::Relaxed));
        stats.insert("inserts".to_string(), self.inserts.load(Ordering::Relaxed));
        stats
    }
}

/// Stored value plus the lifetime and weight it was admitted with
#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    ttl: Duration,
    cost: u32,
}

/// Expires each entry after the ttl it was stored with
struct PerEntryTtl;

impl<K, V> Expiry<K, Entry<V>> for PerEntryTtl {
    fn expire_after_create(&self, _key: &K, entry: &Entry<V>, _created_at: Instant) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &K,
        entry: &Entry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        // A write replaces the entry, so its lifetime restarts
        Some(entry.ttl)
    }
}

/// Concurrent key/value cache with per-entry expiration and cost-bounded
/// admission. Safe to share across tasks without external locking.
pub struct TtlCache<K, V> {
    cache: Cache<K, Entry<V>>,
    config: CacheConfig,
    metrics: Arc<CacheMetrics>,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + fmt::Display + Send + Sync + 'static,
    V: CacheCost + Clone + Send + Sync + 'static,
{
    /// Create a new cache with the given configuration
    pub fn new(config: CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_cost)
            .weigher(|_key: &K, entry: &Entry<V>| entry.cost)
            .expire_after(PerEntryTtl)
            .build();

        Self {
            cache,
            config,
            metrics: Arc::new(CacheMetrics::default()),
        }
    }

    /// Look up a live entry; expired, evicted and rejected entries all miss
    #[instrument(skip(self, key), fields(key = %key))]
    pub async fn get(&self, key: &K) -> Option<V> {
        match self.cache.get(key).await {
            Some(entry) => {
                debug!("Cache hit");
                self.metrics.record_hit();
                Some(entry.value)
            }
            None => {
                debug!("Cache miss");
                self.metrics.record_miss();
                None
            }
        }
    }

    /// Store a value for `ttl`, replacing any previous entry for the key.
    /// The cache may decline to retain it.
    #[instrument(skip(self, key, value), fields(key = %key))]
    pub async fn set(&self, key: K, value: V, ttl: Duration) {
        if !self.config.enabled {
            return;
        }

        let cost = u32::try_from(value.cost()).unwrap_or(u32::MAX);
        debug!(cost, ttl_secs = ttl.as_secs(), "Storing cache entry");
        self.cache.insert(key, Entry { value, ttl, cost }).await;
        self.metrics.record_insert();
    }

    /// Store a value with the configured default ttl
    pub async fn set_default(&self, key: K, value: V) {
        self.set(key, value, self.config.default_ttl).await;
    }

    /// Apply pending admissions, evictions and expirations
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get cache metrics
    pub fn metrics(&self) -> Arc<CacheMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Get cache statistics
    pub fn stats(&self) -> HashMap<String, u64> {
        let mut stats = self.metrics.get_stats();
        stats.insert("entry_count".to_string(), self.cache.entry_count());
        stats.insert("weighted_size".to_string(), self.cache.weighted_size());
        stats
    }
}

impl<K, V> fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

/// Kind of paginated listing a cached page belongs to
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum ResourceKind {
    Repositories,
    Stargazers,
}

impl ResourceKind {
    pub fn tag(self) -> &'static str {
        match self {
            ResourceKind::Repositories => "repos",
            ResourceKind::Stargazers => "gazers",
        }
    }
}

/// Key of one page of one listing. Distinct (kind, identity, page) tuples
/// never compare equal.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Repositories { user: String, page: u32 },
    Stargazers { repo: RepositoryIdentity, page: u32 },
}

impl CacheKey {
    pub fn repositories(user: impl Into<String>, page: u32) -> Self {
        Self::Repositories {
            user: user.into(),
            page,
        }
    }

    pub fn stargazers(repo: &RepositoryIdentity, page: u32) -> Self {
        Self::Stargazers {
            repo: repo.clone(),
            page,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            CacheKey::Repositories { .. } => ResourceKind::Repositories,
            CacheKey::Stargazers { .. } => ResourceKind::Stargazers,
        }
    }

    pub fn page(&self) -> u32 {
        match self {
            CacheKey::Repositories { page, .. } | CacheKey::Stargazers { page, .. } => *page,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Repositories { user, page } => {
                write!(f, "{}/{}/{}", self.kind().tag(), user, page)
            }
            CacheKey::Stargazers { repo, page } => {
                write!(f, "{}/{}/{}/{}", self.kind().tag(), repo.owner, repo.name, page)
            }
        }
    }
}

/// Cached page variants, one per listing kind
#[derive(Debug, Clone, PartialEq)]
pub enum CachedPage {
    Repositories(Page<RepositoryIdentity>),
    Stargazers(Page<StarEvent>),
}

impl CachedPage {
    pub fn kind(&self) -> ResourceKind {
        match self {
            CachedPage::Repositories(_) => ResourceKind::Repositories,
            CachedPage::Stargazers(_) => ResourceKind::Stargazers,
        }
    }
}

impl CacheCost for CachedPage {
    fn cost(&self) -> u64 {
        let items = match self {
            CachedPage::Repositories(page) => page
                .items
                .iter()
                .map(|repo| size_of::<RepositoryIdentity>() + repo.owner.len() + repo.name.len())
                .sum::<usize>(),
            CachedPage::Stargazers(page) => page.items.len() * size_of::<StarEvent>(),
        };
        (items + ENTRY_OVERHEAD) as u64
    }
}

/// Cache of remote listing pages
pub type PageCache = TtlCache<CacheKey, CachedPage>;
