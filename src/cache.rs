use std::{
    num::NonZeroUsize,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use lru::LruCache;
use sea_orm::DatabaseConnection;
use tokio::sync::RwLock;

use crate::{
    admin::DashboardStats,
    catalog::{CatalogFilter, MoviePage},
    entities::category,
};

/// Identifies one cached read.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Categories,
    MoviePage(CatalogFilter),
    DashboardStats,
}

#[derive(Clone, Debug)]
pub enum Cached {
    Categories(Arc<Vec<category::Model>>),
    MoviePage(Arc<MoviePage>),
    DashboardStats(DashboardStats),
}

/// Which family of entries a mutation makes stale.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Invalidate {
    Movies,
    Categories,
}

impl Invalidate {
    fn covers(self, key: &CacheKey) -> bool {
        match (self, key) {
            (_, CacheKey::MoviePage(_) | CacheKey::DashboardStats) => true,
            (Invalidate::Categories, CacheKey::Categories) => true,
            (Invalidate::Movies, CacheKey::Categories) => false,
        }
    }
}

#[derive(Clone, Debug)]
struct Entry {
    value: Cached,
    cached_at: i64,
}

/// Database handle plus a bounded in-memory read cache.
///
/// Entries expire after `ttl_seconds` and the least recently used entry is
/// evicted once `capacity` is reached. Every invalidation bumps a generation
/// counter. Readers capture the generation before going to the database and
/// [`CacheManager::put`] refuses the value if an invalidation happened in
/// between, so a slow read can never overwrite state that a newer mutation
/// already made obsolete.
#[derive(Clone)]
pub struct CacheManager {
    db: DatabaseConnection,
    entries: Arc<RwLock<LruCache<CacheKey, Entry>>>,
    generation: Arc<AtomicU64>,
    ttl_seconds: i64,
}

impl CacheManager {
    pub fn new(db: DatabaseConnection, ttl_seconds: i64, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            db,
            entries: Arc::new(RwLock::new(LruCache::new(capacity))),
            generation: Arc::new(AtomicU64::new(0)),
            ttl_seconds,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Fresh value for `key`; an expired entry is dropped on the way.
    pub async fn get(&self, key: &CacheKey) -> Option<Cached> {
        let mut entries = self.entries.write().await;
        let cached_at = entries.peek(key)?.cached_at;
        if !self.is_fresh(cached_at) {
            entries.pop(key);
            return None;
        }
        entries.get(key).map(|e| e.value.clone())
    }

    /// Stores `value` unless the cache was invalidated after `generation` was read.
    pub async fn put(&self, generation: u64, key: CacheKey, value: Cached) -> bool {
        let mut entries = self.entries.write().await;
        if self.generation.load(Ordering::Acquire) != generation {
            tracing::debug!(?key, "discarding stale cache fill");
            return false;
        }

        let expired: Vec<CacheKey> = entries
            .iter()
            .filter(|(_, e)| !self.is_fresh(e.cached_at))
            .map(|(k, _)| k.clone())
            .collect();
        for k in &expired {
            entries.pop(k);
        }

        let replaced = entries.push(key.clone(), Entry { value, cached_at: now_sec() });
        if let Some((evicted, _)) = replaced.filter(|(k, _)| *k != key) {
            tracing::debug!(?evicted, "cache entry evicted");
        }
        true
    }

    pub async fn invalidate(&self, scope: Invalidate) {
        let mut entries = self.entries.write().await;
        self.generation.fetch_add(1, Ordering::AcqRel);
        let stale: Vec<CacheKey> =
            entries.iter().filter(|(k, _)| scope.covers(k)).map(|(k, _)| k.clone()).collect();
        for k in &stale {
            entries.pop(k);
        }
        tracing::debug!(?scope, dropped = stale.len(), "cache invalidated");
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    fn is_fresh(&self, cached_at: i64) -> bool {
        now_sec().saturating_sub(cached_at) <= self.ttl_seconds
    }
}

pub fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories(names: &[&str]) -> Cached {
        Cached::Categories(Arc::new(
            names
                .iter()
                .enumerate()
                .map(|(i, name)| category::Model {
                    id: i as i32 + 1,
                    name: name.to_string(),
                    slug: crate::slug::slugify(name),
                })
                .collect(),
        ))
    }

    #[tokio::test]
    async fn put_then_get() {
        let cache = CacheManager::new(crate::db::test_db().await, 60, 64);
        let generation = cache.generation();
        assert!(cache.put(generation, CacheKey::Categories, categories(&["Drama"])).await);

        match cache.get(&CacheKey::Categories).await {
            Some(Cached::Categories(list)) => assert_eq!(list[0].slug, "drama"),
            other => panic!("unexpected cache entry: {other:?}"),
        }
    }

    #[tokio::test]
    async fn stale_fill_is_rejected() {
        let cache = CacheManager::new(crate::db::test_db().await, 60, 64);
        let generation = cache.generation();
        cache.invalidate(Invalidate::Categories).await;

        assert!(!cache.put(generation, CacheKey::Categories, categories(&["Drama"])).await);
        assert!(cache.get(&CacheKey::Categories).await.is_none());
    }

    #[tokio::test]
    async fn movie_invalidation_keeps_categories() {
        let cache = CacheManager::new(crate::db::test_db().await, 60, 64);
        let generation = cache.generation();
        cache.put(generation, CacheKey::Categories, categories(&["Drama"])).await;
        cache
            .put(
                generation,
                CacheKey::MoviePage(CatalogFilter::default()),
                Cached::MoviePage(Arc::new(MoviePage::default())),
            )
            .await;

        cache.invalidate(Invalidate::Movies).await;

        assert!(cache.get(&CacheKey::Categories).await.is_some());
        assert!(cache.get(&CacheKey::MoviePage(CatalogFilter::default())).await.is_none());

        cache.invalidate(Invalidate::Categories).await;
        assert!(cache.get(&CacheKey::Categories).await.is_none());
    }

    #[tokio::test]
    async fn expired_entries_are_misses() {
        let cache = CacheManager::new(crate::db::test_db().await, -1, 64);
        let generation = cache.generation();
        cache.put(generation, CacheKey::Categories, categories(&["Drama"])).await;
        assert!(cache.get(&CacheKey::Categories).await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    fn search_page(term: String) -> CacheKey {
        CacheKey::MoviePage(CatalogFilter { search: Some(term), ..Default::default() })
    }

    #[tokio::test]
    async fn entry_count_is_bounded_by_capacity() {
        let cache = CacheManager::new(crate::db::test_db().await, 60, 8);
        let generation = cache.generation();
        cache.put(generation, CacheKey::Categories, categories(&["Drama"])).await;

        for i in 0..100 {
            let page = Cached::MoviePage(Arc::new(MoviePage::default()));
            assert!(cache.put(generation, search_page(format!("term {i}")), page).await);
            assert!(cache.len().await <= 8);
        }

        assert_eq!(cache.len().await, 8);
        assert!(cache.get(&search_page("term 99".into())).await.is_some());
        assert!(cache.get(&search_page("term 0".into())).await.is_none());
        assert!(cache.get(&CacheKey::Categories).await.is_none());
    }

    #[tokio::test]
    async fn recently_read_entries_survive_eviction() {
        let cache = CacheManager::new(crate::db::test_db().await, 60, 2);
        let generation = cache.generation();
        cache.put(generation, CacheKey::Categories, categories(&["Drama"])).await;
        cache.put(generation, search_page("a".into()), Cached::MoviePage(Default::default())).await;

        assert!(cache.get(&CacheKey::Categories).await.is_some());
        cache.put(generation, search_page("b".into()), Cached::MoviePage(Default::default())).await;

        assert!(cache.get(&CacheKey::Categories).await.is_some());
        assert!(cache.get(&search_page("a".into())).await.is_none());
    }
}
