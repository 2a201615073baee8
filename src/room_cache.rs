// Room detail cache: keeps recently viewed rooms so that revisiting a room page
// does not hit the backend again within the TTL

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::catalog::{CatalogError, RoomCatalog};
use crate::config::RoomCacheConfig;
use crate::filters::CatalogQuery;
use crate::models::Room;

#[derive(Debug, Default)]
pub struct RoomCacheStats {
    pub items_count: AtomicUsize,
    pub hit_count: AtomicUsize,
    pub miss_count: AtomicUsize,
    pub eviction_count: AtomicUsize,
    pub expired_count: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RoomCacheStatsReport {
    pub items_count: usize,
    pub hit_count: usize,
    pub miss_count: usize,
    pub eviction_count: usize,
    pub expired_count: usize,
}

struct CacheEntry {
    room: Room,
    created_at: Instant,
    last_accessed: Instant,
}

pub struct RoomCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
    stats: RoomCacheStats,
}

impl RoomCache {
    pub fn new(config: &RoomCacheConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: config.ttl,
            max_entries: config.max_entries.max(1),
            stats: RoomCacheStats::default(),
        }
    }

    // Fresh copy of a cached room, if any
    pub fn get(&self, room_id: &str) -> Option<Room> {
        let mut entries = self.entries.lock();

        match entries.get_mut(room_id) {
            None => {
                self.stats.miss_count.fetch_add(1, Ordering::SeqCst);
                return None;
            }
            Some(entry) if entry.created_at.elapsed() <= self.ttl => {
                entry.last_accessed = Instant::now();
                self.stats.hit_count.fetch_add(1, Ordering::SeqCst);
                return Some(entry.room.clone());
            }
            Some(_) => {}
        }

        entries.remove(room_id);
        self.stats.items_count.fetch_sub(1, Ordering::SeqCst);
        self.stats.expired_count.fetch_add(1, Ordering::SeqCst);
        self.stats.miss_count.fetch_add(1, Ordering::SeqCst);
        debug!(room_id, "cached room expired");
        None
    }

    /// Caches `room`, replacing any previous entry for the same id. When the
    /// cache is full the least recently used entry is evicted first.
    pub fn store(&self, room: Room) {
        let mut entries = self.entries.lock();

        if !entries.contains_key(&room.id) && entries.len() >= self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_accessed)
                .map(|(key, _)| key.clone());

            if let Some(key) = oldest {
                entries.remove(&key);
                self.stats.items_count.fetch_sub(1, Ordering::SeqCst);
                self.stats.eviction_count.fetch_add(1, Ordering::SeqCst);
                debug!(room_id = %key, "evicted least recently used room");
            }
        }

        let now = Instant::now();
        let previous = entries.insert(
            room.id.clone(),
            CacheEntry {
                room,
                created_at: now,
                last_accessed: now,
            },
        );
        if previous.is_none() {
            self.stats.items_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    // Drops one room, or everything when `room_id` is `None`
    pub fn invalidate(&self, room_id: Option<&str>) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, _| room_id.is_some_and(|id| key != id));

        let removed = before - entries.len();
        self.stats.items_count.fetch_sub(removed, Ordering::SeqCst);
        removed
    }

    pub fn stats(&self) -> RoomCacheStatsReport {
        RoomCacheStatsReport {
            items_count: self.stats.items_count.load(Ordering::SeqCst),
            hit_count: self.stats.hit_count.load(Ordering::SeqCst),
            miss_count: self.stats.miss_count.load(Ordering::SeqCst),
            eviction_count: self.stats.eviction_count.load(Ordering::SeqCst),
            expired_count: self.stats.expired_count.load(Ordering::SeqCst),
        }
    }
}

/// [`RoomCatalog`] that serves `get_by_id` from a [`RoomCache`]. Searches
/// always go to the wrapped catalog; only found rooms are cached.
pub struct CachedCatalog<C> {
    inner: C,
    cache: RoomCache,
}

impl<C: RoomCatalog> CachedCatalog<C> {
    pub fn new(inner: C, config: &RoomCacheConfig) -> Self {
        Self {
            inner,
            cache: RoomCache::new(config),
        }
    }

    pub fn cache(&self) -> &RoomCache {
        &self.cache
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: RoomCatalog> RoomCatalog for CachedCatalog<C> {
    async fn search(&self, query: &CatalogQuery) -> Result<Vec<Room>, CatalogError> {
        self.inner.search(query).await
    }

    async fn get_by_id(&self, room_id: &str) -> Result<Room, CatalogError> {
        if let Some(room) = self.cache.get(room_id) {
            debug!(room_id, "room served from cache");
            return Ok(room);
        }

        let room = self.inner.get_by_id(room_id).await?;
        self.cache.store(room.clone());
        Ok(room)
    }
}
