use crate::world::map::{SectorCoord, WorldMap};
use crate::world::tile::ItemSample;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

const DEFAULT_CAPACITY: usize = 64;

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64) / (total as f64)
        }
    }
}

/// Per-planning-call LRU of sector item lists.
///
/// A search touches the same handful of sectors thousands of times; the cache keeps those
/// lookups off the world's item index. It must be cleared whenever the world may have
/// changed, which in practice means at the start of every planning call.
pub struct SectorItemCache {
    cache: LruCache<SectorCoord, Arc<Vec<ItemSample>>>,
    stats: CacheStats,
}

impl SectorItemCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        SectorItemCache {
            cache: LruCache::new(capacity),
            stats: CacheStats::default(),
        }
    }

    /// Items of one sector, fetched from `map` on a miss.
    pub fn sector(&mut self, map: &dyn WorldMap, sector: SectorCoord) -> Arc<Vec<ItemSample>> {
        if let Some(items) = self.cache.get(&sector) {
            self.stats.hits += 1;
            return Arc::clone(items);
        }
        self.stats.misses += 1;
        let mut items = Vec::new();
        if sector.x >= 0 && sector.y >= 0 {
            map.sector_items(sector, &mut items);
        }
        let items = Arc::new(items);
        if let Some((evicted, _)) = self.cache.push(sector, Arc::clone(&items)) {
            if evicted != sector {
                self.stats.evictions += 1;
            }
        }
        items
    }

    /// Appends the items standing exactly on `(x, y)` to `out`.
    pub fn items_at(&mut self, map: &dyn WorldMap, x: i32, y: i32, out: &mut Vec<ItemSample>) {
        let sector = SectorCoord::from(crate::world::position::Point3D::new(x, y, 0));
        let items = self.sector(map, sector);
        out.extend(items.iter().filter(|item| item.x == x && item.y == y).copied());
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = CacheStats::default();
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl Default for SectorItemCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
