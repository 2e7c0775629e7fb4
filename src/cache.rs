use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use uuid::Uuid;

/// Bounded per-process cache for coloring image data URLs.
///
/// Purely a duplicate-fetch optimization for the image endpoint: entries are
/// evicted oldest-first once the capacity is reached and the cache is never
/// consulted for correctness. Colorings are immutable, so entries never go
/// stale.
pub struct ImageCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
}

struct CacheInner {
    entries: HashMap<Uuid, String>,
    order: VecDeque<Uuid>,
}

impl ImageCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, id: Uuid) -> Option<String> {
        let guard = self.inner.lock().ok()?;
        guard.entries.get(&id).cloned()
    }

    pub fn insert(&self, id: Uuid, data_url: String) {
        let Ok(mut guard) = self.inner.lock() else {
            return;
        };
        if guard.entries.insert(id, data_url).is_none() {
            guard.order.push_back(id);
        }
        while guard.order.len() > self.capacity {
            if let Some(evicted) = guard.order.pop_front() {
                guard.entries.remove(&evicted);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|guard| guard.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
