//! Memoized derived-relationship lookups.
//!
//! Entries are tagged with the store generation they were computed at and are
//! only served while that generation is current, so a result computed just
//! before a mutation can never outlive it. Mutations also clear the cache
//! outright to release memory.

use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::xref::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CachedQuery {
    Parents,
    Children,
    Siblings,
    Spouses,
}

type Key = (CachedQuery, NodeId);

#[derive(Debug)]
pub struct QueryCache {
    entries: DashMap<Key, (u64, Arc<[NodeId]>)>,
    /// Insertion order for FIFO eviction.
    order: Mutex<VecDeque<Key>>,
    capacity: usize,
}

impl QueryCache {
    /// A cache holding at most `capacity` entries. Zero disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    pub fn get(&self, query: CachedQuery, id: NodeId, generation: u64) -> Option<Arc<[NodeId]>> {
        let entry = self.entries.get(&(query, id))?;
        let (stored, ids) = entry.value();
        (*stored == generation).then(|| Arc::clone(ids))
    }

    pub fn insert(&self, query: CachedQuery, id: NodeId, generation: u64, ids: Arc<[NodeId]>) {
        if self.capacity == 0 {
            return;
        }
        let key = (query, id);
        let mut order = self.order.lock();
        if self.entries.insert(key, (generation, ids)).is_none() {
            order.push_back(key);
        }
        while self.entries.len() > self.capacity {
            match order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    pub fn clear(&self) {
        let mut order = self.order.lock();
        self.entries.clear();
        order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u32) -> NodeId {
        NodeId::new(raw).unwrap()
    }

    fn ids(raw: &[u32]) -> Arc<[NodeId]> {
        raw.iter().map(|r| id(*r)).collect::<Vec<_>>().into()
    }

    #[test]
    fn hit_only_for_current_generation() {
        let cache = QueryCache::new(10);
        cache.insert(CachedQuery::Parents, id(3), 7, ids(&[1, 2]));
        assert_eq!(cache.get(CachedQuery::Parents, id(3), 7).as_deref(), Some(&ids(&[1, 2])[..]));
        assert!(cache.get(CachedQuery::Parents, id(3), 8).is_none());
        assert!(cache.get(CachedQuery::Children, id(3), 7).is_none());
    }

    #[test]
    fn evicts_oldest_first() {
        let cache = QueryCache::new(2);
        cache.insert(CachedQuery::Parents, id(1), 0, ids(&[]));
        cache.insert(CachedQuery::Parents, id(2), 0, ids(&[]));
        cache.insert(CachedQuery::Parents, id(3), 0, ids(&[]));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(CachedQuery::Parents, id(1), 0).is_none());
        assert!(cache.get(CachedQuery::Parents, id(3), 0).is_some());
    }

    #[test]
    fn zero_capacity_disables() {
        let cache = QueryCache::new(0);
        cache.insert(CachedQuery::Spouses, id(1), 0, ids(&[2]));
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_empties() {
        let cache = QueryCache::new(4);
        cache.insert(CachedQuery::Siblings, id(1), 0, ids(&[2]));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 4);
    }
}
