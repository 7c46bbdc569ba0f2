use std::collections::HashMap;
use std::hash::Hash;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, MutexGuard};

/// Change notification delivered to cache subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent<K> {
    Updated(K),
    Invalidated(K),
    Cleared,
}

/// In-memory read-through cache with explicit invalidation.
///
/// Subscribers get every change over an mpsc channel; a subscriber whose
/// receiver was dropped is removed on the next change.
pub struct Cache<K, V> {
    entries: Mutex<HashMap<K, V>>,
    subscribers: Mutex<Vec<Sender<CacheEvent<K>>>>,
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

// A poisoned lock only means another thread panicked mid-update; the map is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        lock(&self.entries).get(key).cloned()
    }

    pub fn set(&self, key: K, value: V) {
        lock(&self.entries).insert(key.clone(), value);
        self.notify(CacheEvent::Updated(key));
    }

    /// Drop one entry. Subscribers are told even if nothing was cached.
    pub fn invalidate(&self, key: &K) -> Option<V> {
        let removed = lock(&self.entries).remove(key);
        self.notify(CacheEvent::Invalidated(key.clone()));
        removed
    }

    pub fn clear(&self) {
        lock(&self.entries).clear();
        self.notify(CacheEvent::Cleared);
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe(&self) -> Receiver<CacheEvent<K>> {
        let (tx, rx) = mpsc::channel();
        lock(&self.subscribers).push(tx);
        rx
    }

    /// Return the cached value or load, store and return it.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: K,
        load: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }
        let value = load()?;
        self.set(key, value.clone());
        Ok(value)
    }

    fn notify(&self, event: CacheEvent<K>) {
        lock(&self.subscribers).retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_invalidate() {
        let cache: Cache<i64, String> = Cache::new();
        assert!(cache.get(&1).is_none());

        cache.set(1, "a".to_string());
        assert_eq!(cache.get(&1).as_deref(), Some("a"));

        assert_eq!(cache.invalidate(&1).as_deref(), Some("a"));
        assert!(cache.get(&1).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_subscribers_see_changes_in_order() {
        let cache: Cache<i64, u32> = Cache::new();
        let rx = cache.subscribe();

        cache.set(7, 1);
        cache.invalidate(&7);
        cache.clear();

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                CacheEvent::Updated(7),
                CacheEvent::Invalidated(7),
                CacheEvent::Cleared
            ]
        );
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let cache: Cache<i64, u32> = Cache::new();
        let rx = cache.subscribe();
        drop(rx);
        cache.set(1, 1);
        assert!(lock(&cache.subscribers).is_empty());
    }

    #[test]
    fn test_read_through_loads_once() {
        let cache: Cache<i64, u32> = Cache::new();
        let mut loads = 0;
        let first: Result<u32, ()> = cache.get_or_try_insert_with(3, || {
            loads += 1;
            Ok(30)
        });
        assert_eq!(first, Ok(30));
        let second: Result<u32, ()> = cache.get_or_try_insert_with(3, || Ok(99));
        assert_eq!(second, Ok(30));
        assert_eq!(loads, 1);

        let failed: Result<u32, &str> = cache.get_or_try_insert_with(4, || Err("missing"));
        assert_eq!(failed, Err("missing"));
        assert!(cache.get(&4).is_none());
    }
}
