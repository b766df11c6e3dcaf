//! A `HashSet` where every member carries an expiry, yielded as a `Stream` once it elapses.
//!
//! Used for bookkeeping that needs "forget this after N seconds unless refreshed" semantics --
//! e.g. giving up on a block whose parent we requested but never received.

use futures::stream::Stream;
use std::collections::HashMap;
use std::hash::Hash;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio_util::time::delay_queue::{self, DelayQueue};

pub struct HashSetDelay<K>
where
    K: Eq + Hash + Clone,
{
    entries: HashMap<K, delay_queue::Key>,
    expirations: DelayQueue<K>,
    default_entry_timeout: Duration,
}

impl<K> HashSetDelay<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new(default_entry_timeout: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            expirations: DelayQueue::new(),
            default_entry_timeout,
        }
    }

    /// Insert `key`, expiring after the default timeout. A pre-existing entry has its expiry
    /// reset.
    pub fn insert(&mut self, key: K) {
        self.insert_at(key, self.default_entry_timeout);
    }

    pub fn insert_at(&mut self, key: K, timeout: Duration) {
        if let Some(delay_key) = self.entries.get(&key) {
            self.expirations.reset(delay_key, timeout);
        } else {
            let delay_key = self.expirations.insert(key.clone(), timeout);
            self.entries.insert(key, delay_key);
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &K) -> bool {
        if let Some(delay_key) = self.entries.remove(key) {
            self.expirations.remove(&delay_key);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }
}

/// Yields each key once its timeout elapses.
impl<K> Stream for HashSetDelay<K>
where
    K: Eq + Hash + Clone + Unpin,
{
    type Item = K;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match Pin::new(&mut this.expirations).poll_expired(cx) {
            Poll::Ready(Some(Ok(expired))) => {
                let key = expired.into_inner();
                this.entries.remove(&key);
                Poll::Ready(Some(key))
            }
            Poll::Ready(Some(Err(_))) | Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_contains() {
        let mut set: HashSetDelay<u64> = HashSetDelay::new(Duration::from_secs(10));
        set.insert(1);
        assert!(set.contains_key(&1));
        assert_eq!(set.len(), 1);
        set.remove(&1);
        assert!(!set.contains_key(&1));
    }

    #[test]
    fn reinserting_does_not_duplicate() {
        let mut set: HashSetDelay<u64> = HashSetDelay::new(Duration::from_secs(10));
        set.insert(1);
        set.insert(1);
        assert_eq!(set.len(), 1);
    }
}
