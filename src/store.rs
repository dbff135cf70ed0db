//! Memo store for lazily computed per-monomial results.
//!
//! Besides the finished entries, the store tracks which keys are currently being computed.
//! Asking for a key that is still pending means the computation depends on itself, which the
//! callers report as an internal error.
use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

pub struct Store<K, V> {
    data: HashMap<K, V>,
    pending: HashSet<K>,
    hits: Cell<usize>,
    misses: Cell<usize>,
}

impl<K, V> Default for Store<K, V> {
    fn default() -> Self {
        Self {
            data: HashMap::new(),
            pending: HashSet::new(),
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }
}

impl<K, V> Store<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of store hits.
    pub fn hits(&self) -> usize {
        self.hits.get()
    }
    /// Get the number of store misses.
    pub fn misses(&self) -> usize {
        self.misses.get()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Forget all entries, including pending ones.
    pub fn clear(&mut self) {
        self.data.clear();
        self.pending.clear();
        self.hits.set(0);
        self.misses.set(0);
    }

    /// Get the stored result.
    pub fn get(&self, key: &K) -> Option<&V> {
        match self.data.get(key) {
            Some(value) => {
                self.hits.set(self.hits.get() + 1);
                Some(value)
            }
            None => {
                self.misses.set(self.misses.get() + 1);
                None
            }
        }
    }

    /// Mark `key` as being computed. Returns `false` if it already was.
    pub fn begin(&mut self, key: &K) -> bool {
        self.pending.insert(key.clone())
    }

    /// Drop the pending mark of a computation that failed.
    pub fn abandon(&mut self, key: &K) {
        self.pending.remove(key);
    }

    /// Insert a finished result, clearing its pending mark.
    pub fn insert(&mut self, key: K, value: V) {
        self.pending.remove(&key);
        self.data.insert(key, value);
    }
}
