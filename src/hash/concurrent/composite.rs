//! Operations that touch the whole map.
//!
//! Every operation here holds the map's composite lock for its full
//! duration. Single-key operations keep running concurrently, so a traversal
//! is not a snapshot: each key is seen at most once, possibly with a stale
//! value, and entries written meanwhile may or may not show up.

use core::hash::Hash;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error};

use crate::error::VisitFault;

use super::sync_map::{SyncBacking, SyncMap};
use super::traits::{RawHashMap, TraversableMap};

impl<K, V, M> SyncMap<K, V, M>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
    M: SyncBacking<K, V>,
{
    /// Remove every entry. The map stays initialized and usable.
    ///
    /// Entries stored concurrently with a `clear` may or may not survive it.
    pub fn clear(&self) {
        let inner = self.inner();
        let _guard = inner.composite.lock();
        inner.store.for_each_entry(|key, _| {
            inner.store.remove(key);
            true
        });
    }

    /// Call `f` for each entry until it returns `false`.
    ///
    /// A panic inside `f` is caught and logged as an `error` event, and the
    /// traversal continues with the next entry. The process panic hook still
    /// runs first, so with the default hook the panic message also shows up
    /// on stderr. Entries holding the nil marker are skipped with a `debug`
    /// event.
    ///
    /// `f` may call single-key operations on this map, but calling a
    /// composite operation on this map from inside `f` deadlocks.
    pub fn range<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        let inner = self.inner();
        let _guard = inner.composite.lock();
        inner.store.for_each_entry(|key, slot| {
            let Some(value) = slot else {
                debug!("range skipped an entry holding the nil marker");
                return true;
            };
            match panic::catch_unwind(AssertUnwindSafe(|| f(key, value))) {
                Ok(proceed) => proceed,
                Err(payload) => {
                    let fault = VisitFault::from_panic(payload.as_ref());
                    error!(error = %fault, "range recovered from a visitor fault");
                    true
                }
            }
        });
    }

    /// Copy every entry into a standard `HashMap`.
    pub fn to_map(&self) -> HashMap<K, V> {
        let mut out = HashMap::new();
        self.range(|key, value| {
            out.insert(key.clone(), value.clone());
            true
        });
        out
    }

    /// Create a new map holding a copy of every entry.
    pub fn copy(&self) -> Self {
        let out = Self::new();
        self.range(|key, value| {
            out.store(key.clone(), value.clone());
            true
        });
        out
    }

    /// Create a new map by applying `f` to every entry.
    ///
    /// If `f` maps two entries to the same key, whichever is visited last
    /// wins. Visiting order is unspecified.
    pub fn transform<K2, V2, F>(&self, mut f: F) -> SyncMap<K2, V2>
    where
        K2: Hash + Eq + Clone + Send + Sync,
        V2: Clone + Send + Sync,
        F: FnMut(&K, &V) -> (K2, V2),
    {
        let out = SyncMap::new();
        self.range(|key, value| {
            let (new_key, new_value) = f(key, value);
            out.store(new_key, new_value);
            true
        });
        out
    }
}

/// Create a new map holding every entry of `a` overlaid with every entry of `b`.
///
/// On a key collision the value from `b` wins. The two passes are each
/// serialized against other composite operations on their source, but not
/// against each other.
pub fn merge<K, V, M>(a: &SyncMap<K, V, M>, b: &SyncMap<K, V, M>) -> SyncMap<K, V, M>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
    M: SyncBacking<K, V>,
{
    let out = SyncMap::new();
    for source in [a, b] {
        source.range(|key, value| {
            out.store(key.clone(), value.clone());
            true
        });
    }
    out
}
