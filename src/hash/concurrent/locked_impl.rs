use alloc::boxed::Box;
use alloc::vec::Vec;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use core::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;
use hashbrown::DefaultHashBuilder;
use hashbrown::Equivalent;
use hashbrown::hash_table::{Entry, HashTable};
use spin::RwLock;

use super::traits::{ConditionalInsert, RawHashMap, ReadableInPlaceMap, TraversableMap};

// Must be a power of two.
const DEFAULT_SHARDS: usize = 32;

type Shard<K, V> = CachePadded<RwLock<HashTable<(K, V)>>>;

/// The default backing store of a `SyncMap`.
///
/// Keys are spread over a fixed set of shards by hash. Each shard is a
/// hashbrown table behind its own spin `RwLock`, and every single-key
/// operation holds exactly one shard lock while it runs.
pub struct LockedMap<K, V, S = DefaultHashBuilder> {
    shards: Box<[Shard<K, V>]>,
    entries: AtomicUsize,
    hasher: S,
}

impl<K, V, S: Default> LockedMap<K, V, S> {
    /// Create an empty store with the default number of shards.
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    /// Create an empty store with `shards` shards.
    ///
    /// # Panics
    /// Panics if `shards` is not a power of two
    pub fn with_shards(shards: usize) -> Self {
        Self::with_shards_and_hasher(shards, S::default())
    }
}

impl<K, V, S> LockedMap<K, V, S> {
    /// Create an empty store with `shards` shards hashing keys with `hasher`.
    ///
    /// # Panics
    /// Panics if `shards` is not a power of two
    pub fn with_shards_and_hasher(shards: usize, hasher: S) -> Self {
        assert!(
            shards.is_power_of_two(),
            "shard count must be a power of two, got {}",
            shards
        );
        let shards = (0..shards)
            .map(|_| CachePadded::new(RwLock::new(HashTable::new())))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            shards,
            entries: AtomicUsize::new(0),
            hasher,
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }
}

impl<K, V, S: BuildHasher> LockedMap<K, V, S> {
    #[inline]
    fn locate<Q: ?Sized + Hash>(&self, key: &Q) -> (u64, &Shard<K, V>) {
        let hash = self.hasher.hash_one(key);
        (hash, &self.shards[hash as usize & (self.shards.len() - 1)])
    }
}

impl<K, V, S: Default> Default for LockedMap<K, V, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> RawHashMap<K, V> for LockedMap<K, V, S>
where
    K: Hash + Eq + Send + Sync,
    V: Send + Sync,
    S: BuildHasher + Send + Sync,
{
    fn insert(&self, key: K, value: V) -> Option<V> {
        let (hash, shard) = self.locate(&key);
        let mut table = shard.write();
        match table.entry(hash, |(k, _)| *k == key, |(k, _)| self.hasher.hash_one(k)) {
            Entry::Occupied(mut slot) => Some(core::mem::replace(&mut slot.get_mut().1, value)),
            Entry::Vacant(slot) => {
                slot.insert((key, value));
                self.entries.fetch_add(1, Ordering::AcqRel);
                None
            }
        }
    }

    fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
    {
        let (hash, shard) = self.locate(key);
        let mut table = shard.write();
        let found = table.find_entry(hash, |(k, _)| key.equivalent(k)).ok()?;
        let ((_, value), _) = found.remove();
        self.entries.fetch_sub(1, Ordering::AcqRel);
        Some(value)
    }

    fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
    {
        let (hash, shard) = self.locate(key);
        shard.read().find(hash, |(k, _)| key.equivalent(k)).is_some()
    }

    fn len(&self) -> usize {
        self.entries.load(Ordering::Acquire)
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V, S> ReadableInPlaceMap<K, V> for LockedMap<K, V, S>
where
    K: Hash + Eq + Send + Sync,
    V: Send + Sync,
    S: BuildHasher + Send + Sync,
{
    /// `f` runs under the shard's read lock and should not block.
    fn view<Q, F, R>(&self, key: &Q, f: F) -> Option<R>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
        F: FnOnce(&K, &V) -> R,
    {
        let (hash, shard) = self.locate(key);
        let table = shard.read();
        let (k, v) = table.find(hash, |(k, _)| key.equivalent(k))?;
        Some(f(k, v))
    }
}

impl<K, V, S> ConditionalInsert<K, V> for LockedMap<K, V, S>
where
    K: Hash + Eq + Send + Sync,
    V: Send + Sync,
    S: BuildHasher + Send + Sync,
{
    /// Runs entirely under the shard's write lock, so `keep` is called at
    /// most once.
    fn insert_or_keep<F, R>(&self, key: K, value: V, keep: F) -> Option<R>
    where
        F: Fn(&V) -> Option<R>,
    {
        let (hash, shard) = self.locate(&key);
        let mut table = shard.write();
        match table.entry(hash, |(k, _)| *k == key, |(k, _)| self.hasher.hash_one(k)) {
            Entry::Occupied(mut slot) => {
                let current = &mut slot.get_mut().1;
                let kept = keep(current);
                if kept.is_none() {
                    *current = value;
                }
                kept
            }
            Entry::Vacant(slot) => {
                slot.insert((key, value));
                self.entries.fetch_add(1, Ordering::AcqRel);
                None
            }
        }
    }
}

impl<K, V, S> TraversableMap<K, V> for LockedMap<K, V, S>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
    S: BuildHasher + Send + Sync,
{
    /// Each shard is copied out under its read lock, and the lock is
    /// released before `f` sees any entry of that shard.
    fn for_each_entry<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        for shard in self.shards.iter() {
            let copied: Vec<(K, V)> = shard.read().iter().cloned().collect();
            if !copied.iter().all(|(k, v)| f(k, v)) {
                return;
            }
        }
    }
}
