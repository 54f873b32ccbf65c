use alloc::boxed::Box;
use core::borrow::Borrow;
use core::hash::Hash;
use core::marker::PhantomData;
use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

use parking_lot::Mutex;
use tracing::trace;

use super::locked_impl::LockedMap;
use super::traits::{ConditionalInsert, RawHashMap, ReadableInPlaceMap, TraversableMap};

/// Serializes the first-use allocation of every `SyncMap` in the process.
///
/// Held only while a single map allocates its backing store; steady-state
/// operations never touch it.
static INIT_LOCK: spin::Mutex<()> = spin::Mutex::new(());

/// The operations a backing store must offer to carry a `SyncMap`.
///
/// The store holds `Option<V>` slots, where `None` is the nil marker.
pub trait SyncBacking<K, V>:
    ReadableInPlaceMap<K, Option<V>>
    + ConditionalInsert<K, Option<V>>
    + TraversableMap<K, Option<V>>
    + Default
{
}

impl<K, V, M> SyncBacking<K, V> for M where
    M: ReadableInPlaceMap<K, Option<V>>
        + ConditionalInsert<K, Option<V>>
        + TraversableMap<K, Option<V>>
        + Default
{
}

/// Everything a map allocates on first use.
pub(crate) struct Inner<M> {
    pub(crate) store: M,
    /// Serializes composite operations. Single-key operations never take it.
    pub(crate) composite: Mutex<()>,
}

impl<M> Inner<M> {
    fn new(store: M) -> Self {
        Self {
            store,
            composite: Mutex::new(()),
        }
    }
}

/// A typed, thread-safe map over a sharded concurrent backing store.
///
/// Single-key operations go straight to the backing store and rely on its
/// per-key atomicity. Composite operations (`clear`, `range` and everything
/// built on it) additionally hold a per-map lock, which serializes them
/// against each other but not against single-key operations.
///
/// A stored `None` (the nil marker) reads exactly like a missing key.
///
/// A map built with [`SyncMap::uninit`] or [`Default`] allocates nothing
/// until its first operation, so it can live in a `static`:
///
/// ```
/// use syncmap::SyncMap;
///
/// static SETTINGS: SyncMap<&'static str, u64> = SyncMap::uninit();
///
/// SETTINGS.store("timeout_ms", 5_000u64);
/// assert_eq!(SETTINGS.get("timeout_ms"), 5_000);
/// assert_eq!(SETTINGS.load("retries"), None);
/// ```
///
/// # Type Parameters
/// * `K` - The key type
/// * `V` - The value type
/// * `M` - The backing store, holding `Option<V>` slots
pub struct SyncMap<K, V, M = LockedMap<K, Option<V>>> {
    inner: AtomicPtr<Inner<M>>,
    _marker: PhantomData<(Box<Inner<M>>, fn() -> (K, V))>,
}

impl<K, V, M> SyncMap<K, V, M> {
    /// Create a map that allocates its backing store on first use.
    pub const fn uninit() -> Self {
        Self {
            inner: AtomicPtr::new(ptr::null_mut()),
            _marker: PhantomData,
        }
    }

    /// Check whether the backing store has been allocated.
    pub fn is_initialized(&self) -> bool {
        !self.inner.load(Ordering::Acquire).is_null()
    }
}

impl<K, V, M> SyncMap<K, V, M>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
    M: SyncBacking<K, V>,
{
    /// Create an initialized, empty map with a default backing store.
    pub fn new() -> Self {
        Self::with_backing(M::default())
    }

    /// Create an initialized map on top of an existing backing store.
    ///
    /// Use this to pick the shard count, capacity or hasher of the store.
    pub fn with_backing(store: M) -> Self {
        Self {
            inner: AtomicPtr::new(Box::into_raw(Box::new(Inner::new(store)))),
            _marker: PhantomData,
        }
    }

    /// Create an initialized map filled from a sequence of maps.
    ///
    /// Maps are applied in order, so on a key collision the later map wins.
    pub fn from_maps<I, T>(maps: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: IntoIterator<Item = (K, V)>,
    {
        let map = Self::new();
        for source in maps {
            for (key, value) in source {
                map.store(key, value);
            }
        }
        map
    }

    /// Get the allocated state, allocating it if this is the first use.
    pub(crate) fn inner(&self) -> &Inner<M> {
        let mut ptr = self.inner.load(Ordering::Acquire);
        if ptr.is_null() {
            let _guard = INIT_LOCK.lock();
            ptr = self.inner.load(Ordering::Acquire);
            if ptr.is_null() {
                trace!("allocating backing store on first use");
                ptr = Box::into_raw(Box::new(Inner::new(M::default())));
                self.inner.store(ptr, Ordering::Release);
            }
        }
        // SAFETY: a non-null pointer always comes from `Box::into_raw`, is
        // never replaced once published, and is only freed by `Drop`, which
        // cannot run while `&self` is alive.
        unsafe { &*ptr }
    }

    /// Load the value stored for a key.
    ///
    /// # Returns
    /// `None` if the key is absent or holds the nil marker
    pub fn load<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
    {
        self.inner().store.view(key, |_, slot| slot.clone()).flatten()
    }

    /// Get the value for a key, or `V::default()` if there is none.
    pub fn get<Q>(&self, key: &Q) -> V
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
        V: Default,
    {
        self.load(key).unwrap_or_default()
    }

    /// Get the value for a key, or the given default if there is none.
    ///
    /// Without a default, `V::default()` is returned.
    pub fn get_or_default<Q>(&self, key: &Q, default: Option<V>) -> V
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
        V: Default,
    {
        self.load(key).or(default).unwrap_or_default()
    }

    /// Remove a key, returning the value it held.
    ///
    /// # Returns
    /// `None` if the key was absent or held the nil marker
    pub fn load_and_delete<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
    {
        self.inner().store.remove(key).flatten()
    }

    /// Store a value for a key, overwriting any previous value.
    ///
    /// Passing `None` stores the nil marker, which reads as absent.
    pub fn store(&self, key: K, value: impl Into<Option<V>>) {
        self.inner().store.insert(key, value.into());
    }

    /// Return the existing value for a key, or store the given one.
    ///
    /// A slot holding the nil marker counts as vacant and is overwritten.
    ///
    /// # Returns
    /// `(existing, true)` if a value was present, `(value, false)` if
    /// `value` was stored
    pub fn load_or_store(&self, key: K, value: impl Into<Option<V>>) -> (Option<V>, bool) {
        let value = value.into();
        let supplied = value.clone();
        match self
            .inner()
            .store
            .insert_or_keep(key, value, |current| current.clone())
        {
            Some(existing) => (Some(existing), true),
            None => (supplied, false),
        }
    }

    /// Store a value for a key and return the previous one.
    ///
    /// # Returns
    /// The previous value, or `None` if the key was absent or held the
    /// nil marker
    pub fn swap(&self, key: K, value: impl Into<Option<V>>) -> Option<V> {
        self.inner().store.insert(key, value.into()).flatten()
    }

    /// Remove a key. Does nothing if the key is absent.
    pub fn delete<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
    {
        self.inner().store.remove(key);
    }
}

impl<K, V, M> Default for SyncMap<K, V, M> {
    fn default() -> Self {
        Self::uninit()
    }
}

impl<K, V, M> Drop for SyncMap<K, V, M> {
    fn drop(&mut self) {
        let ptr = *self.inner.get_mut();
        if !ptr.is_null() {
            // SAFETY: the pointer came from `Box::into_raw` and `&mut self`
            // guarantees no other reference to it exists.
            drop(unsafe { Box::from_raw(ptr) });
        }
    }
}

impl<K, V, M> FromIterator<(K, V)> for SyncMap<K, V, M>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
    M: SyncBacking<K, V>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_maps(core::iter::once(iter))
    }
}

impl<K, V, M> Extend<(K, V)> for SyncMap<K, V, M>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
    M: SyncBacking<K, V>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.store(key, value);
        }
    }
}
