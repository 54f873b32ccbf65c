use core::borrow::Borrow;
use core::hash::Hash;

/// Single-key operations of a concurrent hash map.
///
/// Each call is atomic for the key it touches. Nothing here orders
/// operations on different keys.
pub trait RawHashMap<K, V>: Send + Sync {
    /// Store `value` under `key`.
    ///
    /// # Returns
    /// The value it replaced, if any
    fn insert(&self, key: K, value: V) -> Option<V>;

    /// Take the entry for `key` out of the map.
    ///
    /// # Returns
    /// The removed value, or `None` if the key was absent
    fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash;

    fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash;

    /// Number of entries. Only a hint while writers are active.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool;
}

/// Maps that can lend out an entry without copying it.
pub trait ReadableInPlaceMap<K, V>: RawHashMap<K, V> {
    /// Run `f` on the entry for `key`, if there is one.
    fn view<Q, F, R>(&self, key: &Q, f: F) -> Option<R>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
        F: FnOnce(&K, &V) -> R;
}

/// Maps with an atomic "keep what is there, or store this" step.
pub trait ConditionalInsert<K, V>: RawHashMap<K, V> {
    /// Ask `keep` about the current value of `key`. If it returns `Some`,
    /// the entry is left alone and that result comes back. Otherwise, or
    /// when the key is absent, `value` is stored and `None` is returned.
    ///
    /// `keep` must be free of side effects: implementations that retry
    /// may call it more than once.
    fn insert_or_keep<F, R>(&self, key: K, value: V, keep: F) -> Option<R>
    where
        F: Fn(&V) -> Option<R>;
}

/// Maps that can walk all of their entries.
pub trait TraversableMap<K, V>: RawHashMap<K, V> {
    /// Call `f` on entries until it returns `false`.
    ///
    /// `f` runs with no internal lock held and may use the single-key
    /// operations of the same map. A key is visited at most once. Entries
    /// added or removed during the walk may or may not be visited.
    fn for_each_entry<F>(&self, f: F)
    where
        F: FnMut(&K, &V) -> bool;
}
