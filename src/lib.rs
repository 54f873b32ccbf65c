//! Typed, thread-safe maps over sharded concurrent hash tables.
//!
//! [`SyncMap`] is a map that many threads can read and write at once without
//! external locking. It sits on a backing store that offers atomic single-key
//! operations (see [`hash::concurrent::prelude`]) and adds:
//!
//! - a typed accessor layer where an absent key and a stored nil marker
//!   (`None`) both read as "not found",
//! - lazy allocation, so an uninitialized map (for example one in a `static`)
//!   becomes usable on first use,
//! - composite operations (`clear`, `range`, `to_map`, `copy`, `transform`,
//!   [`merge`]) serialized against each other by a per-map lock.
//!
//! ```
//! use syncmap::{merge, SyncMap};
//!
//! let a: SyncMap<u32, String> = SyncMap::from_maps([[(1, "x".to_string()), (2, "y".to_string())]]);
//! let b: SyncMap<u32, String> = [(2, "z".to_string()), (3, "w".to_string())].into_iter().collect();
//!
//! let merged = merge(&a, &b);
//! assert_eq!(merged.get(&2), "z");
//!
//! let lengths = merged.transform(|k, v| (k.to_string(), v.len()));
//! assert_eq!(lengths.load("3"), Some(1));
//! ```
//!
//! The default backing store is the sharded [`LockedMap`]. Another store can
//! be plugged in through [`SyncMap::with_backing`] as long as it implements
//! [`SyncBacking`].
//!
//! [`LockedMap`]: hash::concurrent::LockedMap
//! [`SyncBacking`]: hash::concurrent::SyncBacking

extern crate alloc;

pub mod error;
pub mod hash;

pub use error::VisitFault;
pub use hash::concurrent::{merge, SyncMap};
