mod composite;
mod locked_impl;
mod sync_map;
mod traits;

#[cfg(test)]
mod tests;

pub mod prelude {
    pub use super::composite::merge;
    pub use super::sync_map::{SyncBacking, SyncMap};
    pub use super::traits::*;
}

pub use composite::merge;
pub use locked_impl::LockedMap;
pub use sync_map::{SyncBacking, SyncMap};
