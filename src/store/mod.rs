//! In-memory sample retention
//!
//! This module owns the fixed-capacity history of samples shared between the
//! sampling worker (writer) and the query layer (readers).
//!
//! # Components
//!
//! - [`RingStore`] - Multi-channel circular buffer with overwrite-on-full
//!   semantics
//! - [`SharedRing`] - The `Arc<RwLock<RingStore>>` handle passed between the
//!   worker and the query layer
//!
//! # Locking discipline
//!
//! The worker's `append` takes the write lock only for the slot/cursor
//! update; readers take the read lock for the duration of a traversal, so a
//! reader never observes a torn (cursor, count) pair across a wraparound.

pub mod ring;

pub use ring::RingStore;

use std::sync::{Arc, RwLock};

/// Shared handle to the ring store
pub type SharedRing = Arc<RwLock<RingStore>>;

/// Create a shared ring store handle
pub fn shared_ring(store: RingStore) -> SharedRing {
    Arc::new(RwLock::new(store))
}
