//! Abstract document store.
//!
//! The durable store is an external collaborator: a queryable,
//! subscribable document database. This module defines the `Store` trait
//! the rest of the crate is written against, plus `MemoryStore`, a fully
//! functional in-memory implementation used in tests and for embedding.

mod memory;
mod models;
mod trait_def;

pub use memory::MemoryStore;
pub use models::{
    BatchOp, Direction, Document, Fields, Filter, OrderBy, SnapshotCallback, StoreError,
    StoreEvent, StoreQuery, SubscriptionHandle, WriteBatch,
};
pub use trait_def::Store;
