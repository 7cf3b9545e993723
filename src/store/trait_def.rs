//! Store trait definition.

use super::models::{
    Document, Fields, SnapshotCallback, StoreError, StoreQuery, SubscriptionHandle, WriteBatch,
};
use async_trait::async_trait;

/// Trait for document store backends.
///
/// Single-document writes are atomic on their own; multi-document writes
/// go through `commit`, which is all-or-nothing. Live subscriptions
/// deliver full result-set snapshots, starting with the current one, in
/// emission order and never concurrently for the same subscription.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    /// Create a document. Returns the store-assigned id.
    async fn add(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;

    /// Fetch a single document by id. Returns Ok(None) if it does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// One-shot read of every document matching the query.
    async fn query(&self, collection: &str, query: StoreQuery)
        -> Result<Vec<Document>, StoreError>;

    /// Open a live subscription on a query. The callback receives the
    /// current result set immediately, then a fresh snapshot whenever the
    /// result set changes. Dropping the handle tears the subscription down.
    fn subscribe(
        &self,
        collection: &str,
        query: StoreQuery,
        callback: SnapshotCallback,
    ) -> Result<SubscriptionHandle, StoreError>;

    /// Partially update an existing document; fields not named are untouched.
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError>;

    /// Apply a write batch atomically. A batch with any invalid target
    /// applies none of its operations.
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;

    /// Declare a uniqueness constraint on a field of a collection.
    /// Subsequent `add` calls that would duplicate an existing value fail
    /// with `StoreError::UniqueViolation`.
    async fn ensure_unique(&self, collection: &str, field: &str) -> Result<(), StoreError>;
}
