//! Store data types: documents, queries, batches, subscription plumbing.

use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Field map of a stored document.
pub type Fields = serde_json::Map<String, Value>;

/// A document as returned by the store: the store-assigned id plus fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    /// Deserialize the fields into a typed value.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.fields.clone()))
    }
}

/// A single query filter on a document field.
///
/// Missing fields never match, for either operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals value.
    Eq(String, Value),
    /// Field is strictly less than value. Strings compare lexicographically,
    /// which makes this usable on ISO-8601 timestamp fields.
    Lt(String, Value),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Lt(field.into(), value.into())
    }
}

/// Sort direction for ordered queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Ordering clause for a query.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// A one-shot or live query: conjunctive filters, optional ordering, optional limit.
///
/// Result ordering is deterministic: ties on the ordering field (and
/// unordered queries) fall back to the store-assigned document id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreQuery {
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl StoreQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A single operation inside a write batch.
#[derive(Debug, Clone)]
pub enum BatchOp {
    Update {
        collection: String,
        id: String,
        fields: Fields,
    },
    Delete {
        collection: String,
        id: String,
    },
}

/// An atomic multi-write: either every operation applies or none does.
#[derive(Debug, Default)]
pub struct WriteBatch {
    pub(crate) ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a partial update of an existing document.
    pub fn update(&mut self, collection: impl Into<String>, id: impl Into<String>, fields: Fields) {
        self.ops.push(BatchOp::Update {
            collection: collection.into(),
            id: id.into(),
            fields,
        });
    }

    /// Queue a document deletion.
    pub fn delete(&mut self, collection: impl Into<String>, id: impl Into<String>) {
        self.ops.push(BatchOp::Delete {
            collection: collection.into(),
            id: id.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Errors surfaced by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("collection '{collection}' has no document '{id}'")]
    NotFound { collection: String, id: String },

    #[error("unique constraint on {collection}.{field} violated by value '{value}'")]
    UniqueViolation {
        collection: String,
        field: String,
        value: String,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// One delivery on a live subscription: a full result-set snapshot, or a
/// stream error. Stream errors leave the subscription in a terminal state;
/// reconnecting is the subscriber's decision.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    Snapshot(Vec<Document>),
    Error(String),
}

/// Callback invoked for every event on a live subscription.
pub type SnapshotCallback = Arc<dyn Fn(StoreEvent) + Send + Sync>;

/// Handle for an active live subscription.
///
/// `unsubscribe` is idempotent and also runs on drop, so teardown is
/// guaranteed regardless of how the subscriber exits. After teardown no
/// further callbacks are delivered, including events already queued.
pub struct SubscriptionHandle {
    teardown: Option<Box<dyn FnOnce() + Send>>,
}

impl SubscriptionHandle {
    pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    pub fn unsubscribe(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("active", &self.teardown.is_some())
            .finish()
    }
}
