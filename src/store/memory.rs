//! In-memory store implementation with live subscriptions.
//!
//! Documents live in per-collection maps guarded by a single mutex.
//! Store-assigned ids are zero-padded sequence numbers, so the id
//! tiebreak used by ordered queries reproduces insertion order and stays
//! deterministic across runs.
//!
//! Snapshot delivery is serialized per subscription: mutations enqueue
//! snapshots while holding the data lock, then drain the queue after
//! releasing it. A subscription callback that re-enters the store piles
//! its snapshot onto the queue and the active drainer picks it up, so
//! callbacks never nest and never run concurrently for one subscription.

use super::models::{
    BatchOp, Direction, Document, Fields, Filter, SnapshotCallback, StoreError, StoreEvent,
    StoreQuery, SubscriptionHandle, WriteBatch,
};
use super::trait_def::Store;
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory document store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<String, Fields>>,
    unique_fields: HashMap<String, BTreeSet<String>>,
    subscriptions: Vec<Arc<Subscription>>,
    next_doc_id: u64,
}

struct Subscription {
    collection: String,
    query: StoreQuery,
    callback: SnapshotCallback,
    active: AtomicBool,
    pending: Mutex<VecDeque<StoreEvent>>,
    delivering: AtomicBool,
    last_result: Mutex<Option<Vec<Document>>>,
}

impl Subscription {
    /// Deliver queued events in order. Only one drainer runs at a time;
    /// anyone else who enqueues while a drain is active just leaves the
    /// event on the queue for the active drainer.
    fn drain(sub: &Arc<Subscription>) {
        loop {
            if sub.delivering.swap(true, Ordering::SeqCst) {
                return;
            }
            loop {
                let next = sub.pending.lock().unwrap().pop_front();
                match next {
                    Some(event) => {
                        if sub.active.load(Ordering::SeqCst) {
                            (sub.callback)(event);
                        }
                    }
                    None => break,
                }
            }
            sub.delivering.store(false, Ordering::SeqCst);
            // Events enqueued between the last pop and the flag reset
            // would otherwise be stranded.
            if sub.pending.lock().unwrap().is_empty() {
                return;
            }
        }
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn value_cmp(a: &Value, b: &Value) -> CmpOrdering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(CmpOrdering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn matches(fields: &Fields, filter: &Filter) -> bool {
    match filter {
        Filter::Eq(field, value) => fields.get(field) == Some(value),
        Filter::Lt(field, value) => match fields.get(field) {
            Some(actual) if rank(actual) == rank(value) => {
                value_cmp(actual, value) == CmpOrdering::Less
            }
            _ => false,
        },
    }
}

fn evaluate(
    collections: &HashMap<String, BTreeMap<String, Fields>>,
    collection: &str,
    query: &StoreQuery,
) -> Vec<Document> {
    let mut results: Vec<Document> = collections
        .get(collection)
        .map(|docs| {
            docs.iter()
                .filter(|(_, fields)| query.filters.iter().all(|f| matches(fields, f)))
                .map(|(id, fields)| Document {
                    id: id.clone(),
                    fields: fields.clone(),
                })
                .collect()
        })
        .unwrap_or_default();

    if let Some(order) = &query.order_by {
        results.sort_by(|a, b| {
            let ord = match (a.fields.get(&order.field), b.fields.get(&order.field)) {
                (Some(x), Some(y)) => value_cmp(x, y),
                (Some(_), None) => CmpOrdering::Greater,
                (None, Some(_)) => CmpOrdering::Less,
                (None, None) => CmpOrdering::Equal,
            };
            let by_field = match order.direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            };
            by_field.then_with(|| a.id.cmp(&b.id))
        });
    } else {
        results.sort_by(|a, b| a.id.cmp(&b.id));
    }

    if let Some(limit) = query.limit {
        results.truncate(limit);
    }
    results
}

impl Inner {
    fn check_unique(
        &self,
        collection: &str,
        candidate: &Fields,
        exclude_id: Option<&str>,
    ) -> Result<(), StoreError> {
        let Some(unique) = self.unique_fields.get(collection) else {
            return Ok(());
        };
        let docs = self.collections.get(collection);
        for field in unique {
            let Some(value) = candidate.get(field) else {
                continue;
            };
            let taken = docs.map_or(false, |docs| {
                docs.iter()
                    .filter(|(id, _)| Some(id.as_str()) != exclude_id)
                    .any(|(_, fields)| fields.get(field) == Some(value))
            });
            if taken {
                return Err(StoreError::UniqueViolation {
                    collection: collection.to_string(),
                    field: field.clone(),
                    value: display_value(value),
                });
            }
        }
        Ok(())
    }

    /// Recompute every live query on the touched collections and enqueue a
    /// snapshot for each whose result set changed. Inactive subscriptions
    /// are pruned here.
    fn collect_dirty(&mut self, touched: &HashSet<String>) -> Vec<Arc<Subscription>> {
        self.subscriptions
            .retain(|sub| sub.active.load(Ordering::SeqCst));

        let mut dirty = Vec::new();
        for sub in &self.subscriptions {
            if !touched.contains(&sub.collection) {
                continue;
            }
            let result = evaluate(&self.collections, &sub.collection, &sub.query);
            let mut last = sub.last_result.lock().unwrap();
            if last.as_ref() != Some(&result) {
                sub.pending
                    .lock()
                    .unwrap()
                    .push_back(StoreEvent::Snapshot(result.clone()));
                *last = Some(result);
                dirty.push(sub.clone());
            }
        }
        dirty
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn not_found(collection: &str, id: &str) -> StoreError {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn add(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let (id, dirty) = {
            let mut inner = self.inner.lock().unwrap();
            inner.check_unique(collection, &fields, None)?;
            inner.next_doc_id += 1;
            let id = format!("{:08}", inner.next_doc_id);
            inner
                .collections
                .entry(collection.to_string())
                .or_default()
                .insert(id.clone(), fields);
            let touched = HashSet::from([collection.to_string()]);
            (id, inner.collect_dirty(&touched))
        };
        for sub in dirty {
            Subscription::drain(&sub);
        }
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document {
                id: id.to_string(),
                fields: fields.clone(),
            }))
    }

    async fn query(
        &self,
        collection: &str,
        query: StoreQuery,
    ) -> Result<Vec<Document>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(evaluate(&inner.collections, collection, &query))
    }

    fn subscribe(
        &self,
        collection: &str,
        query: StoreQuery,
        callback: SnapshotCallback,
    ) -> Result<SubscriptionHandle, StoreError> {
        let sub = {
            let mut inner = self.inner.lock().unwrap();
            let initial = evaluate(&inner.collections, collection, &query);
            let sub = Arc::new(Subscription {
                collection: collection.to_string(),
                query,
                callback,
                active: AtomicBool::new(true),
                pending: Mutex::new(VecDeque::from([StoreEvent::Snapshot(initial.clone())])),
                delivering: AtomicBool::new(false),
                last_result: Mutex::new(Some(initial)),
            });
            inner.subscriptions.push(sub.clone());
            sub
        };

        Subscription::drain(&sub);

        let guard = sub.clone();
        Ok(SubscriptionHandle::new(move || {
            guard.active.store(false, Ordering::SeqCst);
        }))
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let dirty = {
            let mut inner = self.inner.lock().unwrap();
            let current = inner
                .collections
                .get(collection)
                .and_then(|docs| docs.get(id))
                .ok_or_else(|| Self::not_found(collection, id))?;

            let mut merged = current.clone();
            merged.extend(fields.clone());
            inner.check_unique(collection, &merged, Some(id))?;

            if let Some(doc) = inner
                .collections
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(id))
            {
                doc.extend(fields);
            }

            let touched = HashSet::from([collection.to_string()]);
            inner.collect_dirty(&touched)
        };
        for sub in dirty {
            Subscription::drain(&sub);
        }
        Ok(())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let dirty = {
            let mut inner = self.inner.lock().unwrap();

            // Validate the whole batch before touching anything.
            for op in &batch.ops {
                match op {
                    BatchOp::Update {
                        collection,
                        id,
                        fields,
                    } => {
                        let current = inner
                            .collections
                            .get(collection)
                            .and_then(|docs| docs.get(id))
                            .ok_or_else(|| Self::not_found(collection, id))?;
                        let mut merged = current.clone();
                        merged.extend(fields.clone());
                        inner.check_unique(collection, &merged, Some(id.as_str()))?;
                    }
                    BatchOp::Delete { collection, id } => {
                        let exists = inner
                            .collections
                            .get(collection)
                            .map_or(false, |docs| docs.contains_key(id));
                        if !exists {
                            return Err(Self::not_found(collection, id));
                        }
                    }
                }
            }

            let mut touched = HashSet::new();
            for op in batch.ops {
                match op {
                    BatchOp::Update {
                        collection,
                        id,
                        fields,
                    } => {
                        if let Some(doc) = inner
                            .collections
                            .get_mut(&collection)
                            .and_then(|docs| docs.get_mut(&id))
                        {
                            doc.extend(fields);
                        }
                        touched.insert(collection);
                    }
                    BatchOp::Delete { collection, id } => {
                        if let Some(docs) = inner.collections.get_mut(&collection) {
                            docs.remove(&id);
                        }
                        touched.insert(collection);
                    }
                }
            }
            inner.collect_dirty(&touched)
        };
        for sub in dirty {
            Subscription::drain(&sub);
        }
        Ok(())
    }

    async fn ensure_unique(&self, collection: &str, field: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(docs) = inner.collections.get(collection) {
            let mut seen = HashSet::new();
            for fields in docs.values() {
                if let Some(value) = fields.get(field) {
                    if !seen.insert(value.clone()) {
                        return Err(StoreError::UniqueViolation {
                            collection: collection.to_string(),
                            field: field.to_string(),
                            value: display_value(value),
                        });
                    }
                }
            }
        }
        inner
            .unique_fields
            .entry(collection.to_string())
            .or_default()
            .insert(field.to_string());
        Ok(())
    }
}
