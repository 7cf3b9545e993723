//! Notification service: fan-out on like/comment events and read-state
//! mutations against the store.
//!
//! Every operation converts store failures into error values at this
//! boundary; nothing here panics or leaks exceptions to callers.

use super::models::{CommentEvent, CreateOutcome, LikeEvent, NotificationRecord, NotificationType};
use crate::store::{
    Direction, Document, Filter, SnapshotCallback, Store, StoreError, StoreEvent, StoreQuery,
    SubscriptionHandle, WriteBatch,
};
use chrono::{Duration, SecondsFormat, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const COLLECTION: &str = "notifications";

/// Page size for one-shot reads when the caller does not specify one.
pub const DEFAULT_FETCH_LIMIT: usize = 20;

/// Cap on the live-subscribed list; older records stay reachable through
/// `fetch_notifications`.
pub const LIVE_FEED_LIMIT: usize = 30;

/// Retention horizon for the age-based cleanup sweep.
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Message fragment for like notifications.
pub const LIKE_MESSAGE: &str = "curtiu seu post";

const COMMENT_PREVIEW_MAX_CHARS: usize = 50;

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn comment_preview(text: &str) -> String {
    if text.chars().count() > COMMENT_PREVIEW_MAX_CHARS {
        let head: String = text.chars().take(COMMENT_PREVIEW_MAX_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

fn recipient_query(user_id: &str) -> StoreQuery {
    StoreQuery::new()
        .filter(Filter::eq("recipientId", user_id))
        .order_by("createdAt", Direction::Descending)
}

fn decode_records(docs: &[Document]) -> Vec<NotificationRecord> {
    docs.iter()
        .filter_map(|doc| match NotificationRecord::from_document(doc) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!("Skipping malformed notification document {}: {}", doc.id, err);
                None
            }
        })
        .collect()
}

/// Service for creating notifications and reconciling their read state.
pub struct NotificationService {
    store: Arc<dyn Store>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Record a like against someone's post. Liking your own post is a
    /// successful no-op and writes nothing.
    pub async fn create_like_notification(
        &self,
        event: LikeEvent,
    ) -> Result<CreateOutcome, StoreError> {
        if event.post_owner_id == event.liker_id {
            debug!("Suppressing self-like notification on post {}", event.post_id);
            return Ok(CreateOutcome::SkippedSelfAction);
        }

        let record = NotificationRecord {
            id: String::new(),
            recipient_id: event.post_owner_id,
            sender_id: event.liker_id,
            sender_name: event.liker_name,
            sender_avatar: event.liker_avatar,
            notification_type: NotificationType::Like,
            post_id: event.post_id,
            post_image: event.post_image,
            message: LIKE_MESSAGE.to_string(),
            read: false,
            created_at: now_timestamp(),
        };
        self.write_record(record).await
    }

    /// Record a comment on someone's post. The message carries a preview of
    /// the first 50 characters of the comment.
    pub async fn create_comment_notification(
        &self,
        event: CommentEvent,
    ) -> Result<CreateOutcome, StoreError> {
        if event.post_owner_id == event.commenter_id {
            debug!(
                "Suppressing self-comment notification on post {}",
                event.post_id
            );
            return Ok(CreateOutcome::SkippedSelfAction);
        }

        let record = NotificationRecord {
            id: String::new(),
            recipient_id: event.post_owner_id,
            sender_id: event.commenter_id,
            sender_name: event.commenter_name,
            sender_avatar: event.commenter_avatar,
            notification_type: NotificationType::Comment,
            post_id: event.post_id,
            post_image: event.post_image,
            message: format!("comentou: \"{}\"", comment_preview(&event.comment_text)),
            read: false,
            created_at: now_timestamp(),
        };
        self.write_record(record).await
    }

    async fn write_record(&self, record: NotificationRecord) -> Result<CreateOutcome, StoreError> {
        match self.store.add(COLLECTION, record.to_fields()).await {
            Ok(id) => Ok(CreateOutcome::Created { id }),
            Err(err) => {
                error!("Failed to create notification: {}", err);
                Err(err)
            }
        }
    }

    /// One-shot paged read of a recipient's notifications, newest first.
    pub async fn fetch_notifications(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        let query = recipient_query(user_id).limit(limit.unwrap_or(DEFAULT_FETCH_LIMIT));
        let docs = self.store.query(COLLECTION, query).await.map_err(|err| {
            error!("Failed to fetch notifications for {}: {}", user_id, err);
            err
        })?;
        Ok(decode_records(&docs))
    }

    /// Open a live subscription on a recipient's notifications, newest
    /// first, capped at the 30 most recent. The callback fires with the
    /// current list immediately and again on every change. Stream errors
    /// are logged and leave the subscription in a terminal state; callers
    /// wanting resilience must re-subscribe.
    pub fn subscribe_to_notifications(
        &self,
        user_id: &str,
        on_change: impl Fn(Vec<NotificationRecord>) + Send + Sync + 'static,
    ) -> Result<SubscriptionHandle, StoreError> {
        let query = recipient_query(user_id).limit(LIVE_FEED_LIMIT);
        let callback: SnapshotCallback = Arc::new(move |event| match event {
            StoreEvent::Snapshot(docs) => on_change(decode_records(&docs)),
            StoreEvent::Error(message) => {
                error!("Notification subscription error: {}", message);
            }
        });
        self.store.subscribe(COLLECTION, query, callback)
    }

    /// Flip one notification to read. Already-read records are untouched;
    /// repeating the call is not an error.
    pub async fn mark_as_read(&self, notification_id: &str) -> Result<(), StoreError> {
        let mut fields = serde_json::Map::new();
        fields.insert("read".to_string(), json!(true));
        self.store
            .update(COLLECTION, notification_id, fields)
            .await
            .map_err(|err| {
                error!("Failed to mark notification {} as read: {}", notification_id, err);
                err
            })
    }

    /// Flip every unread notification of a recipient to read in one atomic
    /// batch. With nothing unread, succeeds without issuing a write.
    /// Returns how many records were flipped.
    pub async fn mark_all_as_read(&self, user_id: &str) -> Result<usize, StoreError> {
        let query = StoreQuery::new()
            .filter(Filter::eq("recipientId", user_id))
            .filter(Filter::eq("read", false));
        let unread = self.store.query(COLLECTION, query).await.map_err(|err| {
            error!("Failed to query unread notifications for {}: {}", user_id, err);
            err
        })?;

        if unread.is_empty() {
            return Ok(0);
        }

        let mut batch = WriteBatch::new();
        for doc in &unread {
            let mut fields = serde_json::Map::new();
            fields.insert("read".to_string(), json!(true));
            batch.update(COLLECTION, doc.id.clone(), fields);
        }

        self.store.commit(batch).await.map_err(|err| {
            error!("Failed to mark all notifications read for {}: {}", user_id, err);
            err
        })?;
        Ok(unread.len())
    }

    /// Count of unread notifications, independent of any live subscription.
    pub async fn get_unread_count(&self, user_id: &str) -> Result<usize, StoreError> {
        let query = StoreQuery::new()
            .filter(Filter::eq("recipientId", user_id))
            .filter(Filter::eq("read", false));
        let unread = self.store.query(COLLECTION, query).await.map_err(|err| {
            error!("Failed to count unread notifications for {}: {}", user_id, err);
            err
        })?;
        Ok(unread.len())
    }

    /// Age-based retention sweep: batch-delete a recipient's notifications
    /// older than the horizon. Returns how many were deleted.
    pub async fn delete_old_notifications(
        &self,
        user_id: &str,
        days_old: Option<u32>,
    ) -> Result<usize, StoreError> {
        let days = days_old.unwrap_or(DEFAULT_RETENTION_DAYS);
        let cutoff = (Utc::now() - Duration::days(i64::from(days)))
            .to_rfc3339_opts(SecondsFormat::Millis, true);

        let query = StoreQuery::new()
            .filter(Filter::eq("recipientId", user_id))
            .filter(Filter::lt("createdAt", cutoff));
        let expired = self.store.query(COLLECTION, query).await.map_err(|err| {
            error!("Failed to query old notifications for {}: {}", user_id, err);
            err
        })?;

        if expired.is_empty() {
            return Ok(0);
        }

        let mut batch = WriteBatch::new();
        for doc in &expired {
            batch.delete(COLLECTION, doc.id.clone());
        }
        self.store.commit(batch).await.map_err(|err| {
            error!("Failed to delete old notifications for {}: {}", user_id, err);
            err
        })?;

        info!(
            "Deleted {} notifications older than {} days for user {}",
            expired.len(),
            days,
            user_id
        );
        Ok(expired.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Fields, MemoryStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn setup() -> (Arc<MemoryStore>, NotificationService) {
        let store = Arc::new(MemoryStore::new());
        let service = NotificationService::new(store.clone());
        (store, service)
    }

    fn like_event(owner: &str, liker: &str) -> LikeEvent {
        LikeEvent {
            post_owner_id: owner.to_string(),
            liker_id: liker.to_string(),
            liker_name: "Ana".to_string(),
            liker_avatar: Some("https://img.example/ana.jpg".to_string()),
            post_id: "post-1".to_string(),
            post_image: None,
        }
    }

    fn comment_event(owner: &str, commenter: &str, text: &str) -> CommentEvent {
        CommentEvent {
            post_owner_id: owner.to_string(),
            commenter_id: commenter.to_string(),
            commenter_name: "Bia".to_string(),
            commenter_avatar: None,
            post_id: "post-1".to_string(),
            comment_text: text.to_string(),
            post_image: None,
        }
    }

    /// Store wrapper that counts write operations.
    struct SpyStore {
        inner: Arc<MemoryStore>,
        writes: AtomicUsize,
    }

    impl SpyStore {
        fn new(inner: Arc<MemoryStore>) -> Self {
            Self {
                inner,
                writes: AtomicUsize::new(0),
            }
        }

        fn write_count(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Store for SpyStore {
        async fn add(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.add(collection, fields).await
        }

        async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
            self.inner.get(collection, id).await
        }

        async fn query(
            &self,
            collection: &str,
            query: StoreQuery,
        ) -> Result<Vec<Document>, StoreError> {
            self.inner.query(collection, query).await
        }

        fn subscribe(
            &self,
            collection: &str,
            query: StoreQuery,
            callback: SnapshotCallback,
        ) -> Result<SubscriptionHandle, StoreError> {
            self.inner.subscribe(collection, query, callback)
        }

        async fn update(
            &self,
            collection: &str,
            id: &str,
            fields: Fields,
        ) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.update(collection, id, fields).await
        }

        async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.commit(batch).await
        }

        async fn ensure_unique(&self, collection: &str, field: &str) -> Result<(), StoreError> {
            self.inner.ensure_unique(collection, field).await
        }
    }

    /// Store wrapper whose batch commits always fail without applying.
    struct FailingBatchStore {
        inner: Arc<MemoryStore>,
    }

    #[async_trait]
    impl Store for FailingBatchStore {
        async fn add(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
            self.inner.add(collection, fields).await
        }

        async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
            self.inner.get(collection, id).await
        }

        async fn query(
            &self,
            collection: &str,
            query: StoreQuery,
        ) -> Result<Vec<Document>, StoreError> {
            self.inner.query(collection, query).await
        }

        fn subscribe(
            &self,
            collection: &str,
            query: StoreQuery,
            callback: SnapshotCallback,
        ) -> Result<SubscriptionHandle, StoreError> {
            self.inner.subscribe(collection, query, callback)
        }

        async fn update(
            &self,
            collection: &str,
            id: &str,
            fields: Fields,
        ) -> Result<(), StoreError> {
            self.inner.update(collection, id, fields).await
        }

        async fn commit(&self, _batch: WriteBatch) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("batch commit refused".to_string()))
        }

        async fn ensure_unique(&self, collection: &str, field: &str) -> Result<(), StoreError> {
            self.inner.ensure_unique(collection, field).await
        }
    }

    #[tokio::test]
    async fn test_self_like_is_skipped() {
        let (store, service) = setup();
        let outcome = service
            .create_like_notification(like_event("user-1", "user-1"))
            .await
            .unwrap();
        assert!(outcome.skipped());

        let all = store.query(COLLECTION, StoreQuery::new()).await.unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_self_comment_is_skipped() {
        let (store, service) = setup();
        let outcome = service
            .create_comment_notification(comment_event("user-1", "user-1", "oi"))
            .await
            .unwrap();
        assert!(outcome.skipped());

        let all = store.query(COLLECTION, StoreQuery::new()).await.unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_like_creates_unread_record() {
        let (_, service) = setup();
        let outcome = service
            .create_like_notification(like_event("user-1", "user-2"))
            .await
            .unwrap();
        assert!(matches!(outcome, CreateOutcome::Created { .. }));

        let records = service.fetch_notifications("user-1", None).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].notification_type, NotificationType::Like);
        assert_eq!(records[0].message, "curtiu seu post");
        assert_eq!(records[0].sender_id, "user-2");
        assert!(!records[0].read);
    }

    #[tokio::test]
    async fn test_short_comment_message_is_verbatim() {
        let (_, service) = setup();
        service
            .create_comment_notification(comment_event("user-1", "user-2", "que foto linda"))
            .await
            .unwrap();

        let records = service.fetch_notifications("user-1", None).await.unwrap();
        assert_eq!(records[0].message, "comentou: \"que foto linda\"");
    }

    #[tokio::test]
    async fn test_long_comment_message_is_truncated() {
        let (_, service) = setup();
        let text = "a".repeat(51);
        service
            .create_comment_notification(comment_event("user-1", "user-2", &text))
            .await
            .unwrap();

        let records = service.fetch_notifications("user-1", None).await.unwrap();
        let expected = format!("comentou: \"{}...\"", "a".repeat(50));
        assert_eq!(records[0].message, expected);
    }

    #[tokio::test]
    async fn test_comment_of_exactly_fifty_chars_is_not_truncated() {
        let (_, service) = setup();
        let text = "b".repeat(50);
        service
            .create_comment_notification(comment_event("user-1", "user-2", &text))
            .await
            .unwrap();

        let records = service.fetch_notifications("user-1", None).await.unwrap();
        assert_eq!(records[0].message, format!("comentou: \"{}\"", text));
    }

    #[tokio::test]
    async fn test_fetch_orders_newest_first_and_respects_limit() {
        let (store, service) = setup();
        for day in 1..=5 {
            let record = NotificationRecord {
                id: String::new(),
                recipient_id: "user-1".to_string(),
                sender_id: "user-2".to_string(),
                sender_name: "Ana".to_string(),
                sender_avatar: None,
                notification_type: NotificationType::Like,
                post_id: format!("post-{}", day),
                post_image: None,
                message: LIKE_MESSAGE.to_string(),
                read: false,
                created_at: format!("2024-01-{:02}T12:00:00.000Z", day),
            };
            store.add(COLLECTION, record.to_fields()).await.unwrap();
        }

        let records = service
            .fetch_notifications("user-1", Some(3))
            .await
            .unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].post_id, "post-5");
        assert_eq!(records[2].post_id, "post-3");
    }

    #[tokio::test]
    async fn test_mark_as_read_is_idempotent() {
        let (_, service) = setup();
        let outcome = service
            .create_like_notification(like_event("user-1", "user-2"))
            .await
            .unwrap();
        let CreateOutcome::Created { id } = outcome else {
            panic!("expected a created record");
        };

        service.mark_as_read(&id).await.unwrap();
        service.mark_as_read(&id).await.unwrap();

        let records = service.fetch_notifications("user-1", None).await.unwrap();
        assert!(records[0].read);
    }

    #[tokio::test]
    async fn test_mark_all_as_read_flips_every_unread() {
        let (_, service) = setup();
        for _ in 0..3 {
            service
                .create_like_notification(like_event("user-1", "user-2"))
                .await
                .unwrap();
        }

        let flipped = service.mark_all_as_read("user-1").await.unwrap();
        assert_eq!(flipped, 3);
        assert_eq!(service.get_unread_count("user-1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_all_as_read_with_nothing_unread_issues_no_write() {
        let store = Arc::new(SpyStore::new(Arc::new(MemoryStore::new())));
        let service = NotificationService::new(store.clone());

        let flipped = service.mark_all_as_read("user-1").await.unwrap();
        assert_eq!(flipped, 0);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_mark_all_as_read_failed_batch_leaves_state_untouched() {
        let inner = Arc::new(MemoryStore::new());
        let seed = NotificationService::new(inner.clone());
        for _ in 0..3 {
            seed.create_like_notification(like_event("user-1", "user-2"))
                .await
                .unwrap();
        }

        let service = NotificationService::new(Arc::new(FailingBatchStore {
            inner: inner.clone(),
        }));
        let err = service.mark_all_as_read("user-1").await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        // All-or-nothing: no record flipped.
        assert_eq!(seed.get_unread_count("user-1").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_unread_count_tracks_reads() {
        let (_, service) = setup();
        for _ in 0..2 {
            service
                .create_like_notification(like_event("user-1", "user-2"))
                .await
                .unwrap();
        }
        assert_eq!(service.get_unread_count("user-1").await.unwrap(), 2);

        let records = service.fetch_notifications("user-1", None).await.unwrap();
        service.mark_as_read(&records[0].id).await.unwrap();
        assert_eq!(service.get_unread_count("user-1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_subscription_delivers_initial_and_live_snapshots() {
        let (_, service) = setup();
        let seen: Arc<std::sync::Mutex<Vec<Vec<NotificationRecord>>>> =
            Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();

        let _handle = service
            .subscribe_to_notifications("user-1", move |records| {
                sink.lock().unwrap().push(records);
            })
            .unwrap();

        assert_eq!(seen.lock().unwrap().len(), 1);
        assert!(seen.lock().unwrap()[0].is_empty());

        service
            .create_like_notification(like_event("user-1", "user-2"))
            .await
            .unwrap();

        let snapshots = seen.lock().unwrap();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[1].len(), 1);
        assert_eq!(snapshots[1][0].message, "curtiu seu post");
    }

    #[tokio::test]
    async fn test_subscription_ignores_other_recipients() {
        let (_, service) = setup();
        let seen: Arc<std::sync::Mutex<Vec<usize>>> = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();

        let _handle = service
            .subscribe_to_notifications("user-1", move |records| {
                sink.lock().unwrap().push(records.len());
            })
            .unwrap();

        service
            .create_like_notification(like_event("user-9", "user-2"))
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn test_comment_message_survives_round_trip() {
        let (_, service) = setup();
        let text = "adorei o enquadramento dessa foto, ficou incrível demais";
        service
            .create_comment_notification(comment_event("user-1", "user-2", text))
            .await
            .unwrap();

        let records = service.fetch_notifications("user-1", None).await.unwrap();
        let preview: String = text.chars().take(50).collect();
        assert_eq!(records[0].message, format!("comentou: \"{}...\"", preview));

        // A later read mutation must not touch the message.
        service.mark_as_read(&records[0].id).await.unwrap();
        let after = service.fetch_notifications("user-1", None).await.unwrap();
        assert_eq!(after[0].message, records[0].message);
    }

    #[tokio::test]
    async fn test_delete_old_notifications() {
        let (store, service) = setup();

        let mut old = NotificationRecord {
            id: String::new(),
            recipient_id: "user-1".to_string(),
            sender_id: "user-2".to_string(),
            sender_name: "Ana".to_string(),
            sender_avatar: None,
            notification_type: NotificationType::Like,
            post_id: "post-old".to_string(),
            post_image: None,
            message: LIKE_MESSAGE.to_string(),
            read: true,
            created_at: (Utc::now() - Duration::days(45))
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        store.add(COLLECTION, old.to_fields()).await.unwrap();
        old.post_id = "post-older".to_string();
        store.add(COLLECTION, old.to_fields()).await.unwrap();

        service
            .create_like_notification(like_event("user-1", "user-2"))
            .await
            .unwrap();

        let deleted = service
            .delete_old_notifications("user-1", None)
            .await
            .unwrap();
        assert_eq!(deleted, 2);

        let remaining = service.fetch_notifications("user-1", None).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].post_id, "post-1");
    }

    #[tokio::test]
    async fn test_delete_old_notifications_with_nothing_expired() {
        let (_, service) = setup();
        service
            .create_like_notification(like_event("user-1", "user-2"))
            .await
            .unwrap();

        let deleted = service
            .delete_old_notifications("user-1", Some(30))
            .await
            .unwrap();
        assert_eq!(deleted, 0);
    }
}
