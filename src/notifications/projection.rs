//! Live read model over a recipient's notification stream.
//!
//! Subscribes to the store's pushed snapshots and derives
//! `{notifications, unread_count, loading}` for the UI. The projection
//! never mutates its own state optimistically: after a read-state
//! mutation it waits for the next authoritative snapshot.

use super::models::NotificationRecord;
use super::service::NotificationService;
use crate::session::Session;
use crate::store::{StoreError, SubscriptionHandle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::error;

/// Derived state for one recipient's notification feed.
///
/// `unread_count` is recomputed in full from every delivered snapshot
/// rather than maintained incrementally, so it can never drift from the
/// list it describes.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedState {
    pub notifications: Vec<NotificationRecord>,
    pub unread_count: usize,
    pub loading: bool,
}

impl FeedState {
    fn empty(loading: bool) -> Self {
        Self {
            notifications: Vec::new(),
            unread_count: 0,
            loading,
        }
    }
}

/// Reactive projection of a recipient's live notification feed.
///
/// Holds at most one active store subscription. Re-targeting to another
/// user tears the previous subscription down first, and a generation
/// counter discards any snapshot from a torn-down subscription that is
/// still in flight. Dropping the projection drops the subscription
/// handle, which guarantees teardown on every exit path.
pub struct NotificationProjection {
    service: Arc<NotificationService>,
    state_tx: Arc<watch::Sender<FeedState>>,
    user_id: Mutex<Option<String>>,
    subscription: Mutex<Option<SubscriptionHandle>>,
    generation: Arc<AtomicU64>,
}

impl NotificationProjection {
    /// Build the projection and subscribe for the session's user. Without
    /// an authenticated user this resolves immediately to an empty,
    /// non-loading feed and opens no subscription.
    pub fn new(service: Arc<NotificationService>, session: &Session) -> Self {
        let (state_tx, _) = watch::channel(FeedState::empty(true));
        let projection = Self {
            service,
            state_tx: Arc::new(state_tx),
            user_id: Mutex::new(None),
            subscription: Mutex::new(None),
            generation: Arc::new(AtomicU64::new(0)),
        };
        projection.set_user(session.user_id().map(str::to_string));
        projection
    }

    /// Watch the feed state. The receiver sees the current value
    /// immediately and every later change.
    pub fn watch(&self) -> watch::Receiver<FeedState> {
        self.state_tx.subscribe()
    }

    /// The current feed state.
    pub fn state(&self) -> FeedState {
        self.state_tx.borrow().clone()
    }

    /// Re-target the projection at another user (or none). Any prior
    /// subscription is torn down before the new one opens, so a single
    /// subscription is active at a time.
    pub fn set_user(&self, user_id: Option<String>) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(mut old) = self.subscription.lock().unwrap().take() {
            old.unsubscribe();
        }
        *self.user_id.lock().unwrap() = user_id.clone();

        let Some(user_id) = user_id else {
            self.state_tx.send_replace(FeedState::empty(false));
            return;
        };

        self.state_tx.send_replace(FeedState::empty(true));

        let current_generation = self.generation.clone();
        let state_tx = self.state_tx.clone();
        let result = self
            .service
            .subscribe_to_notifications(&user_id, move |records| {
                // A snapshot from a torn-down subscription may still land
                // here; the generation check drops it.
                if current_generation.load(Ordering::SeqCst) != generation {
                    return;
                }
                let unread_count = records.iter().filter(|n| !n.read).count();
                state_tx.send_replace(FeedState {
                    notifications: records,
                    unread_count,
                    loading: false,
                });
            });

        match result {
            Ok(handle) => {
                *self.subscription.lock().unwrap() = Some(handle);
            }
            Err(err) => {
                error!("Failed to subscribe to notifications for {}: {}", user_id, err);
                self.state_tx.send_replace(FeedState::empty(false));
            }
        }
    }

    /// Mark one notification read. State updates arrive through the next
    /// pushed snapshot, not from here.
    pub async fn mark_as_read(&self, notification_id: &str) -> Result<(), StoreError> {
        self.service.mark_as_read(notification_id).await
    }

    /// Mark everything read for the current user. A no-op without one.
    pub async fn mark_all_as_read(&self) -> Result<usize, StoreError> {
        let user_id = self.user_id.lock().unwrap().clone();
        match user_id {
            Some(user_id) => self.service.mark_all_as_read(&user_id).await,
            None => Ok(0),
        }
    }

    /// Tear down the live subscription. Safe to call repeatedly; also runs
    /// implicitly on drop.
    pub fn unsubscribe(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(mut handle) = self.subscription.lock().unwrap().take() {
            handle.unsubscribe();
        }
    }
}
