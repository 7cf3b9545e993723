//! Notification data models

use crate::store::{Document, Fields};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Notification type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Like,
    Comment,
}

/// A notification targeted at one recipient.
///
/// Sender name and avatar are snapshots taken when the notification is
/// created; they are deliberately not kept in sync with later profile
/// changes. `read` only ever moves false → true. `created_at` is an
/// ISO-8601 UTC string and doubles as the ordering key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    /// Store-assigned id; not part of the document fields.
    #[serde(skip)]
    pub id: String,
    pub recipient_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_avatar: Option<String>,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub post_id: String,
    pub post_image: Option<String>,
    pub message: String,
    pub read: bool,
    pub created_at: String,
}

impl NotificationRecord {
    /// Rebuild a record from a stored document.
    pub fn from_document(doc: &Document) -> Result<Self, serde_json::Error> {
        let mut record: Self = doc.decode()?;
        record.id = doc.id.clone();
        Ok(record)
    }

    /// Serialize into document fields for a store write. The id stays out;
    /// the store assigns it.
    pub(crate) fn to_fields(&self) -> Fields {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Fields::new(),
        }
    }
}

/// Input for a like fan-out: who liked whose post.
#[derive(Debug, Clone)]
pub struct LikeEvent {
    pub post_owner_id: String,
    pub liker_id: String,
    pub liker_name: String,
    pub liker_avatar: Option<String>,
    pub post_id: String,
    pub post_image: Option<String>,
}

/// Input for a comment fan-out.
#[derive(Debug, Clone)]
pub struct CommentEvent {
    pub post_owner_id: String,
    pub commenter_id: String,
    pub commenter_name: String,
    pub commenter_avatar: Option<String>,
    pub post_id: String,
    pub comment_text: String,
    pub post_image: Option<String>,
}

/// Result of a create call. Acting on your own post is a successful no-op,
/// not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created { id: String },
    SkippedSelfAction,
}

impl CreateOutcome {
    pub fn skipped(&self) -> bool {
        matches!(self, CreateOutcome::SkippedSelfAction)
    }
}
