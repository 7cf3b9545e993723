//! Feed data models

use crate::session::SessionUser;
use crate::store::{Document, Fields};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use uuid::Uuid;

/// Post type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Text,
    Image,
}

/// A feed post. Likes are a set of user ids (deduplicated, unordered);
/// comments keep append order. Owner and creation timestamp are immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Store-assigned id; not part of the document fields.
    #[serde(skip)]
    pub id: String,
    pub user_id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: PostKind,
    pub image_url: Option<String>,
    #[serde(default)]
    pub likes: HashSet<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub location: Option<String>,
    pub timestamp: String,
}

impl Post {
    pub fn from_document(doc: &Document) -> Result<Self, serde_json::Error> {
        let mut post: Self = doc.decode()?;
        post.id = doc.id.clone();
        Ok(post)
    }

    pub(crate) fn to_fields(&self) -> Fields {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Fields::new(),
        }
    }
}

/// A comment on a post.
///
/// Author name and avatar are snapshots taken at comment time and drift
/// from the live profile by design. Ids are collision-resistant UUIDs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub text: String,
    pub user_id: String,
    pub user_name: String,
    pub user_avatar: Option<String>,
    pub timestamp: String,
}

impl Comment {
    pub fn new(author: &SessionUser, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            user_id: author.id.clone(),
            user_name: author.name.clone(),
            user_avatar: author.avatar.clone(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}
