//! Feed actions: create posts, like, comment.
//!
//! Every mutation is gated by the validation engine before anything is
//! written. Likes and comments fan out a notification to the post owner
//! as a side effect; a failed fan-out is logged and does not undo the
//! action itself.

use super::models::{Comment, Post, PostKind};
use crate::notifications::{CommentEvent, LikeEvent, NotificationService};
use crate::session::Session;
use crate::store::{Store, StoreError};
use crate::validation::{validate_comment, validate_post, PostDraft, ValidationReport};
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

const POSTS_COLLECTION: &str = "posts";

/// Errors from feed operations.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("invalid input: {0}")]
    Invalid(ValidationReport),

    #[error("post not found: {0}")]
    PostNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Service for post, like and comment flows.
pub struct FeedService {
    store: Arc<dyn Store>,
    notifications: Arc<NotificationService>,
}

impl FeedService {
    pub fn new(store: Arc<dyn Store>, notifications: Arc<NotificationService>) -> Self {
        Self {
            store,
            notifications,
        }
    }

    async fn load_post(&self, post_id: &str) -> Result<Post, FeedError> {
        let doc = self
            .store
            .get(POSTS_COLLECTION, post_id)
            .await?
            .ok_or_else(|| FeedError::PostNotFound(post_id.to_string()))?;
        Post::from_document(&doc)
            .map_err(|err| FeedError::Store(StoreError::Other(anyhow::anyhow!(err))))
    }

    /// Create a post for the session user. Validation failures stop the
    /// operation before any write; returns the new post's id.
    pub async fn create_post(
        &self,
        session: &Session,
        draft: PostDraft,
    ) -> Result<String, FeedError> {
        let user = session.current_user().ok_or(FeedError::NotAuthenticated)?;

        let report = validate_post(&draft);
        if !report.is_valid() {
            return Err(FeedError::Invalid(report));
        }

        let post = Post {
            id: String::new(),
            user_id: user.id.clone(),
            content: draft.content,
            kind: PostKind::Image,
            image_url: draft.image_url,
            likes: Default::default(),
            comments: Vec::new(),
            location: draft.location,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        let id = self.store.add(POSTS_COLLECTION, post.to_fields()).await?;
        Ok(id)
    }

    /// Like a post. Liking something already liked is a no-op; a fresh
    /// like updates the post's like set and notifies the owner.
    pub async fn like_post(&self, session: &Session, post_id: &str) -> Result<(), FeedError> {
        let user = session
            .current_user()
            .ok_or(FeedError::NotAuthenticated)?
            .clone();
        let mut post = self.load_post(post_id).await?;

        if !post.likes.insert(user.id.clone()) {
            return Ok(());
        }

        let mut fields = serde_json::Map::new();
        fields.insert("likes".to_string(), json!(post.likes));
        self.store.update(POSTS_COLLECTION, post_id, fields).await?;

        let fan_out = self
            .notifications
            .create_like_notification(LikeEvent {
                post_owner_id: post.user_id,
                liker_id: user.id,
                liker_name: user.name,
                liker_avatar: user.avatar,
                post_id: post_id.to_string(),
                post_image: post.image_url,
            })
            .await;
        if let Err(err) = fan_out {
            warn!("Like recorded but notification fan-out failed: {}", err);
        }

        Ok(())
    }

    /// Append a comment to a post and notify the owner. The comment text
    /// goes through the validation engine first.
    pub async fn add_comment(
        &self,
        session: &Session,
        post_id: &str,
        text: &str,
    ) -> Result<Comment, FeedError> {
        let user = session
            .current_user()
            .ok_or(FeedError::NotAuthenticated)?
            .clone();

        let report = validate_comment(text);
        if !report.is_valid() {
            return Err(FeedError::Invalid(report));
        }

        let mut post = self.load_post(post_id).await?;
        let comment = Comment::new(&user, text);
        post.comments.push(comment.clone());

        let mut fields = serde_json::Map::new();
        fields.insert("comments".to_string(), json!(post.comments));
        self.store.update(POSTS_COLLECTION, post_id, fields).await?;

        let fan_out = self
            .notifications
            .create_comment_notification(CommentEvent {
                post_owner_id: post.user_id,
                commenter_id: user.id,
                commenter_name: user.name,
                commenter_avatar: user.avatar,
                post_id: post_id.to_string(),
                comment_text: text.to_string(),
                post_image: post.image_url,
            })
            .await;
        if let Err(err) = fan_out {
            warn!("Comment recorded but notification fan-out failed: {}", err);
        }

        Ok(comment)
    }
}
