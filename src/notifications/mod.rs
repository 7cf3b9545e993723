//! User notifications module

mod models;
mod projection;
mod service;

pub use models::{CommentEvent, CreateOutcome, LikeEvent, NotificationRecord, NotificationType};
pub use projection::{FeedState, NotificationProjection};
pub use service::{
    NotificationService, DEFAULT_FETCH_LIMIT, DEFAULT_RETENTION_DAYS, LIKE_MESSAGE,
    LIVE_FEED_LIMIT,
};
