//! Profile registration and edits.
//!
//! Username uniqueness is enforced by a store-side constraint rather
//! than a pre-check query, so concurrent signups cannot race past each
//! other. Passwords never reach the store from here; credential handling
//! belongs to the identity provider.

use crate::store::{Fields, Store, StoreError};
use crate::validation::{messages, rules, validate_user, UserDraft, ValidationReport};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

const USERS_COLLECTION: &str = "users";

/// Errors from profile operations.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("invalid profile: {0}")]
    Invalid(ValidationReport),

    #[error("username '{0}' is already taken")]
    UsernameTaken(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Service for account profile writes.
pub struct ProfileService {
    store: Arc<dyn Store>,
}

fn draft_fields(draft: &UserDraft) -> Fields {
    match serde_json::to_value(draft) {
        Ok(Value::Object(map)) => map,
        _ => Fields::new(),
    }
}

fn map_username_conflict(err: StoreError) -> ProfileError {
    match err {
        StoreError::UniqueViolation { field, value, .. } if field == "username" => {
            ProfileError::UsernameTaken(value)
        }
        other => ProfileError::Store(other),
    }
}

impl ProfileService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Create an account profile. The draft must carry a password; the
    /// full validation report is returned on any rule violation, before
    /// anything is written.
    pub async fn register(&self, draft: UserDraft) -> Result<String, ProfileError> {
        let mut report = validate_user(&draft);
        if draft.password.is_none() {
            report.insert("password", messages::required(rules::PASSWORD.label));
        }
        if !report.is_valid() {
            return Err(ProfileError::Invalid(report));
        }

        self.store
            .ensure_unique(USERS_COLLECTION, "username")
            .await?;

        let id = self
            .store
            .add(USERS_COLLECTION, draft_fields(&draft))
            .await
            .map_err(map_username_conflict)?;

        info!("Registered profile {} for username {}", id, draft.username);
        Ok(id)
    }

    /// Edit an existing profile. The password checks are skipped — this
    /// call site never carries one.
    pub async fn update_profile(
        &self,
        user_id: &str,
        mut draft: UserDraft,
    ) -> Result<(), ProfileError> {
        draft.password = None;

        let report = validate_user(&draft);
        if !report.is_valid() {
            return Err(ProfileError::Invalid(report));
        }

        self.store
            .ensure_unique(USERS_COLLECTION, "username")
            .await?;

        self.store
            .update(USERS_COLLECTION, user_id, draft_fields(&draft))
            .await
            .map_err(map_username_conflict)
    }
}
