//! Explicit session state.
//!
//! The identity provider hands out opaque, stable user ids; this crate
//! never inspects them. A `Session` is constructed by the embedding
//! application and passed by reference to the components that need it —
//! there is no process-wide singleton.

/// The authenticated user, with the denormalized display fields that get
/// snapshotted into notifications and comments at event time.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub avatar: Option<String>,
}

/// Authentication state for one client session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    user: Option<SessionUser>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user: SessionUser) -> Self {
        Self { user: Some(user) }
    }

    pub fn current_user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.id.as_str())
    }

    pub fn sign_in(&mut self, user: SessionUser) {
        self.user = Some(user);
    }

    pub fn sign_out(&mut self) {
        self.user = None;
    }
}
