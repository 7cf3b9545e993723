//! Static admission rules for user-submitted data.
//!
//! These limits gate everything that enters the store: account profiles,
//! posts, comments and image uploads. Message text lives separately in
//! `messages` so it can be localized without touching the rules.

use lazy_static::lazy_static;
use regex::Regex;

/// Length bounds for a text field, with its user-facing label.
#[derive(Debug, Clone, Copy)]
pub struct LengthRule {
    pub label: &'static str,
    pub min: usize,
    pub max: usize,
}

pub const FULL_NAME: LengthRule = LengthRule {
    label: "Nome completo",
    min: 2,
    max: 100,
};

pub const USERNAME: LengthRule = LengthRule {
    label: "Nome de usuário",
    min: 3,
    max: 30,
};

pub const EMAIL: LengthRule = LengthRule {
    label: "Email",
    min: 5,
    max: 100,
};

pub const PASSWORD: LengthRule = LengthRule {
    label: "Senha",
    min: 6,
    max: 128,
};

pub const BIO: LengthRule = LengthRule {
    label: "Bio",
    min: 0,
    max: 500,
};

pub const POST_CONTENT: LengthRule = LengthRule {
    label: "Legenda",
    min: 1,
    max: 5000,
};

pub const COMMENT_TEXT: LengthRule = LengthRule {
    label: "Comentário",
    min: 1,
    max: 1000,
};

pub const IMAGE_LABEL: &str = "Imagem";

/// MIME types accepted for image uploads.
pub const ALLOWED_IMAGE_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/gif",
];

pub const IMAGE_MAX_SIZE: u64 = 5 * 1024 * 1024;
pub const AVATAR_MAX_SIZE: u64 = 2 * 1024 * 1024;
pub const IMAGE_MIN_SIZE: u64 = 10 * 1024;

lazy_static! {
    /// Letters, digits and underscore only.
    pub static ref USERNAME_PATTERN: Regex = Regex::new(r"^[a-zA-Z0-9_]+$").unwrap();

    /// Loose RFC-style shape: something@something.something, no whitespace.
    pub static ref EMAIL_PATTERN: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}
