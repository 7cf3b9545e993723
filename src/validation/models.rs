//! Candidate input shapes and the validation result type.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

/// Outcome of validating a candidate object: one message per failed field.
///
/// All applicable checks run; violations are collected rather than
/// short-circuited, so a form can surface every problem at once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    errors: BTreeMap<&'static str, String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// The message recorded for a field, if any.
    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn errors(&self) -> &BTreeMap<&'static str, String> {
        &self.errors
    }

    pub(crate) fn insert(&mut self, field: &'static str, message: String) {
        self.errors.insert(field, message);
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, message) in &self.errors {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

/// Candidate account profile, for both signup and profile-edit call sites.
///
/// `password` is `Some` only at signup; edit flows leave it `None` and the
/// password checks are skipped entirely. It is never serialized.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDraft {
    pub full_name: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
}

/// Candidate post. The image may be an already-uploaded URL or a pending
/// local file; one of the two must be present.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub content: String,
    pub image_url: Option<String>,
    pub image_file: Option<ImageFileMeta>,
    pub location: Option<String>,
}

/// Metadata of an image file picked for upload. The bytes themselves go
/// to blob storage, which is outside this crate.
#[derive(Debug, Clone)]
pub struct ImageFileMeta {
    pub mime_type: String,
    pub size_bytes: u64,
}

/// Ad hoc rules for `validate_field`, for one-off checks outside the
/// structured validators.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldRules {
    pub label: Option<&'static str>,
    pub required: bool,
    pub min: Option<usize>,
    pub max: Option<usize>,
    pub pattern: Option<&'static Regex>,
}
