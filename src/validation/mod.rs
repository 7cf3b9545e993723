//! Validation engine for user-submitted data.
//!
//! Pure, synchronous, side-effect-free. One validator per entity kind;
//! each returns a `ValidationReport` holding every violation found, keyed
//! by field. Validation failures stop an operation before any write is
//! attempted.

pub mod messages;
mod models;
pub mod rules;

pub use models::{FieldRules, ImageFileMeta, PostDraft, UserDraft, ValidationReport};

fn char_len(value: &str) -> usize {
    value.chars().count()
}

/// Validate an account profile draft.
///
/// Password checks run only when the draft carries a password, which is
/// what distinguishes the signup call site from profile edits.
pub fn validate_user(draft: &UserDraft) -> ValidationReport {
    let mut report = ValidationReport::default();

    if draft.full_name.trim().is_empty() {
        report.insert("fullName", messages::required(rules::FULL_NAME.label));
    } else if char_len(draft.full_name.trim()) < rules::FULL_NAME.min {
        report.insert(
            "fullName",
            messages::min_length(rules::FULL_NAME.label, rules::FULL_NAME.min),
        );
    } else if char_len(&draft.full_name) > rules::FULL_NAME.max {
        report.insert(
            "fullName",
            messages::max_length(rules::FULL_NAME.label, rules::FULL_NAME.max),
        );
    }

    if draft.username.trim().is_empty() {
        report.insert("username", messages::required(rules::USERNAME.label));
    } else if char_len(&draft.username) < rules::USERNAME.min {
        report.insert(
            "username",
            messages::min_length(rules::USERNAME.label, rules::USERNAME.min),
        );
    } else if char_len(&draft.username) > rules::USERNAME.max {
        report.insert(
            "username",
            messages::max_length(rules::USERNAME.label, rules::USERNAME.max),
        );
    } else if !rules::USERNAME_PATTERN.is_match(&draft.username) {
        report.insert("username", messages::INVALID_USERNAME.to_string());
    }

    if draft.email.trim().is_empty() {
        report.insert("email", messages::required(rules::EMAIL.label));
    } else if !rules::EMAIL_PATTERN.is_match(&draft.email) {
        report.insert("email", messages::INVALID_EMAIL.to_string());
    } else if char_len(&draft.email) > rules::EMAIL.max {
        report.insert(
            "email",
            messages::max_length(rules::EMAIL.label, rules::EMAIL.max),
        );
    }

    if let Some(password) = &draft.password {
        if password.is_empty() {
            report.insert("password", messages::required(rules::PASSWORD.label));
        } else if char_len(password) < rules::PASSWORD.min {
            report.insert(
                "password",
                messages::min_length(rules::PASSWORD.label, rules::PASSWORD.min),
            );
        } else if char_len(password) > rules::PASSWORD.max {
            report.insert(
                "password",
                messages::max_length(rules::PASSWORD.label, rules::PASSWORD.max),
            );
        }
    }

    if let Some(bio) = &draft.bio {
        if char_len(bio) > rules::BIO.max {
            report.insert("bio", messages::max_length(rules::BIO.label, rules::BIO.max));
        }
    }

    report
}

/// Validate a post draft.
///
/// An image is required on every post, independent of content. That is
/// the product rule as shipped; do not make it conditional.
pub fn validate_post(draft: &PostDraft) -> ValidationReport {
    let mut report = ValidationReport::default();

    if draft.content.trim().is_empty() {
        report.insert("content", messages::required(rules::POST_CONTENT.label));
    } else if char_len(&draft.content) > rules::POST_CONTENT.max {
        report.insert(
            "content",
            messages::max_length(rules::POST_CONTENT.label, rules::POST_CONTENT.max),
        );
    }

    let has_url = draft.image_url.as_deref().is_some_and(|url| !url.is_empty());
    if !has_url && draft.image_file.is_none() {
        report.insert("image", messages::IMAGE_REQUIRED.to_string());
    }

    report
}

/// Validate a comment body.
pub fn validate_comment(text: &str) -> ValidationReport {
    let mut report = ValidationReport::default();

    if text.trim().is_empty() {
        report.insert("text", messages::required(rules::COMMENT_TEXT.label));
    } else if char_len(text) > rules::COMMENT_TEXT.max {
        report.insert(
            "text",
            messages::max_length(rules::COMMENT_TEXT.label, rules::COMMENT_TEXT.max),
        );
    }

    report
}

/// Validate an image file's metadata before upload.
///
/// Avatars get a tighter size cap than post images. The two size checks
/// share the `size` slot, so an undersized result overwrites an oversized
/// one; the two can never trigger together in practice.
pub fn validate_image_file(file: Option<&ImageFileMeta>, is_avatar: bool) -> ValidationReport {
    let mut report = ValidationReport::default();

    let Some(file) = file else {
        report.insert("file", messages::required(rules::IMAGE_LABEL));
        return report;
    };

    if !rules::ALLOWED_IMAGE_TYPES.contains(&file.mime_type.as_str()) {
        let allowed: Vec<String> = rules::ALLOWED_IMAGE_TYPES
            .iter()
            .filter_map(|mime| mime.split('/').nth(1))
            .map(str::to_uppercase)
            .collect();
        report.insert("type", messages::invalid_file_type(&allowed));
    }

    let max_size = if is_avatar {
        rules::AVATAR_MAX_SIZE
    } else {
        rules::IMAGE_MAX_SIZE
    };

    if file.size_bytes > max_size {
        report.insert("size", messages::file_too_large(max_size));
    }
    if file.size_bytes < rules::IMAGE_MIN_SIZE {
        report.insert("size", messages::file_too_small(rules::IMAGE_MIN_SIZE));
    }

    report
}

/// Generic single-field check for ad hoc use. Returns the first violation
/// message, or `None` when the value passes.
pub fn validate_field(name: &str, value: &str, field_rules: &FieldRules) -> Option<String> {
    let label = field_rules.label.unwrap_or(name);

    if field_rules.required && value.trim().is_empty() {
        return Some(messages::required(label));
    }
    if let Some(min) = field_rules.min {
        if char_len(value) < min {
            return Some(messages::min_length(label, min));
        }
    }
    if let Some(max) = field_rules.max {
        if char_len(value) > max {
            return Some(messages::max_length(label, max));
        }
    }
    if let Some(pattern) = field_rules.pattern {
        if !pattern.is_match(value) {
            return Some(messages::invalid_format(label));
        }
    }
    None
}
