//! Field validation shared by every entity.
//!
//! Models declare their rules with `#[derive(Validate)]`; the custom rules
//! referenced from those derives live here, together with [`check`], which
//! turns a failed validation into a single descriptive [`CoreError`].

use std::sync::LazyLock;

use regex::Regex;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::CoreError;
use crate::types::EntityId;

/// Canonical textual UUID (8-4-4-4-12 hex digits).
pub static UUID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Fa-f0-9]{8}-([A-Fa-f0-9]{4}-){3}[A-Fa-f0-9]{12}$").expect("valid regex")
});

/// A single cron field: `*`, numbers, ranges, lists and steps.
static CRON_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\*|\d+(-\d+)?)(/\d+)?(,(\*|\d+(-\d+)?)(/\d+)?)*$").expect("valid regex")
});

/// Job states a client may report.
pub const JOB_STATUSES: &[&str] = &["pending", "running", "succeeded", "failed"];

/// `true` when `text` is a canonical UUID string.
pub fn is_canonical_uuid(text: &str) -> bool {
    UUID_PATTERN.is_match(text)
}

/// Parse a lookup key that must be an entity id.
pub fn parse_entity_id(text: &str) -> Option<EntityId> {
    if is_canonical_uuid(text) {
        text.parse().ok()
    } else {
        None
    }
}

/// Rejects the nil UUID: every stored entity carries a generated id.
pub fn non_nil_id(id: &EntityId) -> Result<(), ValidationError> {
    if id.is_nil() {
        return Err(rule("non_nil_id", "identifier must be a generated UUID"));
    }
    Ok(())
}

/// Rejects strings that are empty after trimming.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(rule("not_blank", "must not be empty"));
    }
    Ok(())
}

/// Accepts a five-field cron expression (`minute hour day month weekday`).
pub fn cron_schedule(value: &str) -> Result<(), ValidationError> {
    let fields: Vec<&str> = value.split_whitespace().collect();
    if fields.len() != 5 || !fields.iter().all(|f| CRON_FIELD.is_match(f)) {
        return Err(rule(
            "cron_schedule",
            "must be a five-field cron expression",
        ));
    }
    Ok(())
}

/// Accepts absolute POSIX paths, Windows drive paths and glob patterns
/// built on either.
pub fn path_pattern(value: &str) -> Result<(), ValidationError> {
    let bytes = value.as_bytes();
    let is_posix = value.starts_with('/');
    let is_windows = bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/');
    if !(is_posix || is_windows) {
        return Err(rule("path_pattern", "must be an absolute path or glob"));
    }
    if value.contains('\0') {
        return Err(rule("path_pattern", "must not contain NUL bytes"));
    }
    Ok(())
}

/// Accepts one of [`JOB_STATUSES`].
pub fn job_status(value: &str) -> Result<(), ValidationError> {
    if !JOB_STATUSES.contains(&value) {
        return Err(rule(
            "job_status",
            "must be one of pending, running, succeeded, failed",
        ));
    }
    Ok(())
}

fn rule(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

/// Render validation errors as `field:message` pairs sorted by field.
pub fn describe(errors: &ValidationErrors) -> String {
    let mut pairs: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter()
                .map(|err| {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string());
                    format!("{field}:{message}")
                })
                .collect::<Vec<_>>()
        })
        .collect();
    pairs.sort();
    pairs.join(", ")
}

/// Validate `value`, folding every field error into one message.
pub fn check<T: Validate>(value: &T) -> Result<(), CoreError> {
    check_except(value, &[])
}

/// Like [`check`], but ignores errors on `deferred` fields, which the caller
/// fills in afterwards and checks again.
pub fn check_except<T: Validate>(value: &T, deferred: &[&str]) -> Result<(), CoreError> {
    let Err(mut errors) = value.validate() else {
        return Ok(());
    };
    errors.errors_mut().retain(|field, _| !deferred.contains(field));
    if errors.is_empty() {
        return Ok(());
    }
    Err(CoreError::Validation(format!("Bad info: {}", describe(&errors))))
}
