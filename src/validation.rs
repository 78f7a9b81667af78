//! Input validation for caller-supplied contact parameters.
//!
//! The shape helpers (`is_valid_username` and friends) are exported for the
//! registration and profile layers; the contact service itself only checks
//! presence and length, since the peer identifier is free text matched
//! against several account fields.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]{3,32}$").expect("valid username regex"));
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+[1-9]\d{1,14}$").expect("valid phone regex"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Longest accepted peer identifier, in characters.
pub const MAX_IDENTIFIER_LEN: usize = 254;

/// Longest accepted request greeting, in characters.
pub const MAX_MESSAGE_LEN: usize = 1024;

/// Field-keyed validation failures, in the shape error payloads expect.
pub type FieldErrors = BTreeMap<String, String>;

/// Whether `s` is a well-formed login handle (3-32 word characters).
pub fn is_valid_username(s: &str) -> bool {
    USERNAME_RE.is_match(s)
}

/// Whether `s` is a well-formed E.164 phone number.
pub fn is_valid_phone(s: &str) -> bool {
    PHONE_RE.is_match(s)
}

/// Whether `s` looks like an e-mail address.
pub fn is_valid_email(s: &str) -> bool {
    EMAIL_RE.is_match(s)
}

/// Validate the free-text peer identifier of a contact request.
///
/// Only presence and length are checked here; whether the identifier
/// resolves to an account is the repository's concern.
///
/// # Errors
///
/// Returns field-keyed messages when the identifier is blank or too long.
pub fn validate_peer_identifier(identifier: &str) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if identifier.trim().is_empty() {
        errors.insert(
            "peer_identifier".to_owned(),
            "peer_identifier is required".to_owned(),
        );
    } else if identifier.chars().count() > MAX_IDENTIFIER_LEN {
        errors.insert(
            "peer_identifier".to_owned(),
            format!("peer_identifier must be at most {MAX_IDENTIFIER_LEN} characters"),
        );
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a request greeting.
///
/// # Errors
///
/// Returns field-keyed messages when the message exceeds the length cap.
pub fn validate_request_message(message: &str) -> Result<(), FieldErrors> {
    if message.chars().count() > MAX_MESSAGE_LEN {
        let mut errors = FieldErrors::new();
        errors.insert(
            "message".to_owned(),
            format!("message must be at most {MAX_MESSAGE_LEN} characters"),
        );
        return Err(errors);
    }
    Ok(())
}
