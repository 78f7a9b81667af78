//! Contact relationship management: requests, contacts, blocks.
//!
//! [`ContactsService`] owns the business rules; persistence goes through
//! the [`ContactRepository`](crate::storage::ContactRepository) trait, so
//! the same rules run unchanged over SQLite and the in-memory store.

pub mod service;

pub use service::ContactsService;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::RepoError;
use crate::validation::FieldErrors;

/// Errors from the contact subsystem.
///
/// Each variant maps to a stable machine-readable code via
/// [`ContactsError::code`]; transports key their status mapping off the
/// code, never the message text.
#[derive(Debug, Error)]
pub enum ContactsError {
    /// Caller-supplied parameters failed validation.
    #[error("invalid contact parameters")]
    Validation {
        /// Field-keyed failure messages.
        errors: FieldErrors,
    },

    /// The peer identifier resolved to no account.
    #[error("user not found")]
    UserNotFound,

    /// A user tried to add themself.
    #[error("cannot add yourself as a contact")]
    SelfContact,

    /// The resolved peer has blocked the requester.
    #[error("this user has blocked you")]
    Blocked,

    /// The acting user is not the addressee of the request.
    #[error("not authorized to {action} this request")]
    NotAddressee {
        /// The decision that was attempted.
        action: &'static str,
    },

    /// The request has already been decided.
    #[error("request is not pending")]
    NotPending,

    /// The request does not exist.
    #[error("contact request not found")]
    RequestNotFound,

    /// The storage backend failed.
    #[error(transparent)]
    Storage(#[from] RepoError),
}

impl ContactsError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::SelfContact => "SELF_CONTACT_FORBIDDEN",
            Self::Blocked => "YOU_ARE_BLOCKED",
            Self::NotAddressee { .. } => "FORBIDDEN",
            Self::NotPending => "REQUEST_NOT_PENDING",
            Self::RequestNotFound => "NOT_FOUND",
            Self::Storage(_) => "INTERNAL_ERROR",
        }
    }

    /// Serialize into the wire payload, optionally tagging a trace id.
    pub fn to_body(&self, trace_id: Option<String>) -> ErrorBody {
        ErrorBody {
            error_code: self.code().to_owned(),
            message: self.to_string(),
            details: match self {
                Self::Validation { errors } => Some(errors.clone()),
                _ => None,
            },
            trace_id,
        }
    }
}

/// Transport-ready error payload.
///
/// The shape the HTTP layer serializes for failed contact operations:
/// stable code, human message, optional field details, optional trace id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable machine-readable code.
    pub error_code: String,
    /// Human-readable message.
    pub message: String,
    /// Field-keyed details for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<FieldErrors>,
    /// Correlation id of the failing request, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}
