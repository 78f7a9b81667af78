//! Domain entities and state machines for the contact graph.
//!
//! Everything here is storage-agnostic: identifiers are UUIDv7, timestamps
//! are UTC, and enum values carry their stored string form via `as_str`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Errors raised when domain values fail to parse.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A stored enum column held a value outside the known set.
    #[error("unknown {field} value: {value:?}")]
    UnknownVariant {
        /// Which field contained the bad value.
        field: &'static str,
        /// The unexpected value.
        value: String,
    },
}

/// A messenger account, as visible to the contact subsystem.
///
/// Accounts are owned by the account subsystem; this crate only resolves
/// them by identifier and references their ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: Uuid,
    /// Login handle, if set.
    pub username: Option<String>,
    /// E-mail address, if set.
    pub email: Option<String>,
    /// E.164 phone number, if set.
    pub phone: Option<String>,
    /// Account lifecycle status.
    pub status: UserStatus,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last modified.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build an active account with a new id and current timestamps.
    pub fn new(username: Option<String>, email: Option<String>, phone: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            username,
            email,
            phone,
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A directional request from one user to become another user's contact.
///
/// Requests start `pending` and move to `accepted` or `rejected` exactly
/// once; terminal rows are never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactRequest {
    /// Unique identifier.
    pub id: Uuid,
    /// The requesting user.
    pub from_user: Uuid,
    /// The addressee; only this user may accept or reject.
    pub to_user: Uuid,
    /// Current lifecycle state.
    pub state: RequestState,
    /// Optional greeting shown to the addressee.
    pub message: Option<String>,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
    /// When the request last changed state.
    pub updated_at: DateTime<Utc>,
}

impl ContactRequest {
    /// Build a fresh pending request with a new id and current timestamps.
    pub fn new_pending(from_user: Uuid, to_user: Uuid, message: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            from_user,
            to_user,
            state: RequestState::Pending,
            message,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One direction of an established contact relationship.
///
/// A mutual relationship is two rows, `(owner, peer)` and `(peer, owner)`,
/// each independently deletable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    /// Unique identifier of this directional row.
    pub id: Uuid,
    /// The user whose contact list this row belongs to.
    pub owner_id: Uuid,
    /// The user appearing in that list.
    pub peer_id: Uuid,
    /// List-entry state; rows materialized by acceptance are `accepted`.
    pub state: ContactState,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last modified.
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    /// Build an accepted directional row with a new id and current timestamps.
    pub fn new_accepted(owner_id: Uuid, peer_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            owner_id,
            peer_id,
            state: ContactState::Accepted,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A unilateral block: `owner` refuses contact requests from `target`.
///
/// Blocking is directional and invisible to the blocked side except through
/// the rejection of their requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// The blocking user.
    pub owner_id: Uuid,
    /// The blocked user.
    pub target_id: Uuid,
    /// Optional operator- or user-supplied reason; never set by this crate.
    pub reason: Option<String>,
    /// When the block was created.
    pub created_at: DateTime<Utc>,
}

impl Block {
    /// Build a block row with the current timestamp and no reason.
    pub fn new(owner_id: Uuid, target_id: Uuid) -> Self {
        Self {
            owner_id,
            target_id,
            reason: None,
            created_at: Utc::now(),
        }
    }
}

/// Lifecycle state of a contact request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    /// Awaiting a decision by the addressee.
    Pending,
    /// Addressee accepted; contacts were materialized.
    Accepted,
    /// Addressee rejected.
    Rejected,
}

impl RequestState {
    /// Returns the stored string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    /// Parse a stored string into a request state.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownVariant`] if the string is unrecognized.
    pub fn parse(s: &str) -> Result<Self, ModelError> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            other => Err(ModelError::UnknownVariant {
                field: "request_state",
                value: other.to_owned(),
            }),
        }
    }

    /// Whether this state admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }

    /// Check if transitioning to `target` is valid.
    pub fn can_transition_to(&self, target: RequestState) -> bool {
        matches!(
            (self, target),
            (Self::Pending, RequestState::Accepted) | (Self::Pending, RequestState::Rejected)
        )
    }
}

/// State of a contact-list row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactState {
    /// Visible but not yet confirmed; unused by acceptance, legal as a filter.
    Pending,
    /// Established contact.
    Accepted,
    /// Hidden by a block; legal as a filter value.
    Blocked,
}

impl ContactState {
    /// Returns the stored string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Blocked => "blocked",
        }
    }

    /// Parse a stored string into a contact state.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownVariant`] if the string is unrecognized.
    pub fn parse(s: &str) -> Result<Self, ModelError> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "blocked" => Ok(Self::Blocked),
            other => Err(ModelError::UnknownVariant {
                field: "contact_state",
                value: other.to_owned(),
            }),
        }
    }
}

/// Lifecycle status of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    /// Normal account.
    Active,
    /// Deactivated but recoverable.
    Inactive,
    /// Tombstoned; identifier resolution still returns these rows.
    Deleted,
}

impl UserStatus {
    /// Returns the stored string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Deleted => "deleted",
        }
    }

    /// Parse a stored string into a user status.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownVariant`] if the string is unrecognized.
    pub fn parse(s: &str) -> Result<Self, ModelError> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "deleted" => Ok(Self::Deleted),
            other => Err(ModelError::UnknownVariant {
                field: "user_status",
                value: other.to_owned(),
            }),
        }
    }
}
