//! Storage abstraction for the contact graph.
//!
//! [`ContactRepository`] is the only seam between business logic and
//! persistence. Two implementations ship: [`SqliteContactRepository`] for
//! durable storage and [`InMemoryContactRepository`] for tests and
//! standalone mode. The service layer holds the trait object and never
//! learns which one is behind it.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryContactRepository;
pub use sqlite::SqliteContactRepository;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::model::{Contact, ContactRequest, ContactState, ModelError, User};

/// Failures surfaced by repository implementations.
#[derive(Debug, Error)]
pub enum RepoError {
    /// The referenced row does not exist.
    #[error("{entity} not found")]
    NotFound {
        /// Which entity was looked up.
        entity: &'static str,
    },
    /// A conditional write found the row outside the required state.
    #[error("conflict: {detail}")]
    Conflict {
        /// What the write required.
        detail: String,
    },
    /// A stored value failed to decode into its domain type.
    #[error("corrupt row: {detail}")]
    Corrupt {
        /// What failed to decode.
        detail: String,
    },
    /// The backing store failed.
    #[error("storage unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
}

impl From<ModelError> for RepoError {
    fn from(err: ModelError) -> Self {
        Self::Corrupt {
            detail: err.to_string(),
        }
    }
}

/// Persistence operations for users, contact requests, contacts, and blocks.
///
/// Conventions shared by all implementations:
/// - lookups of a missing row return [`RepoError::NotFound`];
/// - the conditional transitions ([`accept_request`](Self::accept_request),
///   [`reject_request`](Self::reject_request)) return [`RepoError::Conflict`]
///   when the request exists but is no longer pending;
/// - deletes and block bookkeeping are idempotent and succeed on absent rows.
///
/// Dropping a call future cancels the operation; no implementation leaves
/// partial state behind for a cancelled call.
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Resolve one free-text identifier against username, e-mail, and phone.
    ///
    /// Matching is exact per field. When the value matches different rows on
    /// different fields the winner is implementation-defined; account status
    /// does not filter the result.
    async fn find_user_by_identifier(&self, identifier: &str) -> Result<User, RepoError>;

    /// Persist a fresh pending request from `from_user` to `to_user`.
    async fn create_contact_request(
        &self,
        from_user: Uuid,
        to_user: Uuid,
        message: Option<&str>,
    ) -> Result<ContactRequest, RepoError>;

    /// Load a request by id.
    async fn contact_request(&self, request_id: Uuid) -> Result<ContactRequest, RepoError>;

    /// Accept a pending request and materialize both directional contacts.
    ///
    /// The state transition and both contact rows commit as one atomic unit:
    /// concurrent accepts of the same request leave exactly one accepted
    /// request and one pair of contact rows, and every loser observes
    /// [`RepoError::Conflict`].
    async fn accept_request(&self, request_id: Uuid) -> Result<(), RepoError>;

    /// Reject a pending request.
    async fn reject_request(&self, request_id: Uuid) -> Result<(), RepoError>;

    /// Materialize one accepted directional contact row.
    ///
    /// Re-materializing an existing `(owner, peer)` edge replaces the row
    /// rather than duplicating it.
    async fn create_contact(&self, owner_id: Uuid, peer_id: Uuid) -> Result<Contact, RepoError>;

    /// List contacts owned by `owner_id` in the given state.
    ///
    /// Ordering is backend-defined; see each implementation.
    async fn list_contacts(
        &self,
        owner_id: Uuid,
        state: ContactState,
    ) -> Result<Vec<Contact>, RepoError>;

    /// Delete one directional contact row.
    async fn delete_contact(&self, owner_id: Uuid, peer_id: Uuid) -> Result<(), RepoError>;

    /// Record that `owner_id` blocks `target_id`.
    async fn create_block(&self, owner_id: Uuid, target_id: Uuid) -> Result<(), RepoError>;

    /// Remove a block if present.
    async fn delete_block(&self, owner_id: Uuid, target_id: Uuid) -> Result<(), RepoError>;

    /// Whether `owner_id` currently blocks `target_id`.
    async fn is_blocked(&self, owner_id: Uuid, target_id: Uuid) -> Result<bool, RepoError>;
}
