//! Business rules for contact requests, contacts, and blocks.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::ContactsError;
use crate::model::{Contact, ContactRequest, ContactState, RequestState};
use crate::storage::{ContactRepository, RepoError};
use crate::validation;

/// Orchestrates the contact-graph business rules over a repository.
///
/// The service trusts the acting-user id it is handed; authentication
/// happens upstream. It holds no state beyond the repository, so one
/// instance serves any number of concurrent callers.
pub struct ContactsService {
    repo: Arc<dyn ContactRepository>,
}

impl ContactsService {
    /// Create a service over the given repository.
    pub fn new(repo: Arc<dyn ContactRepository>) -> Self {
        Self { repo }
    }

    /// Start a contact request from `from_user` to whoever `peer_identifier`
    /// resolves to.
    ///
    /// Validation runs before any repository call. The block check is
    /// directional: it asks whether the resolved peer has blocked the
    /// requester, not the other way around.
    ///
    /// # Errors
    ///
    /// Returns [`ContactsError::Validation`] for blank or oversized inputs,
    /// [`ContactsError::UserNotFound`] when nothing resolves,
    /// [`ContactsError::SelfContact`] when the peer is the requester,
    /// [`ContactsError::Blocked`] when the peer has blocked the requester,
    /// or [`ContactsError::Storage`] when the repository fails.
    pub async fn create_contact_request(
        &self,
        from_user: Uuid,
        peer_identifier: &str,
        message: Option<&str>,
    ) -> Result<ContactRequest, ContactsError> {
        validation::validate_peer_identifier(peer_identifier)
            .map_err(|errors| ContactsError::Validation { errors })?;
        if let Some(message) = message {
            validation::validate_request_message(message)
                .map_err(|errors| ContactsError::Validation { errors })?;
        }

        let peer = match self.repo.find_user_by_identifier(peer_identifier).await {
            Ok(user) => user,
            Err(RepoError::NotFound { .. }) => return Err(ContactsError::UserNotFound),
            Err(err) => return Err(err.into()),
        };

        if peer.id == from_user {
            return Err(ContactsError::SelfContact);
        }

        if self.repo.is_blocked(peer.id, from_user).await? {
            return Err(ContactsError::Blocked);
        }

        let request = self
            .repo
            .create_contact_request(from_user, peer.id, message)
            .await?;
        info!(
            request_id = %request.id,
            from_user = %from_user,
            to_user = %peer.id,
            "contact request created"
        );
        Ok(request)
    }

    /// Accept a pending request addressed to `acting_user`.
    ///
    /// On success both directional contact rows exist and the request is
    /// `accepted`, committed as one atomic unit by the repository. The
    /// pre-checks here produce precise errors; correctness under racing
    /// accepts rests on the repository's conditional transition.
    ///
    /// # Errors
    ///
    /// Returns [`ContactsError::RequestNotFound`] for an unknown request,
    /// [`ContactsError::NotAddressee`] when `acting_user` is not the
    /// addressee, [`ContactsError::NotPending`] when the request was already
    /// decided (including losing a race), or [`ContactsError::Storage`].
    pub async fn accept_contact_request(
        &self,
        acting_user: Uuid,
        request_id: Uuid,
    ) -> Result<(), ContactsError> {
        let request = self.load_request(request_id).await?;

        if request.to_user != acting_user {
            return Err(ContactsError::NotAddressee { action: "accept" });
        }
        if !request.state.can_transition_to(RequestState::Accepted) {
            return Err(ContactsError::NotPending);
        }

        match self.repo.accept_request(request_id).await {
            Ok(()) => {
                info!(request_id = %request_id, acting_user = %acting_user, "contact request accepted");
                Ok(())
            }
            Err(RepoError::NotFound { .. }) => Err(ContactsError::RequestNotFound),
            Err(RepoError::Conflict { .. }) => Err(ContactsError::NotPending),
            Err(err) => Err(err.into()),
        }
    }

    /// Reject a pending request addressed to `acting_user`.
    ///
    /// No contact rows are touched; the request simply becomes `rejected`.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`accept_contact_request`](Self::accept_contact_request).
    pub async fn reject_contact_request(
        &self,
        acting_user: Uuid,
        request_id: Uuid,
    ) -> Result<(), ContactsError> {
        let request = self.load_request(request_id).await?;

        if request.to_user != acting_user {
            return Err(ContactsError::NotAddressee { action: "reject" });
        }
        if !request.state.can_transition_to(RequestState::Rejected) {
            return Err(ContactsError::NotPending);
        }

        match self.repo.reject_request(request_id).await {
            Ok(()) => {
                info!(request_id = %request_id, acting_user = %acting_user, "contact request rejected");
                Ok(())
            }
            Err(RepoError::NotFound { .. }) => Err(ContactsError::RequestNotFound),
            Err(RepoError::Conflict { .. }) => Err(ContactsError::NotPending),
            Err(err) => Err(err.into()),
        }
    }

    /// Remove `peer_id` from `owner_id`'s contact list.
    ///
    /// Only the owner's directional row is touched; the peer still lists
    /// the owner until they delete their own row. Deleting an absent
    /// contact is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ContactsError::Storage`] when the repository fails.
    pub async fn delete_contact(&self, owner_id: Uuid, peer_id: Uuid) -> Result<(), ContactsError> {
        self.repo.delete_contact(owner_id, peer_id).await?;
        debug!(owner_id = %owner_id, peer_id = %peer_id, "contact deleted");
        Ok(())
    }

    /// Block `target_id` on behalf of `owner_id`.
    ///
    /// Existing contact rows between the two users are removed best-effort
    /// in both directions before the block is recorded; cleanup failures
    /// are logged and do not abort the block.
    ///
    /// # Errors
    ///
    /// Returns [`ContactsError::Storage`] when recording the block fails.
    pub async fn block_peer(&self, owner_id: Uuid, target_id: Uuid) -> Result<(), ContactsError> {
        if let Err(err) = self.repo.delete_contact(owner_id, target_id).await {
            warn!(
                owner_id = %owner_id,
                target_id = %target_id,
                error = %err,
                "contact cleanup failed while blocking"
            );
        }
        if let Err(err) = self.repo.delete_contact(target_id, owner_id).await {
            warn!(
                owner_id = %owner_id,
                target_id = %target_id,
                error = %err,
                "contact cleanup failed while blocking"
            );
        }

        self.repo.create_block(owner_id, target_id).await?;
        info!(owner_id = %owner_id, target_id = %target_id, "peer blocked");
        Ok(())
    }

    /// Remove a block held by `owner_id` against `target_id`.
    ///
    /// Unblocking does not restore any contact rows; the pair must go
    /// through the request flow again. Removing an absent block is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ContactsError::Storage`] when the repository fails.
    pub async fn unblock_peer(&self, owner_id: Uuid, target_id: Uuid) -> Result<(), ContactsError> {
        self.repo.delete_block(owner_id, target_id).await?;
        debug!(owner_id = %owner_id, target_id = %target_id, "peer unblocked");
        Ok(())
    }

    /// List `owner_id`'s contacts in the given state.
    ///
    /// Ordering is backend-defined; see the repository implementations.
    ///
    /// # Errors
    ///
    /// Returns [`ContactsError::Storage`] when the repository fails.
    pub async fn list_contacts(
        &self,
        owner_id: Uuid,
        state: ContactState,
    ) -> Result<Vec<Contact>, ContactsError> {
        Ok(self.repo.list_contacts(owner_id, state).await?)
    }

    async fn load_request(&self, request_id: Uuid) -> Result<ContactRequest, ContactsError> {
        match self.repo.contact_request(request_id).await {
            Ok(request) => Ok(request),
            Err(RepoError::NotFound { .. }) => Err(ContactsError::RequestNotFound),
            Err(err) => Err(err.into()),
        }
    }
}
