//! In-memory contact storage for tests and standalone mode.
//!
//! A single `RwLock` guards all maps, so every repository call is atomic;
//! the conditional transitions read and write under one exclusive guard.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ContactRepository, RepoError};
use crate::model::{Contact, ContactRequest, ContactState, RequestState, User};

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    requests: HashMap<Uuid, ContactRequest>,
    contacts: HashMap<Uuid, HashMap<Uuid, Contact>>,
    blocks: HashMap<Uuid, HashSet<Uuid>>,
}

/// In-memory [`ContactRepository`] for tests and standalone mode.
///
/// `list_contacts` returns rows in map-iteration order; callers needing a
/// stable order must sort. Identifier resolution checks username, e-mail,
/// then phone per account.
pub struct InMemoryContactRepository {
    inner: Arc<RwLock<MemoryState>>,
}

impl InMemoryContactRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryState::default())),
        }
    }

    /// Seed an account, replacing any user with the same id.
    ///
    /// Account management belongs to another subsystem; this entry point
    /// exists so tests and standalone deployments can populate the store.
    pub async fn insert_user(&self, user: User) {
        let mut inner = self.inner.write().await;
        inner.users.insert(user.id, user);
    }
}

impl Default for InMemoryContactRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContactRepository for InMemoryContactRepository {
    async fn find_user_by_identifier(&self, identifier: &str) -> Result<User, RepoError> {
        let inner = self.inner.read().await;
        inner
            .users
            .values()
            .find(|user| {
                user.username.as_deref() == Some(identifier)
                    || user.email.as_deref() == Some(identifier)
                    || user.phone.as_deref() == Some(identifier)
            })
            .cloned()
            .ok_or(RepoError::NotFound { entity: "user" })
    }

    async fn create_contact_request(
        &self,
        from_user: Uuid,
        to_user: Uuid,
        message: Option<&str>,
    ) -> Result<ContactRequest, RepoError> {
        let request = ContactRequest::new_pending(from_user, to_user, message.map(str::to_owned));
        let mut inner = self.inner.write().await;
        inner.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn contact_request(&self, request_id: Uuid) -> Result<ContactRequest, RepoError> {
        let inner = self.inner.read().await;
        inner
            .requests
            .get(&request_id)
            .cloned()
            .ok_or(RepoError::NotFound {
                entity: "contact request",
            })
    }

    async fn accept_request(&self, request_id: Uuid) -> Result<(), RepoError> {
        let mut inner = self.inner.write().await;
        let request = inner
            .requests
            .get_mut(&request_id)
            .ok_or(RepoError::NotFound {
                entity: "contact request",
            })?;
        if request.state != RequestState::Pending {
            return Err(RepoError::Conflict {
                detail: format!(
                    "contact request {request_id} is {}, not pending",
                    request.state.as_str()
                ),
            });
        }
        request.state = RequestState::Accepted;
        request.updated_at = Utc::now();
        let from_user = request.from_user;
        let to_user = request.to_user;

        inner
            .contacts
            .entry(from_user)
            .or_default()
            .insert(to_user, Contact::new_accepted(from_user, to_user));
        inner
            .contacts
            .entry(to_user)
            .or_default()
            .insert(from_user, Contact::new_accepted(to_user, from_user));
        Ok(())
    }

    async fn reject_request(&self, request_id: Uuid) -> Result<(), RepoError> {
        let mut inner = self.inner.write().await;
        let request = inner
            .requests
            .get_mut(&request_id)
            .ok_or(RepoError::NotFound {
                entity: "contact request",
            })?;
        if request.state != RequestState::Pending {
            return Err(RepoError::Conflict {
                detail: format!(
                    "contact request {request_id} is {}, not pending",
                    request.state.as_str()
                ),
            });
        }
        request.state = RequestState::Rejected;
        request.updated_at = Utc::now();
        Ok(())
    }

    async fn create_contact(&self, owner_id: Uuid, peer_id: Uuid) -> Result<Contact, RepoError> {
        let contact = Contact::new_accepted(owner_id, peer_id);
        let mut inner = self.inner.write().await;
        inner
            .contacts
            .entry(owner_id)
            .or_default()
            .insert(peer_id, contact.clone());
        Ok(contact)
    }

    async fn list_contacts(
        &self,
        owner_id: Uuid,
        state: ContactState,
    ) -> Result<Vec<Contact>, RepoError> {
        let inner = self.inner.read().await;
        Ok(inner
            .contacts
            .get(&owner_id)
            .map(|rows| {
                rows.values()
                    .filter(|contact| contact.state == state)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete_contact(&self, owner_id: Uuid, peer_id: Uuid) -> Result<(), RepoError> {
        let mut inner = self.inner.write().await;
        if let Some(rows) = inner.contacts.get_mut(&owner_id) {
            rows.remove(&peer_id);
        }
        Ok(())
    }

    async fn create_block(&self, owner_id: Uuid, target_id: Uuid) -> Result<(), RepoError> {
        let mut inner = self.inner.write().await;
        inner.blocks.entry(owner_id).or_default().insert(target_id);
        Ok(())
    }

    async fn delete_block(&self, owner_id: Uuid, target_id: Uuid) -> Result<(), RepoError> {
        let mut inner = self.inner.write().await;
        if let Some(targets) = inner.blocks.get_mut(&owner_id) {
            targets.remove(&target_id);
        }
        Ok(())
    }

    async fn is_blocked(&self, owner_id: Uuid, target_id: Uuid) -> Result<bool, RepoError> {
        let inner = self.inner.read().await;
        Ok(inner
            .blocks
            .get(&owner_id)
            .map_or(false, |targets| targets.contains(&target_id)))
    }
}
