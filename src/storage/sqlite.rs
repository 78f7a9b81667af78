//! Durable contact storage backed by SQLite.
//!
//! The schema is applied inline via `include_str!` on every open; all
//! statements in the migration are idempotent. Timestamps are stored as
//! RFC 3339 TEXT and are only ever written by this module, so reads parse
//! them back losslessly.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, trace};
use uuid::Uuid;

use super::{ContactRepository, RepoError};
use crate::model::{Block, Contact, ContactRequest, ContactState, RequestState, User, UserStatus};

/// Row type returned by SQLite queries for users.
type UserRow = (
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
    String,
    String,
);

/// Row type returned by SQLite queries for contact requests.
type RequestRow = (
    String,
    String,
    String,
    String,
    Option<String>,
    String,
    String,
);

/// Row type returned by SQLite queries for contacts.
type ContactRow = (String, String, String, String, String, String);

/// Row counts reported by the health probe.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct EntityCounts {
    /// Rows in `users`.
    pub users: i64,
    /// Rows in `contact_requests`.
    pub contact_requests: i64,
    /// Rows in `contacts`.
    pub contacts: i64,
    /// Rows in `blocks`.
    pub blocks: i64,
}

/// Durable [`ContactRepository`] over a SQLite pool.
///
/// `list_contacts` returns rows ordered by `created_at` then id.
pub struct SqliteContactRepository {
    pool: SqlitePool,
}

impl SqliteContactRepository {
    /// Open (or create) the contact database at `path` and apply the schema.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Unavailable`] if the database cannot be opened
    /// or the schema cannot be applied.
    pub async fn open(path: &Path, max_connections: u32) -> Result<Self, RepoError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .pragma("trusted_schema", "OFF")
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let repo = Self::from_pool(pool).await?;
        debug!(path = %path.display(), "contact database opened");
        Ok(repo)
    }

    /// Wrap an existing pool and apply the schema.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Unavailable`] if the schema cannot be applied.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, RepoError> {
        sqlx::raw_sql(include_str!("../../migrations/001_schema.sql"))
            .execute(&pool)
            .await?;
        Ok(Self { pool })
    }

    /// Seed an account row.
    ///
    /// Account management belongs to another subsystem; this entry point
    /// exists for tests, tooling, and standalone deployments.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Unavailable`] on write failure, including
    /// duplicate ids and duplicate handles.
    pub async fn insert_user(&self, user: &User) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO users (id, username, email, phone, status, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.status.as_str())
        .bind(user.created_at.to_rfc3339())
        .bind(user.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        trace!(user_id = %user.id, "user row seeded");
        Ok(())
    }

    /// Count rows per table, as a cheap health probe.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Unavailable`] if any count query fails.
    pub async fn entity_counts(&self) -> Result<EntityCounts, RepoError> {
        let (users,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        let (contact_requests,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM contact_requests")
            .fetch_one(&self.pool)
            .await?;
        let (contacts,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM contacts")
            .fetch_one(&self.pool)
            .await?;
        let (blocks,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM blocks")
            .fetch_one(&self.pool)
            .await?;

        Ok(EntityCounts {
            users,
            contact_requests,
            contacts,
            blocks,
        })
    }
}

#[async_trait]
impl ContactRepository for SqliteContactRepository {
    async fn find_user_by_identifier(&self, identifier: &str) -> Result<User, RepoError> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, email, phone, status, created_at, updated_at \
             FROM users WHERE username = ?1 OR email = ?1 OR phone = ?1 \
             LIMIT 1",
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or(RepoError::NotFound { entity: "user" })?;
        user_from_row(row)
    }

    async fn create_contact_request(
        &self,
        from_user: Uuid,
        to_user: Uuid,
        message: Option<&str>,
    ) -> Result<ContactRequest, RepoError> {
        let request = ContactRequest::new_pending(from_user, to_user, message.map(str::to_owned));

        sqlx::query(
            "INSERT INTO contact_requests \
             (id, from_user_id, to_user_id, state, message, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(request.id.to_string())
        .bind(request.from_user.to_string())
        .bind(request.to_user.to_string())
        .bind(request.state.as_str())
        .bind(&request.message)
        .bind(request.created_at.to_rfc3339())
        .bind(request.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        trace!(request_id = %request.id, "contact request inserted");
        Ok(request)
    }

    async fn contact_request(&self, request_id: Uuid) -> Result<ContactRequest, RepoError> {
        let row: Option<RequestRow> = sqlx::query_as(
            "SELECT id, from_user_id, to_user_id, state, message, created_at, updated_at \
             FROM contact_requests WHERE id = ?1",
        )
        .bind(request_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or(RepoError::NotFound {
            entity: "contact request",
        })?;
        request_from_row(row)
    }

    async fn accept_request(&self, request_id: Uuid) -> Result<(), RepoError> {
        let mut tx = self.pool.begin().await?;
        let id = request_id.to_string();
        let now = Utc::now().to_rfc3339();

        // The conditional write is the first statement in the transaction,
        // so concurrent accepts serialize on the database write lock
        // instead of racing a stale read snapshot.
        let updated = sqlx::query(
            "UPDATE contact_requests SET state = 'accepted', updated_at = ?1 \
             WHERE id = ?2 AND state = 'pending'",
        )
        .bind(&now)
        .bind(&id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let state: Option<(String,)> =
                sqlx::query_as("SELECT state FROM contact_requests WHERE id = ?1")
                    .bind(&id)
                    .fetch_optional(&mut *tx)
                    .await?;
            return match state {
                None => Err(RepoError::NotFound {
                    entity: "contact request",
                }),
                Some((state,)) => Err(RepoError::Conflict {
                    detail: format!("contact request {id} is {state}, not pending"),
                }),
            };
        }

        let (from_user, to_user): (String, String) =
            sqlx::query_as("SELECT from_user_id, to_user_id FROM contact_requests WHERE id = ?1")
                .bind(&id)
                .fetch_one(&mut *tx)
                .await?;
        let from_user = parse_uuid("from_user_id", &from_user)?;
        let to_user = parse_uuid("to_user_id", &to_user)?;

        insert_contact(&mut tx, &Contact::new_accepted(from_user, to_user)).await?;
        insert_contact(&mut tx, &Contact::new_accepted(to_user, from_user)).await?;

        tx.commit().await?;
        debug!(request_id = %request_id, "contact request accepted");
        Ok(())
    }

    async fn reject_request(&self, request_id: Uuid) -> Result<(), RepoError> {
        let id = request_id.to_string();
        let updated = sqlx::query(
            "UPDATE contact_requests SET state = 'rejected', updated_at = ?1 \
             WHERE id = ?2 AND state = 'pending'",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(&id)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            // Requests are never deleted and terminal states are immutable,
            // so this follow-up read cannot misclassify the failure.
            let state: Option<(String,)> =
                sqlx::query_as("SELECT state FROM contact_requests WHERE id = ?1")
                    .bind(&id)
                    .fetch_optional(&self.pool)
                    .await?;
            return match state {
                None => Err(RepoError::NotFound {
                    entity: "contact request",
                }),
                Some((state,)) => Err(RepoError::Conflict {
                    detail: format!("contact request {id} is {state}, not pending"),
                }),
            };
        }

        debug!(request_id = %request_id, "contact request rejected");
        Ok(())
    }

    async fn create_contact(&self, owner_id: Uuid, peer_id: Uuid) -> Result<Contact, RepoError> {
        let contact = Contact::new_accepted(owner_id, peer_id);
        let mut conn = self.pool.acquire().await?;
        insert_contact(&mut conn, &contact).await?;

        trace!(owner_id = %owner_id, peer_id = %peer_id, "contact row written");
        Ok(contact)
    }

    async fn list_contacts(
        &self,
        owner_id: Uuid,
        state: ContactState,
    ) -> Result<Vec<Contact>, RepoError> {
        let rows: Vec<ContactRow> = sqlx::query_as(
            "SELECT id, owner_id, peer_id, state, created_at, updated_at \
             FROM contacts WHERE owner_id = ?1 AND state = ?2 \
             ORDER BY created_at ASC, id ASC",
        )
        .bind(owner_id.to_string())
        .bind(state.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(contact_from_row).collect()
    }

    async fn delete_contact(&self, owner_id: Uuid, peer_id: Uuid) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM contacts WHERE owner_id = ?1 AND peer_id = ?2")
            .bind(owner_id.to_string())
            .bind(peer_id.to_string())
            .execute(&self.pool)
            .await?;

        trace!(owner_id = %owner_id, peer_id = %peer_id, "contact row deleted");
        Ok(())
    }

    async fn create_block(&self, owner_id: Uuid, target_id: Uuid) -> Result<(), RepoError> {
        let block = Block::new(owner_id, target_id);
        sqlx::query(
            r"INSERT INTO blocks (owner_id, target_id, reason, created_at)
              VALUES (?1, ?2, ?3, ?4)
              ON CONFLICT(owner_id, target_id) DO NOTHING",
        )
        .bind(block.owner_id.to_string())
        .bind(block.target_id.to_string())
        .bind(&block.reason)
        .bind(block.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(owner_id = %owner_id, target_id = %target_id, "block recorded");
        Ok(())
    }

    async fn delete_block(&self, owner_id: Uuid, target_id: Uuid) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM blocks WHERE owner_id = ?1 AND target_id = ?2")
            .bind(owner_id.to_string())
            .bind(target_id.to_string())
            .execute(&self.pool)
            .await?;

        debug!(owner_id = %owner_id, target_id = %target_id, "block removed");
        Ok(())
    }

    async fn is_blocked(&self, owner_id: Uuid, target_id: Uuid) -> Result<bool, RepoError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM blocks WHERE owner_id = ?1 AND target_id = ?2")
                .bind(owner_id.to_string())
                .bind(target_id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.is_some())
    }
}

/// Insert or replace one directional contact row on the given connection.
///
/// The replace branch overwrites every column, matching map semantics: the
/// newest materialization of an edge wins wholesale.
async fn insert_contact(conn: &mut SqliteConnection, contact: &Contact) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"INSERT INTO contacts (id, owner_id, peer_id, state, created_at, updated_at)
          VALUES (?1, ?2, ?3, ?4, ?5, ?6)
          ON CONFLICT(owner_id, peer_id) DO UPDATE SET
              id = excluded.id,
              state = excluded.state,
              created_at = excluded.created_at,
              updated_at = excluded.updated_at",
    )
    .bind(contact.id.to_string())
    .bind(contact.owner_id.to_string())
    .bind(contact.peer_id.to_string())
    .bind(contact.state.as_str())
    .bind(contact.created_at.to_rfc3339())
    .bind(contact.updated_at.to_rfc3339())
    .execute(conn)
    .await?;
    Ok(())
}

/// Parse a stored uuid column, mapping failures to [`RepoError::Corrupt`].
fn parse_uuid(field: &'static str, value: &str) -> Result<Uuid, RepoError> {
    Uuid::parse_str(value).map_err(|_| RepoError::Corrupt {
        detail: format!("bad {field} uuid: {value:?}"),
    })
}

/// Parse a stored RFC 3339 column, mapping failures to [`RepoError::Corrupt`].
fn parse_timestamp(field: &'static str, value: &str) -> Result<DateTime<Utc>, RepoError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| RepoError::Corrupt {
            detail: format!("bad {field} timestamp: {value:?}"),
        })
}

/// Convert a `UserRow` tuple into a [`User`], propagating parse errors.
fn user_from_row(row: UserRow) -> Result<User, RepoError> {
    Ok(User {
        id: parse_uuid("users.id", &row.0)?,
        username: row.1,
        email: row.2,
        phone: row.3,
        status: UserStatus::parse(&row.4)?,
        created_at: parse_timestamp("users.created_at", &row.5)?,
        updated_at: parse_timestamp("users.updated_at", &row.6)?,
    })
}

/// Convert a `RequestRow` tuple into a [`ContactRequest`], propagating parse errors.
fn request_from_row(row: RequestRow) -> Result<ContactRequest, RepoError> {
    Ok(ContactRequest {
        id: parse_uuid("contact_requests.id", &row.0)?,
        from_user: parse_uuid("contact_requests.from_user_id", &row.1)?,
        to_user: parse_uuid("contact_requests.to_user_id", &row.2)?,
        state: RequestState::parse(&row.3)?,
        message: row.4,
        created_at: parse_timestamp("contact_requests.created_at", &row.5)?,
        updated_at: parse_timestamp("contact_requests.updated_at", &row.6)?,
    })
}

/// Convert a `ContactRow` tuple into a [`Contact`], propagating parse errors.
fn contact_from_row(row: ContactRow) -> Result<Contact, RepoError> {
    Ok(Contact {
        id: parse_uuid("contacts.id", &row.0)?,
        owner_id: parse_uuid("contacts.owner_id", &row.1)?,
        peer_id: parse_uuid("contacts.peer_id", &row.2)?,
        state: ContactState::parse(&row.3)?,
        created_at: parse_timestamp("contacts.created_at", &row.4)?,
        updated_at: parse_timestamp("contacts.updated_at", &row.5)?,
    })
}
