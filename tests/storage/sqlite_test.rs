//! Tests for `src/storage/sqlite.rs` — the durable repository contract.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use uuid::Uuid;

use roster::model::{ContactState, RequestState, User};
use roster::storage::sqlite::SqliteContactRepository;
use roster::storage::{ContactRepository, RepoError};

/// In-memory repository plus the raw pool, for direct-SQL assertions.
async fn memory_repo() -> (SqlitePool, SqliteContactRepository) {
    let opts = SqliteConnectOptions::new()
        .filename(":memory:")
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await
        .expect("pool should connect");
    let repo = SqliteContactRepository::from_pool(pool.clone())
        .await
        .expect("schema should apply");
    (pool, repo)
}

fn user_with(username: Option<&str>, email: Option<&str>, phone: Option<&str>) -> User {
    User::new(
        username.map(str::to_owned),
        email.map(str::to_owned),
        phone.map(str::to_owned),
    )
}

async fn seed_pair(repo: &SqliteContactRepository) -> (User, User) {
    let ada = user_with(Some("ada"), Some("ada@example.com"), None);
    let bob = user_with(Some("bob"), Some("bob@example.com"), None);
    repo.insert_user(&ada).await.expect("ada should seed");
    repo.insert_user(&bob).await.expect("bob should seed");
    (ada, bob)
}

#[tokio::test]
async fn resolves_identifier_across_fields() {
    let (_pool, repo) = memory_repo().await;
    let carol = user_with(
        Some("carol"),
        Some("carol@example.com"),
        Some("+14155550101"),
    );
    repo.insert_user(&carol).await.expect("carol should seed");

    for identifier in ["carol", "carol@example.com", "+14155550101"] {
        let found = repo
            .find_user_by_identifier(identifier)
            .await
            .expect("identifier should resolve");
        assert_eq!(found.id, carol.id, "lookup by {identifier:?}");
    }

    // NULL identifier columns never match.
    let dave = user_with(None, None, Some("+14155550102"));
    repo.insert_user(&dave).await.expect("dave should seed");
    let found = repo
        .find_user_by_identifier("+14155550102")
        .await
        .expect("phone-only account should resolve");
    assert_eq!(found.id, dave.id);

    assert!(matches!(
        repo.find_user_by_identifier("missing").await,
        Err(RepoError::NotFound { entity: "user" })
    ));
}

#[tokio::test]
async fn accept_is_conditional_on_pending() {
    let (_pool, repo) = memory_repo().await;
    let (ada, bob) = seed_pair(&repo).await;
    let request = repo
        .create_contact_request(ada.id, bob.id, Some("hi"))
        .await
        .expect("request should insert");

    repo.accept_request(request.id)
        .await
        .expect("first accept should win");

    assert!(matches!(
        repo.accept_request(request.id).await,
        Err(RepoError::Conflict { .. })
    ));
    assert!(matches!(
        repo.reject_request(request.id).await,
        Err(RepoError::Conflict { .. })
    ));
    assert!(matches!(
        repo.accept_request(Uuid::now_v7()).await,
        Err(RepoError::NotFound {
            entity: "contact request"
        })
    ));

    let stored = repo
        .contact_request(request.id)
        .await
        .expect("request should load");
    assert_eq!(stored.state, RequestState::Accepted);
}

#[tokio::test]
async fn concurrent_accepts_have_one_winner() {
    let dir = tempfile::tempdir().expect("tempdir should create");
    let path = dir.path().join("nested").join("contacts.db");
    let repo = SqliteContactRepository::open(&path, 5)
        .await
        .expect("open should create parent dirs and apply schema");

    let (ada, bob) = seed_pair(&repo).await;
    let request = repo
        .create_contact_request(ada.id, bob.id, None)
        .await
        .expect("request should insert");

    let (first, second) = tokio::join!(
        repo.accept_request(request.id),
        repo.accept_request(request.id)
    );
    assert!(
        first.is_ok() ^ second.is_ok(),
        "exactly one accept should win: {first:?} / {second:?}"
    );

    // The losing transaction left no partial contact rows behind.
    let ada_contacts = repo
        .list_contacts(ada.id, ContactState::Accepted)
        .await
        .expect("list should succeed");
    assert_eq!(ada_contacts.len(), 1);
    let bob_contacts = repo
        .list_contacts(bob.id, ContactState::Accepted)
        .await
        .expect("list should succeed");
    assert_eq!(bob_contacts.len(), 1);
}

#[tokio::test]
async fn contact_rows_upsert_instead_of_duplicating() {
    let (_pool, repo) = memory_repo().await;
    let (ada, bob) = seed_pair(&repo).await;

    let first = repo
        .create_contact(ada.id, bob.id)
        .await
        .expect("first write should succeed");
    let second = repo
        .create_contact(ada.id, bob.id)
        .await
        .expect("second write should succeed");
    assert_ne!(first.id, second.id);

    let contacts = repo
        .list_contacts(ada.id, ContactState::Accepted)
        .await
        .expect("list should succeed");
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].id, second.id, "replacement row wins wholesale");
}

#[tokio::test]
async fn contact_deletes_are_idempotent() {
    let (_pool, repo) = memory_repo().await;
    let (ada, bob) = seed_pair(&repo).await;
    repo.create_contact(ada.id, bob.id)
        .await
        .expect("contact should write");

    repo.delete_contact(ada.id, bob.id)
        .await
        .expect("delete should succeed");
    let contacts = repo
        .list_contacts(ada.id, ContactState::Accepted)
        .await
        .expect("list should succeed");
    assert!(contacts.is_empty());

    repo.delete_contact(ada.id, bob.id)
        .await
        .expect("repeat delete should be a no-op");
}

#[tokio::test]
async fn blocks_are_directional_and_idempotent() {
    let (_pool, repo) = memory_repo().await;
    let (ada, bob) = seed_pair(&repo).await;

    repo.create_block(ada.id, bob.id)
        .await
        .expect("block should write");
    repo.create_block(ada.id, bob.id)
        .await
        .expect("repeat block should be a no-op");

    assert!(repo
        .is_blocked(ada.id, bob.id)
        .await
        .expect("lookup should succeed"));
    assert!(!repo
        .is_blocked(bob.id, ada.id)
        .await
        .expect("lookup should succeed"));

    repo.delete_block(ada.id, bob.id)
        .await
        .expect("unblock should succeed");
    assert!(!repo
        .is_blocked(ada.id, bob.id)
        .await
        .expect("lookup should succeed"));
    repo.delete_block(ada.id, bob.id)
        .await
        .expect("repeat unblock should be a no-op");
}

#[tokio::test]
async fn entity_counts_reflect_rows() {
    let (_pool, repo) = memory_repo().await;

    let empty = repo.entity_counts().await.expect("counts should query");
    assert_eq!(empty.users, 0);
    assert_eq!(empty.contact_requests, 0);
    assert_eq!(empty.contacts, 0);
    assert_eq!(empty.blocks, 0);

    let (ada, bob) = seed_pair(&repo).await;
    let request = repo
        .create_contact_request(ada.id, bob.id, None)
        .await
        .expect("request should insert");
    repo.accept_request(request.id)
        .await
        .expect("accept should succeed");

    let counts = repo.entity_counts().await.expect("counts should query");
    assert_eq!(counts.users, 2);
    assert_eq!(counts.contact_requests, 1);
    assert_eq!(counts.contacts, 2);
    assert_eq!(counts.blocks, 0);
}

#[tokio::test]
async fn corrupt_timestamp_surfaces_as_corrupt() {
    let (pool, repo) = memory_repo().await;
    let (ada, bob) = seed_pair(&repo).await;
    let request = repo
        .create_contact_request(ada.id, bob.id, None)
        .await
        .expect("request should insert");

    sqlx::query("UPDATE contact_requests SET created_at = 'not-a-timestamp' WHERE id = ?1")
        .bind(request.id.to_string())
        .execute(&pool)
        .await
        .expect("corruption should write");

    assert!(matches!(
        repo.contact_request(request.id).await,
        Err(RepoError::Corrupt { .. })
    ));
}

#[tokio::test]
async fn reopen_preserves_rows() {
    let dir = tempfile::tempdir().expect("tempdir should create");
    let path = dir.path().join("contacts.db");
    let carol = user_with(Some("carol"), None, None);

    {
        let repo = SqliteContactRepository::open(&path, 2)
            .await
            .expect("open should succeed");
        repo.insert_user(&carol).await.expect("carol should seed");
    }

    // Second open re-applies the idempotent schema over existing data.
    let repo = SqliteContactRepository::open(&path, 2)
        .await
        .expect("reopen should succeed");
    let found = repo
        .find_user_by_identifier("carol")
        .await
        .expect("carol should survive reopen");
    assert_eq!(found.id, carol.id);
}
