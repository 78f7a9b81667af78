//! Roster CLI entry point.
//!
//! Operational tooling for a roster contact database: `migrate` applies the
//! schema, `check` reports row counts, and `seed-user` inserts accounts for
//! local development. The contact service itself is consumed as a library.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use roster::config::RosterConfig;
use roster::logging;
use roster::model::User;
use roster::storage::sqlite::SqliteContactRepository;
use roster::validation;

/// Roster — contact-relationship subsystem for a messenger backend.
#[derive(Parser)]
#[command(name = "roster", version, about)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Create the database if needed and apply the schema.
    Migrate,
    /// Report row counts per entity as JSON on stdout.
    Check,
    /// Insert an account row and print its id on stdout.
    SeedUser {
        /// Login handle (3-32 characters: letters, digits, underscore).
        #[arg(long)]
        username: String,

        /// E-mail address.
        #[arg(long)]
        email: Option<String>,

        /// Phone number in E.164 form (e.g. +15550001111).
        #[arg(long)]
        phone: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_cli();

    let config = RosterConfig::load().context("failed to load configuration")?;

    match cli.command {
        Command::Migrate => handle_migrate(&config).await,
        Command::Check => handle_check(&config).await,
        Command::SeedUser {
            username,
            email,
            phone,
        } => handle_seed_user(&config, username, email, phone).await,
    }
}

/// Open the configured database, creating it and applying the schema if needed.
async fn open_repo(config: &RosterConfig) -> anyhow::Result<SqliteContactRepository> {
    let path = PathBuf::from(&config.database.path);
    SqliteContactRepository::open(&path, config.database.max_connections)
        .await
        .with_context(|| format!("failed to open database at {}", path.display()))
}

/// Apply the schema to the configured database.
async fn handle_migrate(config: &RosterConfig) -> anyhow::Result<()> {
    open_repo(config).await?;
    info!(path = %config.database.path, "schema applied");
    Ok(())
}

/// Report row counts for every table in the contact database.
async fn handle_check(config: &RosterConfig) -> anyhow::Result<()> {
    let repo = open_repo(config).await?;
    let counts = repo
        .entity_counts()
        .await
        .context("failed to count entities")?;

    let json = serde_json::to_string_pretty(&counts).context("failed to serialize counts")?;
    println!("{json}");
    info!("database check complete");
    Ok(())
}

/// Validate and insert an account row, printing its id on success.
///
/// Accounts normally come from the account subsystem; this exists so local
/// databases can be populated without one.
async fn handle_seed_user(
    config: &RosterConfig,
    username: String,
    email: Option<String>,
    phone: Option<String>,
) -> anyhow::Result<()> {
    anyhow::ensure!(
        validation::is_valid_username(&username),
        "invalid username {username:?}: want 3-32 characters (letters, digits, underscore)"
    );
    if let Some(ref email) = email {
        anyhow::ensure!(
            validation::is_valid_email(email),
            "invalid email {email:?}"
        );
    }
    if let Some(ref phone) = phone {
        anyhow::ensure!(
            validation::is_valid_phone(phone),
            "invalid phone {phone:?}: want E.164 form, e.g. +15550001111"
        );
    }

    let repo = open_repo(config).await?;
    let user = User::new(Some(username), email, phone);
    repo.insert_user(&user)
        .await
        .context("failed to insert user (username, email, and phone must be unused)")?;

    info!(user_id = %user.id, "user seeded");
    println!("{}", user.id);
    Ok(())
}
