//! Roster — the contact-relationship subsystem of a messenger backend.
//!
//! Manages social-graph edges between users: pending contact requests,
//! established (bidirectional) contacts, and unilateral blocks.
//! [`contacts::ContactsService`] enforces the business rules on top of the
//! storage-agnostic [`storage::ContactRepository`] trait, which has a
//! durable SQLite realization and a concurrent-safe in-memory one.
//!
//! See `DESIGN.md` for full architecture documentation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod logging;

pub mod model;
pub mod validation;

pub mod contacts;
pub mod storage;
