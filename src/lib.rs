#![forbid(unsafe_code)]

//! Coach login-code and session-state manager for a class reservation site.
//!
//! The reservation UI gates its administrative ("coach") views on a single
//! persisted flag. To set that flag the coach proves knowledge of a
//! short-lived one-time code. This crate owns that lifecycle:
//!
//! ```text
//! NoCode --set_pending_login_code--> PendingCode
//! PendingCode --validate (ok) + mark_logged_in--> Authenticated
//! PendingCode --validate (expired)--> NoCode
//! PendingCode --validate (mismatch)--> PendingCode
//! Authenticated --logout--> NoCode
//! ```
//!
//! Storage and time are injected; see [`auth::KeyValueStore`] and
//! [`auth::Clock`].

pub mod auth;
pub mod config;

pub use auth::{
    CoachCredentials, CoachSession, KeyValueStore, LoginCodeError, MemoryStore, SqliteStore,
    StorageKeys, ValidatedCode, ValidationOutcome,
};
pub use config::Config;
