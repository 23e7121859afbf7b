//! Coach authentication.
//!
//! Provides:
//! - A time-limited one-time login code, stored with its expiry
//! - A persisted "coach is logged in" flag
//! - A credential gate that issues codes for the configured coach account
//!
//! All state lives in an injected [`KeyValueStore`]; nothing is cached in
//! memory, so several processes sharing one store see the same session.
//! No operation here returns a storage error: faults read as absent data.

pub mod clock;
pub mod credentials;
pub mod error;
pub mod session;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use credentials::{generate_login_code, issue_login_code, CoachCredentials};
pub use error::LoginCodeError;
pub use session::{CoachSession, PendingCode, ValidatedCode, ValidationOutcome, DEFAULT_CODE_TTL_MS};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore, StorageKeys};

/// Constant-time byte comparison.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_works() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"short", b"longer"));
        assert!(constant_time_eq(b"", b""));
    }
}
