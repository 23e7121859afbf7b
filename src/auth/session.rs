//! Coach session manager.
//!
//! Owns two pieces of persisted state, both living in the injected
//! [`KeyValueStore`] and never cached in memory:
//! - the authenticated-session flag (`isCoachLoggedIn = "true"`, or absent)
//! - a pending one-time login code plus its expiry in epoch milliseconds
//!
//! ## Lifecycle
//! 1. [`CoachSession::set_pending_login_code`] stores a code with `now + ttl`
//! 2. [`CoachSession::validate_login_code`] checks it and, on success, hands
//!    back a single-use [`ValidatedCode`]
//! 3. [`CoachSession::mark_logged_in`] consumes that token, sets the flag and
//!    clears the pending code
//! 4. [`CoachSession::logout`] deletes the flag
//!
//! Expired codes are cleared when a validation detects them. Mismatches leave
//! the code in place, so retries are unlimited until expiry.

use super::clock::{Clock, SystemClock};
use super::constant_time_eq;
use super::error::LoginCodeError;
use super::storage::{KeyValueStore, StorageKeys};
use serde::Serialize;
use std::fmt;

/// Default lifetime of a pending login code: 10 minutes.
pub const DEFAULT_CODE_TTL_MS: i64 = 10 * 60 * 1000;

/// Only value ever written under the session-flag key.
const LOGGED_IN_SENTINEL: &str = "true";

/// Snapshot of the pending code as currently stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCode {
    /// Stored code, `None` when absent or empty.
    pub code: Option<String>,
    /// Parsed expiry, `0` when absent or unparsable.
    pub expires_at: i64,
}

impl PendingCode {
    /// A code is usable only when both halves are present.
    pub fn is_present(&self) -> bool {
        self.code.is_some() && self.expires_at != 0
    }
}

/// Proof that a login code was just accepted.
///
/// Only [`CoachSession::validate_login_code`] can create one and
/// [`CoachSession::mark_logged_in`] consumes it, so a session cannot be
/// committed without a prior successful validation.
#[derive(Debug)]
#[must_use = "pass the token to `mark_logged_in` to open the session"]
pub struct ValidatedCode {
    _private: (),
}

/// Flat `{ ok, error }` view of a validation, for UI callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub ok: bool,
    pub error: String,
}

impl From<&Result<ValidatedCode, LoginCodeError>> for ValidationOutcome {
    fn from(result: &Result<ValidatedCode, LoginCodeError>) -> Self {
        match result {
            Ok(_) => Self {
                ok: true,
                error: String::new(),
            },
            Err(e) => Self {
                ok: false,
                error: e.to_string(),
            },
        }
    }
}

/// Login-code and session-flag manager over an injected store and clock.
pub struct CoachSession<S, C = SystemClock> {
    store: S,
    clock: C,
    default_ttl_ms: i64,
}

impl<S: KeyValueStore> CoachSession<S, SystemClock> {
    /// Session manager using the wall clock.
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: KeyValueStore, C: Clock> CoachSession<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            default_ttl_ms: DEFAULT_CODE_TTL_MS,
        }
    }

    /// Override the TTL used when a caller passes none (or a non-finite one).
    pub fn with_default_ttl(mut self, ttl_ms: i64) -> Self {
        self.default_ttl_ms = ttl_ms;
        self
    }

    pub fn default_ttl_ms(&self) -> i64 {
        self.default_ttl_ms
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ── Session flag ────────────────────────────────────────────────

    /// True iff the flag holds exactly `"true"`. A failed read is "logged out".
    pub fn is_logged_in(&self) -> bool {
        self.store.get(StorageKeys::IS_LOGGED_IN).as_deref() == Some(LOGGED_IN_SENTINEL)
    }

    /// Open the coach session and drop the pending code.
    pub fn mark_logged_in(&self, token: ValidatedCode) {
        let ValidatedCode { _private: () } = token;

        if !self.store.set(StorageKeys::IS_LOGGED_IN, LOGGED_IN_SENTINEL) {
            tracing::warn!("Could not persist coach session flag");
        }
        self.clear_pending_login_code();

        tracing::info!("Coach session opened");
    }

    /// Delete the session flag. Calling it while logged out is a no-op.
    pub fn logout(&self) {
        if !self.store.remove(StorageKeys::IS_LOGGED_IN) {
            tracing::warn!("Could not remove coach session flag");
            return;
        }
        tracing::info!("Coach session closed");
    }

    // ── Pending login code ──────────────────────────────────────────

    /// Store `code` as the pending login code, valid for `ttl_millis`.
    ///
    /// Any finite TTL is used as given (zero and negative included); `None`,
    /// NaN and infinities fall back to the default. Overwrites any previous
    /// pending code. Write failures are logged and otherwise ignored: the next
    /// validation will simply report [`LoginCodeError::NoCodeFound`].
    pub fn set_pending_login_code(&self, code: impl fmt::Display, ttl_millis: Option<f64>) {
        let ttl = resolve_ttl_millis(ttl_millis, self.default_ttl_ms);
        let expires_at = self.clock.now_millis().saturating_add(ttl);

        let code_written = self.store.set(StorageKeys::LOGIN_CODE, &code.to_string());
        let expiry_written = self
            .store
            .set(StorageKeys::LOGIN_EXPIRES, &expires_at.to_string());

        if code_written && expiry_written {
            tracing::info!(ttl_ms = ttl, "Coach login code issued (expires in {}s)", ttl / 1000);
        } else {
            tracing::warn!(
                code_written,
                expiry_written,
                "Coach login code could not be fully persisted"
            );
        }
    }

    /// Read the pending code without side effects.
    pub fn pending_code(&self) -> PendingCode {
        let code = self
            .store
            .get(StorageKeys::LOGIN_CODE)
            .filter(|c| !c.is_empty());
        let expires_at = self
            .store
            .get(StorageKeys::LOGIN_EXPIRES)
            .map(|raw| parse_expiry(&raw))
            .unwrap_or(0);
        PendingCode { code, expires_at }
    }

    /// Check `input` against the pending code.
    ///
    /// Order of checks: missing code or expiry, then expiry (strictly after
    /// `expires_at`, which also clears the code), then string equality.
    /// Success does not touch storage; pass the returned token to
    /// [`Self::mark_logged_in`].
    pub fn validate_login_code(&self, input: Option<&str>) -> Result<ValidatedCode, LoginCodeError> {
        let now = self.clock.now_millis();
        let pending = self.pending_code();

        let saved = match pending.code {
            Some(code) if pending.expires_at != 0 => code,
            _ => {
                tracing::debug!("Login code rejected: no pending code");
                return Err(LoginCodeError::NoCodeFound);
            }
        };

        if now > pending.expires_at {
            self.clear_pending_login_code();
            tracing::debug!(
                expired_ms_ago = now.saturating_sub(pending.expires_at),
                "Login code rejected: expired"
            );
            return Err(LoginCodeError::CodeExpired);
        }

        let input = input.unwrap_or_default();
        if !constant_time_eq(input.as_bytes(), saved.as_bytes()) {
            tracing::debug!("Login code rejected: mismatch");
            return Err(LoginCodeError::CodeMismatch);
        }

        Ok(ValidatedCode { _private: () })
    }

    fn clear_pending_login_code(&self) {
        let code_removed = self.store.remove(StorageKeys::LOGIN_CODE);
        let expiry_removed = self.store.remove(StorageKeys::LOGIN_EXPIRES);
        if !(code_removed && expiry_removed) {
            tracing::warn!("Could not fully clear pending login code");
        }
    }
}

/// Finite TTLs are kept (truncated to whole ms); anything else is the default.
pub fn resolve_ttl_millis(ttl_millis: Option<f64>, default_ms: i64) -> i64 {
    match ttl_millis {
        Some(ttl) if ttl.is_finite() => ttl.trunc() as i64,
        _ => default_ms,
    }
}

/// Base-10 prefix parse: leading whitespace, optional sign, then digits.
/// No digits at all yields `0`; overflow saturates.
fn parse_expiry(raw: &str) -> i64 {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return 0;
    }
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    if negative {
        -magnitude
    } else {
        magnitude
    }
}
