//! Coach credential gate and login-code issuance.
//!
//! The reservation site admits the coach with a single configured
//! email/password pair. A successful check issues a fresh numeric login
//! code, stores it as pending on the session, and returns it so the caller
//! can deliver it (screen, email, SMS).

use super::clock::Clock;
use super::constant_time_eq;
use super::session::CoachSession;
use super::storage::KeyValueStore;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Default number of digits in a login code.
pub const DEFAULT_CODE_LENGTH: usize = 6;

/// Longest code we generate; keeps `10^len` inside a `u128` comfortably.
const MAX_CODE_LENGTH: usize = 18;

/// The one coach account.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoachCredentials {
    #[serde(default = "default_email")]
    pub email: String,
    #[serde(default = "default_password")]
    pub password: String,
}

fn default_email() -> String {
    "coach@afroboost.com".into()
}

fn default_password() -> String {
    "Afroboost2026".into()
}

impl Default for CoachCredentials {
    fn default() -> Self {
        Self {
            email: default_email(),
            password: default_password(),
        }
    }
}

impl std::fmt::Debug for CoachCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoachCredentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

impl CoachCredentials {
    /// Exact email match, constant-time password match.
    pub fn verify(&self, email: &str, password: &str) -> bool {
        let email_ok = email == self.email;
        let password_ok = constant_time_eq(password.as_bytes(), self.password.as_bytes());
        email_ok && password_ok
    }
}

/// Random zero-padded numeric code of `len` digits (clamped to 1..=18).
pub fn generate_login_code(len: usize) -> String {
    let len = len.clamp(1, MAX_CODE_LENGTH);
    let modulus = 10u128.pow(len as u32);
    let value = uuid::Uuid::new_v4().as_u128() % modulus;
    format!("{value:0len$}")
}

/// Check the coach's credentials and, if they match, set a fresh pending
/// login code on `session` and return it.
pub fn issue_login_code<S: KeyValueStore, C: Clock>(
    session: &CoachSession<S, C>,
    credentials: &CoachCredentials,
    email: &str,
    password: &str,
    code_length: usize,
    ttl_millis: Option<f64>,
) -> Result<String> {
    if !credentials.verify(email.trim(), password) {
        tracing::warn!("Coach login refused: invalid credentials");
        bail!("invalid email or password");
    }

    let code = generate_login_code(code_length);
    session.set_pending_login_code(&code, ttl_millis);
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::storage::MemoryStore;

    #[test]
    fn default_credentials_verify() {
        let creds = CoachCredentials::default();
        assert!(creds.verify("coach@afroboost.com", "Afroboost2026"));
        assert!(!creds.verify("coach@afroboost.com", "afroboost2026"));
        assert!(!creds.verify("Coach@afroboost.com", "Afroboost2026"));
        assert!(!creds.verify("", ""));
    }

    #[test]
    fn debug_hides_password() {
        let rendered = format!("{:?}", CoachCredentials::default());
        assert!(rendered.contains("coach@afroboost.com"));
        assert!(!rendered.contains("Afroboost2026"));
    }

    #[test]
    fn generated_code_shape() {
        for len in [1, 4, 6, 10] {
            let code = generate_login_code(len);
            assert_eq!(code.len(), len);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn generated_code_length_is_clamped() {
        assert_eq!(generate_login_code(0).len(), 1);
        assert_eq!(generate_login_code(64).len(), MAX_CODE_LENGTH);
    }

    #[test]
    fn issue_sets_pending_code() {
        let session = CoachSession::new(MemoryStore::new());
        let creds = CoachCredentials::default();

        let code = issue_login_code(
            &session,
            &creds,
            " coach@afroboost.com ",
            "Afroboost2026",
            DEFAULT_CODE_LENGTH,
            None,
        )
        .unwrap();

        assert_eq!(code.len(), DEFAULT_CODE_LENGTH);
        let token = session.validate_login_code(Some(code.as_str())).unwrap();
        session.mark_logged_in(token);
        assert!(session.is_logged_in());
    }

    #[test]
    fn issue_with_bad_password_stores_nothing() {
        let session = CoachSession::new(MemoryStore::new());
        let creds = CoachCredentials::default();

        let err = issue_login_code(&session, &creds, "coach@afroboost.com", "nope", 6, None)
            .unwrap_err();
        assert!(err.to_string().contains("invalid email or password"));
        assert!(session.store().is_empty());
    }
}
