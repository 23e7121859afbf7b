//! End-to-end lifecycle checks against every storage backend.

use coachauth::auth::{Clock, ManualClock};
use coachauth::{CoachSession, KeyValueStore, LoginCodeError, MemoryStore, SqliteStore};
use std::sync::Arc;
use tempfile::TempDir;

const T0: i64 = 1_700_000_000_000;
const TTL: f64 = 600_000.0;

/// A store whose every operation fails, like a disabled browser storage.
struct BrokenStore;

impl KeyValueStore for BrokenStore {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: &str) -> bool {
        false
    }

    fn remove(&self, _key: &str) -> bool {
        false
    }
}

type Session<S> = CoachSession<S, Arc<ManualClock>>;

fn with_clock<S: KeyValueStore>(store: S) -> (Arc<ManualClock>, Session<S>) {
    let clock = Arc::new(ManualClock::new(T0));
    let session = CoachSession::with_clock(store, Arc::clone(&clock));
    (clock, session)
}

/// Runs `check` once per backend.
fn for_each_backend(check: impl Fn(&Session<Box<dyn KeyValueStore>>, &ManualClock)) {
    let tmp = TempDir::new().unwrap();
    let backends: Vec<Box<dyn KeyValueStore>> = vec![
        Box::new(MemoryStore::new()),
        Box::new(SqliteStore::open_in_memory().unwrap()),
        Box::new(SqliteStore::open(&tmp.path().join("coach.db")).unwrap()),
    ];
    for store in backends {
        let (clock, session) = with_clock(store);
        check(&session, clock.as_ref());
    }
}

#[test]
fn fresh_code_validates() {
    for_each_backend(|session, _clock| {
        session.set_pending_login_code("482913", Some(TTL));
        assert!(session.validate_login_code(Some("482913")).is_ok());
    });
}

#[test]
fn nothing_pending_on_fresh_storage() {
    for_each_backend(|session, _clock| {
        assert!(!session.is_logged_in());
        assert_eq!(
            session.validate_login_code(Some("482913")).unwrap_err(),
            LoginCodeError::NoCodeFound
        );
    });
}

#[test]
fn expired_code_is_cleared() {
    for_each_backend(|session, clock| {
        session.set_pending_login_code("482913", Some(TTL));
        clock.set(T0 + TTL as i64 + 1);

        assert_eq!(
            session.validate_login_code(Some("482913")).unwrap_err(),
            LoginCodeError::CodeExpired
        );
        assert_eq!(
            session.validate_login_code(Some("482913")).unwrap_err(),
            LoginCodeError::NoCodeFound
        );
    });
}

#[test]
fn exact_expiry_instant_still_valid() {
    for_each_backend(|session, clock| {
        session.set_pending_login_code("482913", Some(TTL));
        clock.set(T0 + TTL as i64);
        assert!(session.validate_login_code(Some("482913")).is_ok());
    });
}

#[test]
fn mismatch_keeps_code_usable() {
    for_each_backend(|session, clock| {
        session.set_pending_login_code("482913", Some(TTL));
        clock.advance(1_000);

        for wrong in ["000000", "48291", "4829130", ""] {
            assert_eq!(
                session.validate_login_code(Some(wrong)).unwrap_err(),
                LoginCodeError::CodeMismatch
            );
        }
        assert!(session.validate_login_code(Some("482913")).is_ok());
    });
}

#[test]
fn mark_logged_in_clears_pending_code() {
    for_each_backend(|session, _clock| {
        session.set_pending_login_code("482913", Some(TTL));
        let token = session.validate_login_code(Some("482913")).unwrap();
        session.mark_logged_in(token);

        assert!(session.is_logged_in());
        assert_eq!(
            session.validate_login_code(Some("482913")).unwrap_err(),
            LoginCodeError::NoCodeFound
        );
    });
}

#[test]
fn logout_is_idempotent() {
    for_each_backend(|session, _clock| {
        session.logout();
        assert!(!session.is_logged_in());
        session.logout();
        assert!(!session.is_logged_in());
    });
}

#[test]
fn full_scenario() {
    for_each_backend(|session, clock| {
        session.set_pending_login_code("482913", Some(600_000.0));
        clock.advance(1_000);

        let token = session.validate_login_code(Some("482913")).unwrap();
        session.mark_logged_in(token);
        assert!(session.is_logged_in());

        session.logout();
        assert!(!session.is_logged_in());
    });
}

#[test]
fn two_sessions_share_one_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("coach.db");
    let clock = Arc::new(ManualClock::new(T0));

    let front_desk = CoachSession::with_clock(SqliteStore::open(&path).unwrap(), Arc::clone(&clock));
    let dashboard = CoachSession::with_clock(SqliteStore::open(&path).unwrap(), Arc::clone(&clock));

    front_desk.set_pending_login_code("123456", None);
    let token = dashboard.validate_login_code(Some("123456")).unwrap();
    dashboard.mark_logged_in(token);

    assert!(front_desk.is_logged_in());
    assert!(!front_desk.pending_code().is_present());

    front_desk.logout();
    assert!(!dashboard.is_logged_in());
}

#[test]
fn broken_storage_fails_closed() {
    let (clock, session) = with_clock(BrokenStore);

    session.set_pending_login_code("482913", Some(TTL));
    assert_eq!(
        session.validate_login_code(Some("482913")).unwrap_err(),
        LoginCodeError::NoCodeFound
    );
    assert!(!session.is_logged_in());

    session.logout();
    assert!(!session.is_logged_in());
    assert_eq!(clock.now_millis(), T0);
}

#[test]
fn default_session_uses_wall_clock() {
    let session = CoachSession::new(MemoryStore::new());
    session.set_pending_login_code("1", None);
    assert!(session.validate_login_code(Some("1")).is_ok());
}
