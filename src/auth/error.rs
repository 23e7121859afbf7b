use serde::Serialize;

/// Why a login code was rejected.
///
/// The display strings are what the UI shows the coach. Storage faults are
/// deliberately absent: the store reports them as missing data, which lands
/// in [`LoginCodeError::NoCodeFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum LoginCodeError {
    /// No pending code, or its expiry is missing/unusable.
    #[error("no code found")]
    NoCodeFound,
    /// A pending code existed but its expiry has passed. It has been cleared.
    #[error("code expired")]
    CodeExpired,
    /// Input does not match the pending code. The code stays usable.
    #[error("incorrect code")]
    CodeMismatch,
}

impl LoginCodeError {
    /// Whether the caller should ask for a fresh code rather than retry.
    pub fn is_recoverable_by_new_code(&self) -> bool {
        matches!(self, Self::NoCodeFound | Self::CodeExpired)
    }
}
