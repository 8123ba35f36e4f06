//! Error types for the vault engine.
//!
//! All engine operations return `Result<_, VaultError>`. The engine never
//! retries; every variant propagates to the caller as-is. `CryptoError` and
//! `StorageError` may carry a cause string, but that string is always the
//! underlying provider/store error's own `Display` output — never a
//! plaintext secret, password, or session key.

use std::fmt;

#[derive(Debug)]
pub enum VaultError {
    /// The engine has not been initialized, or the crypto provider's
    /// `init()` failed.
    InitializationError(String),
    /// Wrong password, wrong recovery code, or unknown identity. The
    /// engine intentionally does not distinguish which.
    AuthenticationFailed(String),
    /// The operation requires an unlocked session, and none exists.
    NotAuthenticated,
    /// The envelope decrypted, but its inner `id` does not match the
    /// identifier it was stored under.
    IntegrityError,
    /// The envelope decrypted, but the payload inside it did not parse.
    CorruptData,
    /// `recover` was called on an envelope with no `recovery_ct`.
    RecoveryUnavailable,
    /// A crypto primitive failed in a way that is not itself an
    /// authentication decision (e.g. malformed provider output).
    CryptoError(String),
    /// The blob store failed.
    StorageError(String),
    /// The engine has been disposed; no further operations are possible.
    Disposed,
}

impl fmt::Display for VaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitializationError(msg) => write!(f, "initialization error: {msg}"),
            Self::AuthenticationFailed(msg) => write!(f, "authentication failed: {msg}"),
            Self::NotAuthenticated => write!(f, "not authenticated"),
            Self::IntegrityError => write!(f, "envelope integrity error"),
            Self::CorruptData => write!(f, "corrupt payload data"),
            Self::RecoveryUnavailable => write!(f, "recovery not available for this identity"),
            Self::CryptoError(msg) => write!(f, "crypto error: {msg}"),
            Self::StorageError(msg) => write!(f, "storage error: {msg}"),
            Self::Disposed => write!(f, "engine has been disposed"),
        }
    }
}

impl std::error::Error for VaultError {}

/// Result of a `CryptoProvider::aead_open`/`restore_from_wrapped` call.
/// Kept distinct from `VaultError` at the port boundary so the engine is
/// the single place that decides how `DecryptFail` surfaces — wrong
/// password and tampered ciphertext must be indistinguishable from the
/// caller's point of view (AEAD guarantees this; the type system here
/// just keeps the engine from accidentally leaking the distinction).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecryptFail;

impl fmt::Display for DecryptFail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "decryption failed")
    }
}

impl std::error::Error for DecryptFail {}

/// Errors a `CryptoProvider` implementation can raise. `DecryptFail` is
/// the one variant the engine is forbidden from narrating further.
#[derive(Debug)]
pub enum CryptoProviderError {
    DecryptFail,
    Unsupported(String),
    Other(String),
}

impl fmt::Display for CryptoProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DecryptFail => write!(f, "decryption failed"),
            Self::Unsupported(msg) => write!(f, "unsupported environment: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for CryptoProviderError {}
