//! The `CryptoProvider` port: KDF, AEAD, and Ed25519 identity primitives.
//!
//! `Handle` is an associated type rather than a boxed trait object because
//! its representation is provider-owned — the engine only ever threads it
//! back through the same provider that minted it. `VaultEngine` is generic
//! over `C: CryptoProvider` for exactly this reason.

use crate::error::CryptoProviderError;

/// Primitives the vault engine needs. A concrete implementation owns its
/// own memory region for identity handles — private key bytes must never
/// be observable from the engine's language-level heap.
pub trait CryptoProvider: Send + Sync {
    /// Opaque handle to a live Ed25519 keypair held in provider-owned
    /// memory.
    type Handle: Send;

    /// Readies the provider. Implementations should make repeated calls
    /// cheap; the engine also short-circuits after the first success.
    fn init(&self) -> Result<(), CryptoProviderError>;

    /// `n` bytes from a CSPRNG.
    fn random(&self, n: usize) -> Vec<u8>;

    /// Argon2id(password, salt) -> 32 bytes. Deterministic for a given
    /// provider build: same password + salt always yields the same key.
    fn derive_key(&self, password: &str, salt: &[u8; 16]) -> [u8; 32];

    /// Derives its own fresh internal salt, encrypts `plaintext` under a
    /// key derived from `password`, and returns a self-describing blob:
    /// `magic(13) || internal_salt(16) || nonce(24) || ciphertext+tag`.
    fn aead_seal(&self, plaintext: &[u8], password: &str) -> Vec<u8>;

    /// Inverse of `aead_seal`. `DecryptFail` covers both a wrong password
    /// and a tampered ciphertext — AEAD makes the two indistinguishable by
    /// construction.
    fn aead_open(&self, blob: &[u8], password: &str) -> Result<Vec<u8>, CryptoProviderError>;

    /// Generates a fresh Ed25519 keypair in provider-owned memory.
    fn new_identity(&self) -> Self::Handle;

    /// Deterministic function of the handle's public key (the "DID").
    fn identity_id(&self, handle: &Self::Handle) -> String;

    /// Raw 32-byte Ed25519 public key.
    fn identity_public_key(&self, handle: &Self::Handle) -> [u8; 32];

    /// `nonce(12) || ciphertext || tag(16)`, ChaCha20-Poly1305 over the
    /// private key bytes under `session_key`.
    fn export_wrapped(&self, handle: &Self::Handle, session_key: &[u8; 32]) -> Vec<u8>;

    /// Inverse of `export_wrapped`.
    fn restore_from_wrapped(
        &self,
        wrapped: &[u8],
        session_key: &[u8; 32],
    ) -> Result<Self::Handle, CryptoProviderError>;

    /// Ed25519 signature over `data`.
    fn sign(&self, handle: &Self::Handle, data: &[u8]) -> [u8; 64];

    /// Explicit wipe. Consumes the handle — callers must not retain
    /// copies of it past this call.
    fn drop_handle(&self, handle: Self::Handle);
}
