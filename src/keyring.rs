//! `IdentityKeyring` — the thin owner of a live `CryptoProvider` handle.
//!
//! Keeps almost no state of its own: the keyring never inspects or
//! copies the handle's private material, it only threads it back through
//! the provider that minted it.

use crate::ports::crypto::CryptoProvider;

/// Owns at most one live identity handle. `None` means no identity is
/// currently resident (locked, or never registered/logged in).
pub struct IdentityKeyring<H> {
    handle: Option<H>,
}

impl<H> IdentityKeyring<H> {
    pub fn empty() -> Self {
        Self { handle: None }
    }

    pub fn holding(handle: H) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    pub fn is_holding(&self) -> bool {
        self.handle.is_some()
    }

    pub fn id<C: CryptoProvider<Handle = H>>(&self, crypto: &C) -> Option<String> {
        self.handle.as_ref().map(|h| crypto.identity_id(h))
    }

    pub fn public_key<C: CryptoProvider<Handle = H>>(&self, crypto: &C) -> Option<[u8; 32]> {
        self.handle.as_ref().map(|h| crypto.identity_public_key(h))
    }

    pub fn sign<C: CryptoProvider<Handle = H>>(&self, crypto: &C, data: &[u8]) -> Option<[u8; 64]> {
        self.handle.as_ref().map(|h| crypto.sign(h, data))
    }

    pub fn export_wrapped<C: CryptoProvider<Handle = H>>(
        &self,
        crypto: &C,
        session_key: &[u8; 32],
    ) -> Option<Vec<u8>> {
        self.handle
            .as_ref()
            .map(|h| crypto.export_wrapped(h, session_key))
    }

    /// Replaces whatever handle is currently held, tearing down the old
    /// one first if present.
    pub fn replace<C: CryptoProvider<Handle = H>>(&mut self, crypto: &C, handle: H) {
        self.teardown(crypto);
        self.handle = Some(handle);
    }

    /// Explicit wipe. Must be called on every path that ends a session
    /// (lock, dispose, failed login cleanup) — `Drop` cannot reach the
    /// provider needed to call `CryptoProvider::drop_handle`, so this is
    /// the only place the handle is actually destroyed.
    pub fn teardown<C: CryptoProvider<Handle = H>>(&mut self, crypto: &C) {
        if let Some(handle) = self.handle.take() {
            crypto.drop_handle(handle);
        }
    }
}

impl<H> Default for IdentityKeyring<H> {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Argon2ChaChaEd25519Provider;

    #[test]
    fn empty_keyring_has_no_identity() {
        let crypto = Argon2ChaChaEd25519Provider::new();
        let keyring: IdentityKeyring<_> = IdentityKeyring::empty();
        assert!(!keyring.is_holding());
        assert_eq!(keyring.id(&crypto), None);
    }

    #[test]
    fn holding_exposes_id_and_public_key() {
        let crypto = Argon2ChaChaEd25519Provider::new();
        let handle = crypto.new_identity();
        let mut keyring = IdentityKeyring::holding(handle);

        assert!(keyring.is_holding());
        assert!(keyring.id(&crypto).unwrap().starts_with("did:key:"));
        assert!(keyring.public_key(&crypto).is_some());

        keyring.teardown(&crypto);
        assert!(!keyring.is_holding());
    }

    #[test]
    fn replace_tears_down_previous_handle() {
        let crypto = Argon2ChaChaEd25519Provider::new();
        let mut keyring = IdentityKeyring::holding(crypto.new_identity());
        let first_id = keyring.id(&crypto).unwrap();

        keyring.replace(&crypto, crypto.new_identity());
        let second_id = keyring.id(&crypto).unwrap();
        assert_ne!(first_id, second_id);
    }
}
