//! `SessionState` — the in-memory unlocked state: identity handle, session
//! key, cached password, and the decrypted secrets map.
//!
//! Guarded by a `tokio::sync::Mutex` — the engine's own methods are
//! already `async fn`, so awaiting the lock costs nothing extra on the
//! call path.

use crate::error::VaultError;
use crate::keyring::IdentityKeyring;
use crate::ports::crypto::CryptoProvider;

use std::collections::HashMap;
use tokio::sync::Mutex;
use zeroize::Zeroize;

/// The live, authenticated session bundle. Dropping one without going
/// through `SessionState::clear` leaks the identity handle (it is not
/// torn down by `Drop` — see `IdentityKeyring::teardown`); `SessionState`
/// never drops a bundle any other way.
struct SessionBundle<H> {
    keyring: IdentityKeyring<H>,
    session_key: [u8; 32],
    id: String,
    password: String,
    secrets: HashMap<String, String>,
}

impl<H> SessionBundle<H> {
    fn wipe(&mut self) {
        self.session_key.zeroize();
        self.password.zeroize();
        for value in self.secrets.values_mut() {
            value.zeroize();
        }
        self.secrets.clear();
    }
}

/// Holds at most one `SessionBundle`. All accessors fail with
/// `VaultError::NotAuthenticated` when no session exists.
pub struct SessionState<H> {
    bundle: Mutex<Option<SessionBundle<H>>>,
}

impl<H> SessionState<H> {
    pub fn new() -> Self {
        Self {
            bundle: Mutex::new(None),
        }
    }

    /// Installs a freshly authenticated session, tearing down any prior
    /// one first. Takes ownership of `secrets` by deep copy so the
    /// caller's map cannot be mutated afterward to leak into the session.
    pub async fn establish<C: CryptoProvider<Handle = H>>(
        &self,
        crypto: &C,
        handle: H,
        session_key: [u8; 32],
        id: String,
        password: String,
        secrets: HashMap<String, String>,
    ) {
        let mut slot = self.bundle.lock().await;
        if let Some(mut prior) = slot.take() {
            prior.keyring.teardown(crypto);
            prior.wipe();
        }
        *slot = Some(SessionBundle {
            keyring: IdentityKeyring::holding(handle),
            session_key,
            id,
            password,
            secrets,
        });
    }

    /// Drops the handle, wipes the session key/password/secrets.
    /// Idempotent: calling this with no active session is a no-op.
    pub async fn clear<C: CryptoProvider<Handle = H>>(&self, crypto: &C) {
        let mut slot = self.bundle.lock().await;
        if let Some(mut bundle) = slot.take() {
            bundle.keyring.teardown(crypto);
            bundle.wipe();
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.bundle.lock().await.is_some()
    }

    pub async fn get_id(&self) -> Result<String, VaultError> {
        let slot = self.bundle.lock().await;
        slot.as_ref()
            .map(|b| b.id.clone())
            .ok_or(VaultError::NotAuthenticated)
    }

    pub async fn get_session_key(&self) -> Result<[u8; 32], VaultError> {
        let slot = self.bundle.lock().await;
        slot.as_ref()
            .map(|b| b.session_key)
            .ok_or(VaultError::NotAuthenticated)
    }

    pub async fn get_password(&self) -> Result<String, VaultError> {
        let slot = self.bundle.lock().await;
        slot.as_ref()
            .map(|b| b.password.clone())
            .ok_or(VaultError::NotAuthenticated)
    }

    pub async fn get_secret(&self, key: &str) -> Result<Option<String>, VaultError> {
        let slot = self.bundle.lock().await;
        slot.as_ref()
            .map(|b| b.secrets.get(key).cloned())
            .ok_or(VaultError::NotAuthenticated)
    }

    pub async fn set_secret(&self, key: String, value: String) -> Result<(), VaultError> {
        let mut slot = self.bundle.lock().await;
        let bundle = slot.as_mut().ok_or(VaultError::NotAuthenticated)?;
        bundle.secrets.insert(key, value);
        Ok(())
    }

    pub async fn delete_secret(&self, key: &str) -> Result<(), VaultError> {
        let mut slot = self.bundle.lock().await;
        let bundle = slot.as_mut().ok_or(VaultError::NotAuthenticated)?;
        bundle.secrets.remove(key);
        Ok(())
    }

    /// Returns a copy of the cached secrets map.
    pub async fn get_all_secrets(&self) -> Result<HashMap<String, String>, VaultError> {
        let slot = self.bundle.lock().await;
        slot.as_ref()
            .map(|b| b.secrets.clone())
            .ok_or(VaultError::NotAuthenticated)
    }

    pub async fn list_secret_keys(&self) -> Result<Vec<String>, VaultError> {
        let slot = self.bundle.lock().await;
        slot.as_ref()
            .map(|b| b.secrets.keys().cloned().collect())
            .ok_or(VaultError::NotAuthenticated)
    }

    pub async fn sign<C: CryptoProvider<Handle = H>>(
        &self,
        crypto: &C,
        data: &[u8],
    ) -> Result<[u8; 64], VaultError> {
        let slot = self.bundle.lock().await;
        let bundle = slot.as_ref().ok_or(VaultError::NotAuthenticated)?;
        bundle
            .keyring
            .sign(crypto, data)
            .ok_or(VaultError::NotAuthenticated)
    }

    pub async fn get_public_key<C: CryptoProvider<Handle = H>>(
        &self,
        crypto: &C,
    ) -> Result<[u8; 32], VaultError> {
        let slot = self.bundle.lock().await;
        let bundle = slot.as_ref().ok_or(VaultError::NotAuthenticated)?;
        bundle
            .keyring
            .public_key(crypto)
            .ok_or(VaultError::NotAuthenticated)
    }
}

impl<H> Default for SessionState<H> {
    fn default() -> Self {
        Self::new()
    }
}
