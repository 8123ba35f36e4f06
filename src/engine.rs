//! `VaultEngine` — the façade orchestrating `EnvelopeCodec`, `CryptoProvider`,
//! `BlobStore`, and `SessionState` into register/login/recover/secret
//! operations.
//!
//! Generic over `C: CryptoProvider` rather than boxed as `Arc<dyn
//! CryptoProvider>` — `CryptoProvider::Handle` is an associated type, so a
//! trait object would need to erase it. `BlobStore` has no such
//! constraint and is held as `Arc<dyn BlobStore>` instead.

use crate::codec::EnvelopeCodec;
use crate::error::{CryptoProviderError, VaultError};
use crate::ports::crypto::CryptoProvider;
use crate::ports::store::BlobStore;
use crate::session::SessionState;
use crate::types::{InternalPayload, RecoveryCode};

use std::sync::Arc;
use tokio::sync::Mutex;
use zeroize::Zeroize;

/// Coarse engine lifecycle, tracked for diagnostics and for `init`/`lock`/
/// `dispose`'s documented transitions. Not consulted to gate every
/// operation — `SessionState` is still the source of truth for whether a
/// session is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Uninit,
    Ready,
    Locked,
    Unlocked,
    Error,
    Disposed,
}

pub struct RegisterOutcome {
    pub id: String,
    pub recovery_code: String,
}

pub struct LoginOutcome {
    pub id: String,
    pub public_key: [u8; 32],
}

/// `recover` input. `id` pins the target identity when the store holds
/// more than one; `rotate` requests a fresh recovery code in the same
/// call.
pub struct RecoverRequest {
    pub recovery_code: String,
    pub new_password: String,
    pub id: Option<String>,
    pub rotate: bool,
}

pub struct RecoverOutcome {
    pub id: String,
    pub new_recovery_code: Option<String>,
}

pub struct VaultEngine<C: CryptoProvider> {
    crypto: C,
    store: Arc<dyn BlobStore>,
    session: SessionState<C::Handle>,
    status: Mutex<EngineStatus>,
    /// Held for the full duration of every state-mutating operation
    /// (`register`/`login`/`recover`/`save_secret`/`delete_secret`) so
    /// concurrent calls on the same engine serialize in call order
    /// instead of interleaving their read-modify-write sequences against
    /// the store.
    op_lock: Mutex<()>,
}

impl<C: CryptoProvider> VaultEngine<C> {
    pub fn new(crypto: C, store: Arc<dyn BlobStore>) -> Self {
        Self {
            crypto,
            store,
            session: SessionState::new(),
            status: Mutex::new(EngineStatus::Uninit),
            op_lock: Mutex::new(()),
        }
    }

    pub async fn status(&self) -> EngineStatus {
        *self.status.lock().await
    }

    /// Idempotent: a second call is a no-op. Fails permanently with
    /// `Disposed` after `dispose()`.
    pub async fn init(&self) -> Result<(), VaultError> {
        let mut status = self.status.lock().await;
        match *status {
            EngineStatus::Disposed => return Err(VaultError::Disposed),
            EngineStatus::Uninit => {}
            _ => return Ok(()),
        }

        if let Err(e) = self.crypto.init() {
            *status = EngineStatus::Error;
            return Err(VaultError::InitializationError(e.to_string()));
        }

        *status = self.ready_or_locked()?;
        tracing::info!(status = ?*status, "vault engine initialized");
        Ok(())
    }

    fn ready_or_locked(&self) -> Result<EngineStatus, VaultError> {
        let ids = self
            .store
            .list_ids()
            .map_err(|e| VaultError::StorageError(e.to_string()))?;
        Ok(if ids.is_empty() {
            EngineStatus::Ready
        } else {
            EngineStatus::Locked
        })
    }

    async fn require_initialized(&self) -> Result<(), VaultError> {
        match *self.status.lock().await {
            EngineStatus::Disposed => Err(VaultError::Disposed),
            EngineStatus::Uninit => Err(VaultError::InitializationError(
                "engine not initialized".into(),
            )),
            _ => Ok(()),
        }
    }

    /// Narrower than `require_initialized`: only rejects a disposed
    /// engine. Used on session-scoped operations (`get_id`, `sign`,
    /// `get_secret`, `list_secret_keys`, `save_secret`, `delete_secret`)
    /// so an uninitialized-but-not-disposed engine still falls through to
    /// `SessionState`'s own `NotAuthenticated`, matching the documented
    /// per-operation error set.
    async fn require_not_disposed(&self) -> Result<(), VaultError> {
        match *self.status.lock().await {
            EngineStatus::Disposed => Err(VaultError::Disposed),
            _ => Ok(()),
        }
    }

    // -----------------------------------------------------------------
    // register
    // -----------------------------------------------------------------

    pub async fn register(&self, password: &str) -> Result<RegisterOutcome, VaultError> {
        self.require_initialized().await?;
        let _op = self.op_lock.lock().await;

        let handle = self.crypto.new_identity();
        let id = self.crypto.identity_id(&handle);

        let salt = self.as_16_bytes(self.crypto.random(16))?;
        let mut session_key = self.crypto.derive_key(password, &salt);
        let wrapped = self.crypto.export_wrapped(&handle, &session_key);

        let payload = InternalPayload::new(id.clone(), wrapped, salt.to_vec());
        let plaintext = EnvelopeCodec::serialize_payload(&payload)?;
        let main_ct = self.crypto.aead_seal(&plaintext, password);

        let recovery_bytes = self.as_16_bytes(self.crypto.random(16))?;
        let recovery_code = RecoveryCode::format(&recovery_bytes);
        let recovery_ct = self.crypto.aead_seal(&plaintext, &recovery_code);

        let envelope =
            EnvelopeCodec::make_envelope(&id, salt.to_vec(), main_ct, Some(recovery_ct));

        if let Err(e) = self.store.put(&id, envelope) {
            session_key.zeroize();
            self.crypto.drop_handle(handle);
            return Err(e);
        }

        self.session
            .establish(
                &self.crypto,
                handle,
                session_key,
                id.clone(),
                password.to_string(),
                std::collections::HashMap::new(),
            )
            .await;
        *self.status.lock().await = EngineStatus::Unlocked;

        tracing::info!(id = %id, "identity registered");
        Ok(RegisterOutcome { id, recovery_code })
    }

    // -----------------------------------------------------------------
    // login
    // -----------------------------------------------------------------

    pub async fn login(
        &self,
        password: &str,
        id: Option<&str>,
    ) -> Result<LoginOutcome, VaultError> {
        self.require_initialized().await?;
        let _op = self.op_lock.lock().await;

        let target = self.resolve_target(id)?;
        let envelope = self
            .store
            .get(&target)?
            .ok_or_else(|| VaultError::AuthenticationFailed("not found".into()))?;

        let plaintext = self.crypto.aead_open(&envelope.main_ct, password).map_err(
            |_: CryptoProviderError| VaultError::AuthenticationFailed("bad password".into()),
        )?;
        let payload = EnvelopeCodec::parse_payload(&plaintext)?;
        if payload.id != target {
            return Err(VaultError::IntegrityError);
        }

        let salt = self.as_16_bytes(payload.salt.clone())?;
        let mut session_key = self.crypto.derive_key(password, &salt);
        let handle = match self.crypto.restore_from_wrapped(&payload.wrapped, &session_key) {
            Ok(h) => h,
            Err(_) => {
                session_key.zeroize();
                return Err(VaultError::AuthenticationFailed(
                    "could not restore identity".into(),
                ));
            }
        };
        let public_key = self.crypto.identity_public_key(&handle);

        self.session
            .establish(
                &self.crypto,
                handle,
                session_key,
                target.clone(),
                password.to_string(),
                payload.secrets,
            )
            .await;
        *self.status.lock().await = EngineStatus::Unlocked;

        tracing::info!(id = %target, "login succeeded");
        Ok(LoginOutcome {
            id: target,
            public_key,
        })
    }

    fn resolve_target(&self, id: Option<&str>) -> Result<String, VaultError> {
        match id {
            Some(id) => Ok(id.to_string()),
            None => {
                let ids = self.store.list_ids()?;
                ids.into_iter()
                    .next()
                    .ok_or_else(|| VaultError::AuthenticationFailed("no identities".into()))
            }
        }
    }

    // -----------------------------------------------------------------
    // recover
    // -----------------------------------------------------------------

    /// Pure identity recovery: rewraps the frozen recovery payload under
    /// a new password. Does NOT establish a session — callers must
    /// `login` with `new_password` afterward.
    pub async fn recover(&self, request: RecoverRequest) -> Result<RecoverOutcome, VaultError> {
        self.require_initialized().await?;
        let _op = self.op_lock.lock().await;

        let target = self.resolve_target(request.id.as_deref())?;
        let mut envelope = self
            .store
            .get(&target)?
            .ok_or_else(|| VaultError::AuthenticationFailed("not found".into()))?;
        let recovery_ct = envelope
            .recovery_ct
            .clone()
            .ok_or(VaultError::RecoveryUnavailable)?;

        let plaintext = self
            .crypto
            .aead_open(&recovery_ct, &request.recovery_code)
            .map_err(|_: CryptoProviderError| {
                VaultError::AuthenticationFailed("invalid recovery code".into())
            })?;
        EnvelopeCodec::parse_payload(&plaintext)?;

        let new_main_ct = self.crypto.aead_seal(&plaintext, &request.new_password);
        let new_recovery_code = if request.rotate {
            let bytes = self.as_16_bytes(self.crypto.random(16))?;
            let code = RecoveryCode::format(&bytes);
            envelope.recovery_ct = Some(self.crypto.aead_seal(&plaintext, &code));
            Some(code)
        } else {
            None
        };

        envelope.main_ct = new_main_ct;
        envelope.updated_at = chrono::Utc::now().timestamp_millis();
        self.store.put(&target, envelope)?;

        tracing::info!(id = %target, rotated = request.rotate, "identity recovered");
        Ok(RecoverOutcome {
            id: target,
            new_recovery_code,
        })
    }

    // -----------------------------------------------------------------
    // secrets
    // -----------------------------------------------------------------

    pub async fn save_secret(&self, key: &str, value: &str) -> Result<(), VaultError> {
        self.require_not_disposed().await?;
        let _op = self.op_lock.lock().await;

        let id = self.session.get_id().await?;
        let password = self.session.get_password().await?;

        let mut envelope = self
            .store
            .get(&id)?
            .ok_or_else(|| VaultError::StorageError("corruption".into()))?;
        let plaintext = self
            .crypto
            .aead_open(&envelope.main_ct, &password)
            .map_err(|e: CryptoProviderError| VaultError::CryptoError(e.to_string()))?;
        let mut payload = EnvelopeCodec::parse_payload(&plaintext)?;

        self.session.set_secret(key.to_string(), value.to_string()).await?;
        payload.secrets = self.session.get_all_secrets().await?;
        payload.modified_at = chrono::Utc::now().timestamp_millis();

        let new_ct = self
            .crypto
            .aead_seal(&EnvelopeCodec::serialize_payload(&payload)?, &password);
        envelope.main_ct = new_ct;
        envelope.updated_at = chrono::Utc::now().timestamp_millis();

        self.store.put(&id, envelope)
    }

    pub async fn delete_secret(&self, key: &str) -> Result<(), VaultError> {
        self.require_not_disposed().await?;
        let _op = self.op_lock.lock().await;

        let id = self.session.get_id().await?;
        let password = self.session.get_password().await?;

        let mut envelope = self
            .store
            .get(&id)?
            .ok_or_else(|| VaultError::StorageError("corruption".into()))?;
        let plaintext = self
            .crypto
            .aead_open(&envelope.main_ct, &password)
            .map_err(|e: CryptoProviderError| VaultError::CryptoError(e.to_string()))?;
        let mut payload = EnvelopeCodec::parse_payload(&plaintext)?;

        self.session.delete_secret(key).await?;
        payload.secrets = self.session.get_all_secrets().await?;
        payload.modified_at = chrono::Utc::now().timestamp_millis();

        let new_ct = self
            .crypto
            .aead_seal(&EnvelopeCodec::serialize_payload(&payload)?, &password);
        envelope.main_ct = new_ct;
        envelope.updated_at = chrono::Utc::now().timestamp_millis();

        self.store.put(&id, envelope)
    }

    pub async fn get_secret(&self, key: &str) -> Result<Option<String>, VaultError> {
        self.require_not_disposed().await?;
        self.session.get_secret(key).await
    }

    pub async fn list_secret_keys(&self) -> Result<Vec<String>, VaultError> {
        self.require_not_disposed().await?;
        self.session.list_secret_keys().await
    }

    // -----------------------------------------------------------------
    // sign, lock, dispose, status queries
    // -----------------------------------------------------------------

    pub async fn sign(&self, data: &[u8]) -> Result<[u8; 64], VaultError> {
        self.require_not_disposed().await?;
        self.session.sign(&self.crypto, data).await
    }

    pub async fn lock(&self) -> Result<(), VaultError> {
        self.session.clear(&self.crypto).await;
        if *self.status.lock().await != EngineStatus::Disposed {
            *self.status.lock().await = self.ready_or_locked()?;
        }
        Ok(())
    }

    pub async fn dispose(&self) -> Result<(), VaultError> {
        self.session.clear(&self.crypto).await;
        *self.status.lock().await = EngineStatus::Disposed;
        tracing::info!("vault engine disposed");
        Ok(())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.is_authenticated().await
    }

    pub async fn get_id(&self) -> Result<String, VaultError> {
        self.require_not_disposed().await?;
        self.session.get_id().await
    }

    pub async fn list_stored_ids(&self) -> Result<Vec<String>, VaultError> {
        self.require_initialized().await?;
        self.store.list_ids()
    }

    fn as_16_bytes(&self, bytes: Vec<u8>) -> Result<[u8; 16], VaultError> {
        bytes
            .try_into()
            .map_err(|_| VaultError::CryptoError("random(16) returned wrong length".into()))
    }
}
