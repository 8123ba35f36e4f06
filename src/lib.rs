//! Client-side encrypted identity vault core.
//!
//! An authenticated envelope format with two independent unlock paths
//! (password and one-shot recovery code), a session lifecycle that holds
//! private key material only for the session's lifetime, and the two
//! ports (`CryptoProvider`, `BlobStore`) a host application implements to
//! supply real cryptography and real persistence.
//!
//! ```no_run
//! use identity_vault::crypto::Argon2ChaChaEd25519Provider;
//! use identity_vault::ports::InMemoryBlobStore;
//! use identity_vault::VaultEngine;
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), identity_vault::VaultError> {
//! let engine = VaultEngine::new(
//!     Argon2ChaChaEd25519Provider::new(),
//!     Arc::new(InMemoryBlobStore::new()),
//! );
//! engine.init().await?;
//! let outcome = engine.register("correct horse battery staple").await?;
//! engine.save_secret("api-key", "s3kret").await?;
//! engine.lock().await?;
//! engine.login("correct horse battery staple", Some(&outcome.id)).await?;
//! assert_eq!(engine.get_secret("api-key").await?.as_deref(), Some("s3kret"));
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod keyring;
pub mod ports;
pub mod session;
pub mod types;

pub use codec::EnvelopeCodec;
pub use engine::{EngineStatus, LoginOutcome, RecoverOutcome, RecoverRequest, RegisterOutcome, VaultEngine};
pub use error::{CryptoProviderError, VaultError};
pub use keyring::IdentityKeyring;
pub use ports::{BlobStore, CryptoProvider};
pub use session::SessionState;
pub use types::{EnvelopeBlob, InternalPayload, RecoveryCode, ENVELOPE_SCHEMA_VERSION};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Argon2ChaChaEd25519Provider;
    use crate::ports::InMemoryBlobStore;
    use std::sync::Arc;

    fn new_engine() -> VaultEngine<Argon2ChaChaEd25519Provider> {
        VaultEngine::new(
            Argon2ChaChaEd25519Provider::new(),
            Arc::new(InMemoryBlobStore::new()),
        )
    }

    #[tokio::test]
    async fn register_login_read() {
        let engine = new_engine();
        engine.init().await.unwrap();

        let outcome = engine.register("pw1").await.unwrap();
        assert!(engine.is_authenticated().await);
        assert_eq!(engine.get_id().await.unwrap(), outcome.id);
        assert!(engine.list_stored_ids().await.unwrap().contains(&outcome.id));

        engine.save_secret("k", "v").await.unwrap();
        engine.lock().await.unwrap();
        assert!(!engine.is_authenticated().await);

        let login = engine.login("pw1", Some(&outcome.id)).await.unwrap();
        assert_eq!(login.id, outcome.id);
        assert_eq!(engine.get_secret("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn wrong_password_fails_and_leaves_locked() {
        let engine = new_engine();
        engine.init().await.unwrap();
        let outcome = engine.register("pw1").await.unwrap();
        engine.lock().await.unwrap();

        let err = engine.login("pw2", Some(&outcome.id)).await.unwrap_err();
        assert!(matches!(err, VaultError::AuthenticationFailed(_)));
        assert!(!engine.is_authenticated().await);
    }

    #[tokio::test]
    async fn overwriting_a_secret_keeps_only_the_latest_value() {
        let engine = new_engine();
        engine.init().await.unwrap();
        engine.register("pw1").await.unwrap();

        engine.save_secret("k", "v1").await.unwrap();
        engine.save_secret("k", "v2").await.unwrap();
        assert_eq!(engine.get_secret("k").await.unwrap().as_deref(), Some("v2"));
        assert_eq!(engine.list_secret_keys().await.unwrap(), vec!["k".to_string()]);
    }

    #[tokio::test]
    async fn recovery_without_rotation() {
        let engine = new_engine();
        engine.init().await.unwrap();
        let outcome = engine.register("pw1").await.unwrap();
        engine.lock().await.unwrap();

        let recovered = engine
            .recover(RecoverRequest {
                recovery_code: outcome.recovery_code.clone(),
                new_password: "pw2".into(),
                id: Some(outcome.id.clone()),
                rotate: false,
            })
            .await
            .unwrap();
        assert_eq!(recovered.id, outcome.id);
        assert!(recovered.new_recovery_code.is_none());
        assert!(!engine.is_authenticated().await);

        engine.login("pw2", Some(&outcome.id)).await.unwrap();
        engine.lock().await.unwrap();
        let err = engine.login("pw1", Some(&outcome.id)).await.unwrap_err();
        assert!(matches!(err, VaultError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn recovery_with_rotation_invalidates_the_old_code() {
        let engine = new_engine();
        engine.init().await.unwrap();
        let outcome = engine.register("pw1").await.unwrap();

        let recovered = engine
            .recover(RecoverRequest {
                recovery_code: outcome.recovery_code.clone(),
                new_password: "pw2".into(),
                id: Some(outcome.id.clone()),
                rotate: true,
            })
            .await
            .unwrap();
        let new_code = recovered.new_recovery_code.expect("rotation requested");

        let err = engine
            .recover(RecoverRequest {
                recovery_code: outcome.recovery_code.clone(),
                new_password: "pw3".into(),
                id: Some(outcome.id.clone()),
                rotate: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::AuthenticationFailed(_)));

        let recovered_again = engine
            .recover(RecoverRequest {
                recovery_code: new_code,
                new_password: "pw3".into(),
                id: Some(outcome.id.clone()),
                rotate: false,
            })
            .await
            .unwrap();
        assert_eq!(recovered_again.id, outcome.id);
    }

    #[tokio::test]
    async fn recover_requires_a_recovery_ct() {
        let engine = new_engine();
        engine.init().await.unwrap();
        let outcome = engine.register("pw1").await.unwrap();

        // Strip recovery capability by overwriting the stored envelope.
        let store = Arc::new(InMemoryBlobStore::new());
        let stripped = VaultEngine::new(Argon2ChaChaEd25519Provider::new(), store.clone());
        stripped.init().await.unwrap();
        let stripped_outcome = stripped.register("pw1").await.unwrap();
        let mut envelope = store.get(&stripped_outcome.id).unwrap().unwrap();
        envelope.recovery_ct = None;
        store.put(&stripped_outcome.id, envelope).unwrap();

        let err = stripped
            .recover(RecoverRequest {
                recovery_code: outcome.recovery_code,
                new_password: "pw2".into(),
                id: Some(stripped_outcome.id),
                rotate: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::RecoveryUnavailable));
    }

    #[tokio::test]
    async fn recover_on_unknown_identity_is_authentication_failure_not_recovery_unavailable() {
        let engine = new_engine();
        engine.init().await.unwrap();

        let err = engine
            .recover(RecoverRequest {
                recovery_code: "whatever-code".into(),
                new_password: "pw2".into(),
                id: Some("did:key:does-not-exist".into()),
                rotate: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn secret_operations_require_a_session() {
        let engine = new_engine();
        engine.init().await.unwrap();

        assert!(matches!(
            engine.save_secret("k", "v").await.unwrap_err(),
            VaultError::NotAuthenticated
        ));
        assert!(matches!(
            engine.get_secret("k").await.unwrap_err(),
            VaultError::NotAuthenticated
        ));
        assert!(matches!(
            engine.sign(b"msg").await.unwrap_err(),
            VaultError::NotAuthenticated
        ));
    }

    #[tokio::test]
    async fn integrity_violation_on_id_mismatch() {
        let store = Arc::new(InMemoryBlobStore::new());
        let engine = VaultEngine::new(Argon2ChaChaEd25519Provider::new(), store.clone());
        engine.init().await.unwrap();
        let outcome = engine.register("pw1").await.unwrap();
        engine.lock().await.unwrap();

        // Re-seal a payload whose inner id no longer matches the store key.
        let crypto = Argon2ChaChaEd25519Provider::new();
        let tampered_payload = InternalPayload::new("not-the-real-id", vec![0; 4], vec![1; 16]);
        let tampered_ct = crypto.aead_seal(
            &EnvelopeCodec::serialize_payload(&tampered_payload).unwrap(),
            "pw1",
        );
        let mut envelope = store.get(&outcome.id).unwrap().unwrap();
        envelope.main_ct = tampered_ct;
        store.put(&outcome.id, envelope).unwrap();

        let err = engine.login("pw1", Some(&outcome.id)).await.unwrap_err();
        assert!(matches!(err, VaultError::IntegrityError));
    }

    #[tokio::test]
    async fn tampering_a_byte_surfaces_as_authentication_failure_not_corrupt_data() {
        let store = Arc::new(InMemoryBlobStore::new());
        let engine = VaultEngine::new(Argon2ChaChaEd25519Provider::new(), store.clone());
        engine.init().await.unwrap();
        let outcome = engine.register("pw1").await.unwrap();
        engine.lock().await.unwrap();

        let mut envelope = store.get(&outcome.id).unwrap().unwrap();
        let last = envelope.main_ct.len() - 1;
        envelope.main_ct[last] ^= 0xFF;
        store.put(&outcome.id, envelope).unwrap();

        let err = engine.login("pw1", Some(&outcome.id)).await.unwrap_err();
        assert!(matches!(err, VaultError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn dispose_is_final() {
        let engine = new_engine();
        engine.init().await.unwrap();
        engine.register("pw1").await.unwrap();

        engine.dispose().await.unwrap();
        engine.dispose().await.unwrap();

        let err = engine.login("pw1", None).await.unwrap_err();
        assert!(matches!(err, VaultError::Disposed));
    }

    #[tokio::test]
    async fn dispose_fails_every_session_operation() {
        let engine = new_engine();
        engine.init().await.unwrap();
        engine.register("pw1").await.unwrap();
        engine.save_secret("k", "v").await.unwrap();

        engine.dispose().await.unwrap();

        assert!(matches!(
            engine.get_id().await.unwrap_err(),
            VaultError::Disposed
        ));
        assert!(matches!(
            engine.sign(b"data").await.unwrap_err(),
            VaultError::Disposed
        ));
        assert!(matches!(
            engine.get_secret("k").await.unwrap_err(),
            VaultError::Disposed
        ));
        assert!(matches!(
            engine.list_secret_keys().await.unwrap_err(),
            VaultError::Disposed
        ));
        assert!(matches!(
            engine.save_secret("k2", "v2").await.unwrap_err(),
            VaultError::Disposed
        ));
        assert!(matches!(
            engine.delete_secret("k").await.unwrap_err(),
            VaultError::Disposed
        ));
    }

    #[tokio::test]
    async fn login_with_no_stored_identities_fails() {
        let engine = new_engine();
        engine.init().await.unwrap();
        let err = engine.login("pw1", None).await.unwrap_err();
        assert!(matches!(err, VaultError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn init_and_lock_are_idempotent() {
        let engine = new_engine();
        engine.init().await.unwrap();
        engine.init().await.unwrap();
        engine.lock().await.unwrap();
        engine.lock().await.unwrap();
        assert_eq!(engine.status().await, EngineStatus::Ready);
    }
}
