//! Reference `CryptoProvider`: Argon2id + XChaCha20-Poly1305 + ChaCha20-
//! Poly1305 + Ed25519, built as thin wrapper functions around one
//! well-known crate each, with the engine's wire format stitched on top.

use crate::error::CryptoProviderError;
use crate::ports::crypto::CryptoProvider;

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce, XChaCha20Poly1305, XNonce,
};
use ed25519_dalek::{Signer, SigningKey};
use rand_core::{OsRng, RngCore};
use zeroize::Zeroize;

/// 13-byte magic prefix for `aead_seal` output, so a raw blob is
/// self-describing.
const AEAD_MAGIC: [u8; 13] = *b"IDVAULT-AEAD1";

const SALT_LEN: usize = 16;
const XNONCE_LEN: usize = 24;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// OWASP-recommended Argon2id baseline: 19 MiB memory, 2 iterations, 1
/// degree of parallelism.
fn argon2id() -> Argon2<'static> {
    let params = Params::new(19 * 1024, 2, 1, Some(32)).expect("valid argon2 params");
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

/// Opaque handle: an Ed25519 keypair. `SigningKey` zeroizes its seed on
/// drop, so dropping a handle (explicitly, via `drop_handle`, or simply
/// letting it go out of scope after `drop_handle` takes ownership) wipes
/// the private key bytes.
pub struct IdentityHandle(SigningKey);

/// Reference `CryptoProvider` built from well-known, audited crates. Not
/// itself an audited artifact — see module docs.
#[derive(Default)]
pub struct Argon2ChaChaEd25519Provider;

impl Argon2ChaChaEd25519Provider {
    pub fn new() -> Self {
        Self
    }
}

impl CryptoProvider for Argon2ChaChaEd25519Provider {
    type Handle = IdentityHandle;

    fn init(&self) -> Result<(), CryptoProviderError> {
        Ok(())
    }

    fn random(&self, n: usize) -> Vec<u8> {
        let mut buf = vec![0u8; n];
        OsRng.fill_bytes(&mut buf);
        buf
    }

    fn derive_key(&self, password: &str, salt: &[u8; 16]) -> [u8; 32] {
        let mut out = [0u8; 32];
        argon2id()
            .hash_password_into(password.as_bytes(), salt, &mut out)
            .expect("argon2id with fixed output length cannot fail");
        out
    }

    fn aead_seal(&self, plaintext: &[u8], password: &str) -> Vec<u8> {
        let mut internal_salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut internal_salt);
        let mut key = self.derive_key(password, &internal_salt);

        let mut nonce_bytes = [0u8; XNONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = XNonce::from_slice(&nonce_bytes);

        let cipher = XChaCha20Poly1305::new((&key).into());
        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .expect("XChaCha20-Poly1305 encryption cannot fail for well-formed input");
        key.zeroize();

        let mut out = Vec::with_capacity(AEAD_MAGIC.len() + SALT_LEN + XNONCE_LEN + ciphertext.len());
        out.extend_from_slice(&AEAD_MAGIC);
        out.extend_from_slice(&internal_salt);
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        out
    }

    fn aead_open(&self, blob: &[u8], password: &str) -> Result<Vec<u8>, CryptoProviderError> {
        let header_len = AEAD_MAGIC.len() + SALT_LEN + XNONCE_LEN;
        if blob.len() < header_len + TAG_LEN {
            return Err(CryptoProviderError::DecryptFail);
        }
        let (magic, rest) = blob.split_at(AEAD_MAGIC.len());
        if magic != AEAD_MAGIC {
            return Err(CryptoProviderError::DecryptFail);
        }
        let (salt_bytes, rest) = rest.split_at(SALT_LEN);
        let (nonce_bytes, ciphertext) = rest.split_at(XNONCE_LEN);

        let internal_salt: [u8; SALT_LEN] = salt_bytes.try_into().unwrap();
        let mut key = self.derive_key(password, &internal_salt);
        let nonce = XNonce::from_slice(nonce_bytes);

        let cipher = XChaCha20Poly1305::new((&key).into());
        let plaintext = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CryptoProviderError::DecryptFail);
        key.zeroize();
        plaintext
    }

    fn new_identity(&self) -> Self::Handle {
        IdentityHandle(SigningKey::generate(&mut OsRng))
    }

    fn identity_id(&self, handle: &Self::Handle) -> String {
        format!("did:key:{}", hex::encode(handle.0.verifying_key().to_bytes()))
    }

    fn identity_public_key(&self, handle: &Self::Handle) -> [u8; 32] {
        handle.0.verifying_key().to_bytes()
    }

    fn export_wrapped(&self, handle: &Self::Handle, session_key: &[u8; 32]) -> Vec<u8> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let cipher = ChaCha20Poly1305::new(session_key.into());
        let mut seed = handle.0.to_bytes();
        let ciphertext = cipher
            .encrypt(nonce, seed.as_ref())
            .expect("ChaCha20-Poly1305 encryption cannot fail for well-formed input");
        seed.zeroize();

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        out
    }

    fn restore_from_wrapped(
        &self,
        wrapped: &[u8],
        session_key: &[u8; 32],
    ) -> Result<Self::Handle, CryptoProviderError> {
        if wrapped.len() < NONCE_LEN + TAG_LEN {
            return Err(CryptoProviderError::DecryptFail);
        }
        let (nonce_bytes, ciphertext) = wrapped.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let cipher = ChaCha20Poly1305::new(session_key.into());
        let mut seed_vec = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CryptoProviderError::DecryptFail)?;

        if seed_vec.len() != 32 {
            seed_vec.zeroize();
            return Err(CryptoProviderError::DecryptFail);
        }
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&seed_vec);
        seed_vec.zeroize();

        let signing_key = SigningKey::from_bytes(&seed);
        seed.zeroize();
        Ok(IdentityHandle(signing_key))
    }

    fn sign(&self, handle: &Self::Handle, data: &[u8]) -> [u8; 64] {
        handle.0.sign(data).to_bytes()
    }

    fn drop_handle(&self, handle: Self::Handle) {
        // `SigningKey` zeroizes its seed on drop; taking ownership here
        // and letting it fall out of scope is the explicit wipe.
        drop(handle);
    }
}
