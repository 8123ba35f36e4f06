//! Core data types: the persisted envelope, the plaintext it protects, and
//! the recovery code format.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Base64 serde adapters (persisted fields are base64 on the wire)
// ---------------------------------------------------------------------------

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &Vec<u8>, s: S) -> Result<S::Ok, S::Error> {
        STANDARD.encode(v).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        STANDARD
            .decode(s.as_bytes())
            .map_err(|e| serde::de::Error::custom(format!("invalid base64: {e}")))
    }
}

mod base64_bytes_opt {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(bytes) => STANDARD.encode(bytes).serialize(s),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        let s: Option<String> = Option::deserialize(d)?;
        match s {
            Some(s) => STANDARD
                .decode(s.as_bytes())
                .map(Some)
                .map_err(|e| serde::de::Error::custom(format!("invalid base64: {e}"))),
            None => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// InternalPayload — the plaintext the envelope's AEAD layer protects
// ---------------------------------------------------------------------------

/// The document sealed inside `EnvelopeBlob::main_ct`/`recovery_ct`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct InternalPayload {
    /// Primary key; must equal the identifier it is stored under.
    pub id: String,
    /// `CryptoProvider::export_wrapped` output — the identity's private
    /// key material, wrapped under the session key.
    #[serde(with = "base64_bytes")]
    pub wrapped: Vec<u8>,
    /// Same salt used to derive the session key.
    #[serde(with = "base64_bytes")]
    pub salt: Vec<u8>,
    /// Cleartext secret store (name -> value), once decrypted.
    pub secrets: HashMap<String, String>,
    /// Stamped once at registration; never rewritten.
    pub created_at: i64,
    /// Stamped on every `save_secret`/`delete_secret`.
    pub modified_at: i64,
}

impl InternalPayload {
    pub fn new(id: impl Into<String>, wrapped: Vec<u8>, salt: Vec<u8>) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: id.into(),
            wrapped,
            salt,
            secrets: HashMap::new(),
            created_at: now,
            modified_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// EnvelopeBlob — the persisted record
// ---------------------------------------------------------------------------

/// The record a `BlobStore` persists under one identifier.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EnvelopeBlob {
    pub version: u32,
    pub id: String,
    #[serde(with = "base64_bytes")]
    pub salt: Vec<u8>,
    /// `CryptoProvider::aead_seal(InternalPayload, password)`.
    #[serde(with = "base64_bytes")]
    pub main_ct: Vec<u8>,
    /// `CryptoProvider::aead_seal(InternalPayload, recovery_code)`, frozen
    /// at registration time (or last rotation). Absence means no recovery
    /// capability for this identity.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "base64_bytes_opt"
    )]
    pub recovery_ct: Option<Vec<u8>>,
    pub updated_at: i64,
}

pub const ENVELOPE_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// RecoveryCode
// ---------------------------------------------------------------------------

/// `RK-XXXXXXXX-XXXXXXXX-XXXXXXXX-XXXXXXXX`, four groups of 8 uppercase
/// hex digits (128 bits of entropy). Format is validated, never parsed
/// into bytes by the engine — it is handed to the crypto provider as an
/// opaque password-equivalent string.
pub struct RecoveryCode;

impl RecoveryCode {
    pub const PREFIX: &'static str = "RK-";

    /// Format 16 random bytes into the canonical recovery-code string.
    pub fn format(bytes: &[u8; 16]) -> String {
        let hex = hex::encode_upper(bytes);
        format!(
            "{}{}-{}-{}-{}",
            Self::PREFIX,
            &hex[0..8],
            &hex[8..16],
            &hex[16..24],
            &hex[24..32]
        )
    }

    /// Whether `s` matches `^RK-[A-F0-9]{8}-[A-F0-9]{8}-[A-F0-9]{8}-[A-F0-9]{8}$`.
    pub fn is_well_formed(s: &str) -> bool {
        let Some(rest) = s.strip_prefix(Self::PREFIX) else {
            return false;
        };
        let groups: Vec<&str> = rest.split('-').collect();
        groups.len() == 4
            && groups
                .iter()
                .all(|g| g.len() == 8 && g.bytes().all(|b| b.is_ascii_uppercase_hexdigit()))
    }
}

trait AsciiUpperHex {
    fn is_ascii_uppercase_hexdigit(&self) -> bool;
}

impl AsciiUpperHex for u8 {
    fn is_ascii_uppercase_hexdigit(&self) -> bool {
        self.is_ascii_digit() || (b'A'..=b'F').contains(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovery_code_format_matches_pattern() {
        let code = RecoveryCode::format(&[0xAB; 16]);
        assert!(RecoveryCode::is_well_formed(&code));
        assert_eq!(code.len(), "RK-XXXXXXXX-XXXXXXXX-XXXXXXXX-XXXXXXXX".len());
    }

    #[test]
    fn recovery_code_rejects_malformed() {
        assert!(!RecoveryCode::is_well_formed("not-a-code"));
        assert!(!RecoveryCode::is_well_formed("RK-abcdef01-AAAAAAAA-AAAAAAAA-AAAAAAAA"));
        assert!(!RecoveryCode::is_well_formed("RK-AAAAAAAA-AAAAAAAA-AAAAAAAA"));
    }

    #[test]
    fn internal_payload_roundtrips_through_json() {
        let payload = InternalPayload::new("did:abc123", vec![1, 2, 3], vec![4; 16]);
        let bytes = serde_json::to_vec(&payload).unwrap();
        let parsed: InternalPayload = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(payload, parsed);
    }
}
