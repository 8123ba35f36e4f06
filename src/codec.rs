//! Canonical serialization and parsing of `InternalPayload`/`EnvelopeBlob`.

use crate::error::VaultError;
use crate::types::{EnvelopeBlob, InternalPayload, ENVELOPE_SCHEMA_VERSION};
use chrono::Utc;

/// Serializes/parses the plaintext document an envelope's AEAD layer
/// protects, and builds the persisted envelope record around it.
///
/// The wire format is UTF-8 JSON. Byte-for-byte stability across
/// implementations is not required — only that `parse_payload` inverts
/// `serialize_payload` for the same implementation.
pub struct EnvelopeCodec;

impl EnvelopeCodec {
    /// Produces a canonical byte sequence whose round-trip under
    /// `parse_payload` is the identity function.
    pub fn serialize_payload(payload: &InternalPayload) -> Result<Vec<u8>, VaultError> {
        serde_json::to_vec(payload)
            .map_err(|e| VaultError::CryptoError(format!("serialize payload: {e}")))
    }

    /// Fails with `CorruptData` if `bytes` is not parseable JSON, or is
    /// missing/mistyped required fields.
    pub fn parse_payload(bytes: &[u8]) -> Result<InternalPayload, VaultError> {
        serde_json::from_slice(bytes).map_err(|_| VaultError::CorruptData)
    }

    /// Builds a fresh `EnvelopeBlob` with `version = 1` and
    /// `updated_at = now`.
    pub fn make_envelope(
        id: impl Into<String>,
        salt: Vec<u8>,
        main_ct: Vec<u8>,
        recovery_ct: Option<Vec<u8>>,
    ) -> EnvelopeBlob {
        EnvelopeBlob {
            version: ENVELOPE_SCHEMA_VERSION,
            id: id.into(),
            salt,
            main_ct,
            recovery_ct,
            updated_at: Utc::now().timestamp_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_round_trips() {
        let payload = InternalPayload::new("did:xyz", vec![9, 9, 9], vec![1; 16]);
        let bytes = EnvelopeCodec::serialize_payload(&payload).unwrap();
        let parsed = EnvelopeCodec::parse_payload(&bytes).unwrap();
        assert_eq!(payload, parsed);
    }

    #[test]
    fn parse_payload_rejects_garbage() {
        let err = EnvelopeCodec::parse_payload(b"not json at all").unwrap_err();
        assert!(matches!(err, VaultError::CorruptData));
    }

    #[test]
    fn parse_payload_rejects_missing_fields() {
        let err = EnvelopeCodec::parse_payload(br#"{"id":"only-id"}"#).unwrap_err();
        assert!(matches!(err, VaultError::CorruptData));
    }

    #[test]
    fn make_envelope_fills_schema_fields() {
        let blob = EnvelopeCodec::make_envelope("did:xyz", vec![1; 16], vec![2, 3], None);
        assert_eq!(blob.version, ENVELOPE_SCHEMA_VERSION);
        assert_eq!(blob.id, "did:xyz");
        assert!(blob.recovery_ct.is_none());
        assert!(blob.updated_at > 0);
    }
}
