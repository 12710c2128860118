//! Keyed-MAC signing of telemetry payloads.
//!
//! Readings are authenticated with BLAKE3 in keyed mode: the configured
//! shared secret is stretched to a 32-byte MAC key with `blake3::derive_key`
//! under a fixed context string, and each payload is tagged with
//! `blake3::keyed_hash` over its canonical bytes. The tag travels hex-encoded
//! in the envelope's `signature` field.
//!
//! A receiver holding the same secret derives the same key and recomputes
//! the tag over the canonical reading bytes (see [`crate::core::reading`]
//! for the exact encoding).
//!
//! Key material never appears in logs; `Signer` has a redacting `Debug`
//! implementation and the key bytes are not otherwise exposed.

use std::fmt;

use thiserror::Error;

/// Domain-separation context for key derivation. Changing this string
/// invalidates every existing signature.
const KEY_CONTEXT: &str = "twinsense 2025-08 telemetry reading mac v1";

/// Errors raised when signing is requested with unusable key material.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// The configured key is empty. Omit the key entirely to publish
    /// unsigned instead.
    #[error("Signing key must not be empty")]
    EmptyKey,
}

/// Computes and verifies integrity tags for payload bytes.
#[derive(Clone)]
pub struct Signer {
    key: [u8; 32],
}

impl Signer {
    /// Derives the MAC key from the configured shared secret.
    ///
    /// # Errors
    ///
    /// Returns `SignatureError::EmptyKey` for an empty secret. This is
    /// fatal at startup: a present-but-empty key is a misconfiguration,
    /// not a request for unsigned mode.
    pub fn new(secret: &str) -> Result<Self, SignatureError> {
        if secret.is_empty() {
            return Err(SignatureError::EmptyKey);
        }
        Ok(Self {
            key: blake3::derive_key(KEY_CONTEXT, secret.as_bytes()),
        })
    }

    /// Computes the hex-encoded tag over the exact body bytes.
    pub fn sign(&self, body: &[u8]) -> String {
        hex::encode(blake3::keyed_hash(&self.key, body).as_bytes())
    }

    /// Recomputes the tag and compares in constant time.
    ///
    /// Returns false for malformed tags rather than erroring; a bad tag is
    /// just an unauthenticated message.
    pub fn verify(&self, body: &[u8], tag: &str) -> bool {
        let Ok(raw) = hex::decode(tag) else {
            return false;
        };
        let Ok(tag_bytes) = <[u8; 32]>::try_from(raw.as_slice()) else {
            return false;
        };
        blake3::keyed_hash(&self.key, body) == blake3::Hash::from(tag_bytes)
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer").field("key", &"<redacted>").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(Signer::new(""), Err(SignatureError::EmptyKey)));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let signer = Signer::new("k").unwrap();
        let body = b"payload bytes";
        assert_eq!(signer.sign(body), signer.sign(body));
    }

    #[test]
    fn test_sign_verify_round_trip() {
        let signer = Signer::new("k").unwrap();
        let body = b"payload bytes";
        let tag = signer.sign(body);
        assert!(signer.verify(body, &tag));
    }

    #[test]
    fn test_different_keys_produce_different_tags() {
        let a = Signer::new("key-a").unwrap();
        let b = Signer::new("key-b").unwrap();
        let body = b"payload bytes";
        assert_ne!(a.sign(body), b.sign(body));
        assert!(!b.verify(body, &a.sign(body)));
    }

    #[test]
    fn test_any_body_bit_flip_fails_verification() {
        let signer = Signer::new("k").unwrap();
        let body = b"payload".to_vec();
        let tag = signer.sign(&body);

        for byte in 0..body.len() {
            for bit in 0..8 {
                let mut mutated = body.clone();
                mutated[byte] ^= 1 << bit;
                assert!(
                    !signer.verify(&mutated, &tag),
                    "bit {bit} of byte {byte} accepted"
                );
            }
        }
    }

    #[test]
    fn test_any_tag_bit_flip_fails_verification() {
        let signer = Signer::new("k").unwrap();
        let body = b"payload";
        let tag = signer.sign(body);
        let mut raw = hex::decode(&tag).unwrap();

        for byte in 0..raw.len() {
            for bit in 0..8 {
                raw[byte] ^= 1 << bit;
                let mutated = hex::encode(&raw);
                assert!(
                    !signer.verify(body, &mutated),
                    "bit {bit} of tag byte {byte} accepted"
                );
                raw[byte] ^= 1 << bit;
            }
        }
    }

    #[test]
    fn test_malformed_tags_rejected() {
        let signer = Signer::new("k").unwrap();
        let body = b"payload";
        assert!(!signer.verify(body, ""));
        assert!(!signer.verify(body, "not hex at all"));
        assert!(!signer.verify(body, "deadbeef")); // wrong length
    }

    #[test]
    fn test_tag_is_64_hex_chars() {
        let signer = Signer::new("k").unwrap();
        let tag = signer.sign(b"payload");
        assert_eq!(tag.len(), 64);
        assert!(tag.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_debug_redacts_key() {
        let signer = Signer::new("super-secret").unwrap();
        let debug = format!("{:?}", signer);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
