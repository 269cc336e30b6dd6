//! Discord request signature verification (Ed25519 over `timestamp || body`).
//!
//! Discord signs every interaction POST with the application's private key and sends the
//! hex signature in `X-Signature-Ed25519` and the signed timestamp in `X-Signature-Timestamp`.

use crate::error::SignatureError;
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};

pub const SIGNATURE_HEADER: &str = "X-Signature-Ed25519";
pub const TIMESTAMP_HEADER: &str = "X-Signature-Timestamp";

/// Parse a hex-encoded Ed25519 public key (32 bytes).
pub fn parse_verifying_key(hex_key: &str) -> Result<VerifyingKey, SignatureError> {
    let bytes = hex::decode(hex_key.trim()).map_err(|source| SignatureError::Hex {
        what: "public key",
        source,
    })?;
    let arr: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| SignatureError::Length {
            what: "public key",
            expected: 32,
            got: bytes.len(),
        })?;
    VerifyingKey::from_bytes(&arr).map_err(|_| SignatureError::InvalidKey)
}

fn parse_signature(hex_sig: &str) -> Result<Signature, SignatureError> {
    let bytes = hex::decode(hex_sig).map_err(|source| SignatureError::Hex {
        what: "signature",
        source,
    })?;
    let arr: [u8; 64] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| SignatureError::Length {
            what: "signature",
            expected: 64,
            got: bytes.len(),
        })?;
    Ok(Signature::from_bytes(&arr))
}

fn signed_message(timestamp: &str, body: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(timestamp.len() + body.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(body);
    message
}

/// Verify a request against an already-parsed public key. Missing or empty headers,
/// undecodable hex, and bad signatures all return false.
pub fn verify_with_key(
    body: &[u8],
    signature_hex: Option<&str>,
    timestamp: Option<&str>,
    key: &VerifyingKey,
) -> bool {
    let (Some(signature_hex), Some(timestamp)) = (
        signature_hex.filter(|s| !s.is_empty()),
        timestamp.filter(|s| !s.is_empty()),
    ) else {
        log::debug!("missing signature or timestamp");
        return false;
    };
    let signature = match parse_signature(signature_hex) {
        Ok(s) => s,
        Err(e) => {
            log::debug!("signature rejected: {}", e);
            return false;
        }
    };
    match key.verify_strict(&signed_message(timestamp, body), &signature) {
        Ok(()) => true,
        Err(_) => {
            log::debug!("signature rejected: verification failed");
            false
        }
    }
}

/// Verify a request against a hex-encoded public key.
pub fn verify(
    body: &[u8],
    signature_hex: Option<&str>,
    timestamp: Option<&str>,
    public_key_hex: &str,
) -> bool {
    match parse_verifying_key(public_key_hex) {
        Ok(key) => verify_with_key(body, signature_hex, timestamp, &key),
        Err(e) => {
            log::debug!("signature rejected: {}", e);
            false
        }
    }
}

/// Sign `timestamp || body` the way Discord does; returns the hex signature.
/// Used to drive the gateway locally and in tests.
pub fn sign_request(key: &SigningKey, timestamp: &str, body: &[u8]) -> String {
    hex::encode(key.sign(&signed_message(timestamp, body)).to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: &str = "1700000000";
    const BODY: &[u8] = br#"{"type":1}"#;

    fn keypair() -> (SigningKey, String) {
        let signing_key = SigningKey::from_bytes(&[7u8; 32]);
        let public_hex = hex::encode(signing_key.verifying_key().as_bytes());
        (signing_key, public_hex)
    }

    fn flip_hex_byte(s: &str, i: usize) -> String {
        let mut bytes = hex::decode(s).unwrap();
        bytes[i] ^= 0x01;
        hex::encode(bytes)
    }

    #[test]
    fn valid_signature_verifies() {
        let (sk, pk) = keypair();
        let sig = sign_request(&sk, TS, BODY);
        assert!(verify(BODY, Some(&sig), Some(TS), &pk));
    }

    #[test]
    fn tampered_body_fails() {
        let (sk, pk) = keypair();
        let sig = sign_request(&sk, TS, BODY);
        for i in 0..BODY.len() {
            let mut body = BODY.to_vec();
            body[i] ^= 0x01;
            assert!(!verify(&body, Some(&sig), Some(TS), &pk), "byte {i}");
        }
    }

    #[test]
    fn tampered_timestamp_fails() {
        let (sk, pk) = keypair();
        let sig = sign_request(&sk, TS, BODY);
        assert!(!verify(BODY, Some(&sig), Some("1700000001"), &pk));
    }

    #[test]
    fn tampered_signature_fails() {
        let (sk, pk) = keypair();
        let sig = sign_request(&sk, TS, BODY);
        for i in [0, 31, 32, 63] {
            assert!(!verify(BODY, Some(&flip_hex_byte(&sig, i)), Some(TS), &pk), "byte {i}");
        }
    }

    #[test]
    fn wrong_key_fails() {
        let (sk, _) = keypair();
        let other = SigningKey::from_bytes(&[9u8; 32]);
        let other_hex = hex::encode(other.verifying_key().as_bytes());
        let sig = sign_request(&sk, TS, BODY);
        assert!(!verify(BODY, Some(&sig), Some(TS), &other_hex));
    }

    #[test]
    fn missing_headers_fail() {
        let (sk, pk) = keypair();
        let sig = sign_request(&sk, TS, BODY);
        assert!(!verify(BODY, None, Some(TS), &pk));
        assert!(!verify(BODY, Some(&sig), None, &pk));
        assert!(!verify(BODY, Some(""), Some(TS), &pk));
        assert!(!verify(BODY, Some(&sig), Some(""), &pk));
    }

    #[test]
    fn bad_hex_fails() {
        let (sk, pk) = keypair();
        let sig = sign_request(&sk, TS, BODY);
        assert!(!verify(BODY, Some("zz-not-hex"), Some(TS), &pk));
        assert!(!verify(BODY, Some(&sig[..sig.len() - 2]), Some(TS), &pk));
        assert!(!verify(BODY, Some(&sig), Some(TS), "not-a-key"));
    }

    #[test]
    fn parse_verifying_key_rejects_wrong_length() {
        let err = parse_verifying_key(&hex::encode([0u8; 16])).unwrap_err();
        assert!(matches!(err, SignatureError::Length { got: 16, .. }));
    }
}
