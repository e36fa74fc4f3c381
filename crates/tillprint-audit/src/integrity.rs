// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Payload integrity — SHA-256 fingerprints of print job documents.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of `data` and return it as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Fingerprint a job payload.
///
/// The payload is hashed in its compact JSON form. `serde_json` keeps object
/// keys sorted (no `preserve_order` feature), so equal payloads hash equally
/// regardless of how they were built.
pub fn hash_payload(payload: &serde_json::Value) -> String {
    hash_bytes(payload.to_string().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// SHA-256 of the empty byte slice (well-known constant).
    const EMPTY_SHA256: &str =
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn hash_empty_input() {
        assert_eq!(hash_bytes(b""), EMPTY_SHA256);
    }

    #[test]
    fn hash_known_value() {
        // SHA-256("hello"), checked against coreutils sha256sum.
        let expected = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
        assert_eq!(hash_bytes(b"hello"), expected);
    }

    #[test]
    fn payload_hash_ignores_key_order() {
        let a: serde_json::Value = serde_json::from_str(r#"{"sale": 7, "total": 12.5}"#).unwrap();
        let b: serde_json::Value = serde_json::from_str(r#"{"total": 12.5, "sale": 7}"#).unwrap();
        assert_eq!(hash_payload(&a), hash_payload(&b));
        assert_ne!(hash_payload(&a), hash_payload(&serde_json::json!({"sale": 8})));
    }
}
