//! Hash and codec utilities.
//!
//! Two small primitives the rest of the crate builds on: the one-way
//! password digest transmitted instead of plaintext, and the URL-safe
//! binary codec used for WebAuthn ceremony payloads.

use crate::error::{AuthError, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// One-way digest of an arbitrary string, as lowercase hex.
///
/// This is the value that goes on the wire wherever the provider API
/// takes a password: plaintext passwords must never leave the
/// application in network traffic.
///
/// # Examples
///
/// ```
/// # use auth_client::codec::digest;
/// assert_eq!(digest("test").len(), 64);
/// assert_eq!(digest("test"), digest("test"));
/// ```
#[must_use]
pub fn digest(input: &str) -> String {
    let hash = Sha256::digest(input.as_bytes());
    let mut out = String::with_capacity(hash.len() * 2);
    for byte in hash {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Encode bytes as URL-safe base64 without padding.
///
/// This is the WebAuthn wire convention for challenges, credential IDs
/// and ceremony response fields.
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode URL-safe base64 text back to bytes.
///
/// Accepts both padded and unpadded input, since servers are not
/// consistent about trailing `=`.
///
/// # Errors
///
/// Returns [`AuthError::InvalidPayload`] if the text is not valid
/// URL-safe base64.
pub fn decode(text: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(text.trim_end_matches('='))
        .map_err(|error| AuthError::InvalidPayload(format!("invalid base64url data: {error}")))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_digest_matches_sha256_test_vectors() {
        // Published SHA-256 vectors.
        assert_eq!(
            digest(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            digest("test"),
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn test_codec_round_trips_padding_boundary_lengths() {
        for bytes in [
            vec![],
            vec![0x00],
            vec![0xFF],
            vec![0x00, 0xFF],
            vec![0x01, 0x02, 0x03],
            (0..=255u8).collect::<Vec<_>>(),
        ] {
            assert_eq!(decode(&encode(&bytes)).unwrap(), bytes);
        }
    }

    #[test]
    fn test_decode_accepts_padded_input() {
        // "AQI=" is the padded encoding of [1, 2].
        assert_eq!(decode("AQI=").unwrap(), vec![1, 2]);
        assert_eq!(decode("AQI").unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("not base64!").is_err());
    }

    #[test]
    fn test_encode_is_url_safe_and_unpadded() {
        let encoded = encode(&[0xFB, 0xFF, 0xBF]);
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));
        assert!(!encoded.ends_with('='));
    }
}
