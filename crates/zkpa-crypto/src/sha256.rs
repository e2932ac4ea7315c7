//! # SHA-256 Helpers and Hex Codec
//!
//! Thin helpers over `sha2` plus the 32-byte hex codec used throughout
//! the stack. Digest strings are always 64 lowercase hex characters;
//! decoding is strict about both length and case so that string equality
//! and byte equality never diverge.

use sha2::{Digest, Sha256};

use crate::error::CryptoError;

/// SHA-256 of raw bytes, rendered as 64 lowercase hex characters.
///
/// Used for hashing opaque UTF-8 inputs (control statements, policies)
/// into proof public inputs. Structured data goes through
/// [`zkpa_core::sha256_digest`] instead.
pub fn sha256_hex(bytes: &[u8]) -> String {
    encode_digest_hex(&sha256_raw(bytes))
}

/// SHA-256 of raw bytes as a 32-byte array.
pub(crate) fn sha256_raw(bytes: &[u8]) -> [u8; 32] {
    let hash = Sha256::digest(bytes);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash);
    out
}

/// Encode 32 bytes as lowercase hex.
pub fn encode_digest_hex(bytes: &[u8; 32]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Decode a 64-char lowercase hex string to 32 bytes.
///
/// Rejects uppercase input: digest comparison in the stack is string
/// equality against lowercase renderings, so mixed-case inputs would
/// produce false mismatches downstream.
pub fn decode_digest_hex(hex: &str) -> Result<[u8; 32], CryptoError> {
    if hex.len() != 64 {
        return Err(CryptoError::DigestError(format!(
            "expected 64 hex chars, got {}",
            hex.len()
        )));
    }
    let mut out = [0u8; 32];
    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        let s = std::str::from_utf8(chunk)
            .map_err(|e| CryptoError::DigestError(format!("invalid hex: {e}")))?;
        if s.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(CryptoError::DigestError(format!(
                "digest must be lowercase hex (byte {i})"
            )));
        }
        out[i] = u8::from_str_radix(s, 16)
            .map_err(|e| CryptoError::DigestError(format!("invalid hex at byte {i}: {e}")))?;
    }
    Ok(out)
}

/// Returns `true` if `s` is a well-formed 64-char lowercase hex digest.
pub fn is_digest_hex(s: &str) -> bool {
    s.len() == 64
        && s.bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
