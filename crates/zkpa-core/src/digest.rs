//! # Content Digest — SHA-256 over Canonical Bytes
//!
//! Defines `ContentDigest`, the 32-byte digest type that identifies
//! packages, proofs, commitments, and anchor notes.
//!
//! ## Security Invariant
//!
//! `ContentDigest` can only be computed from `CanonicalBytes`, ensuring
//! that every digest in the system was produced through the correct
//! canonicalization pipeline. Raw-byte hashing (needed for Merkle pair
//! hashing and composite proof inputs) lives behind the explicit
//! `Sha256Accumulator`, which exists so those call sites are greppable.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;
use crate::error::CoreError;

/// A SHA-256 content digest.
///
/// Produced from `CanonicalBytes` via [`sha256_digest`], or parsed from a
/// 64-char lowercase hex string. The inner bytes are private; use
/// [`ContentDigest::as_bytes`] and [`ContentDigest::to_hex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// Wrap raw digest bytes.
    ///
    /// Callers should prefer [`sha256_digest`]; this constructor exists
    /// for Merkle roots, where the 32-byte value is itself the output of
    /// the tree reduction.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a 64-character lowercase hex digest string.
    pub fn from_hex(hex: &str) -> Result<Self, CoreError> {
        if hex.len() != 64 {
            return Err(CoreError::InvalidDigest(format!(
                "expected 64 hex chars, got {}",
                hex.len()
            )));
        }
        if !hex.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
            return Err(CoreError::InvalidDigest(
                "digest must be lowercase hex".to_string(),
            ));
        }
        let mut out = [0u8; 32];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let s = std::str::from_utf8(chunk)
                .map_err(|e| CoreError::InvalidDigest(format!("invalid hex: {e}")))?;
            out[i] = u8::from_str_radix(s, 16)
                .map_err(|e| CoreError::InvalidDigest(format!("invalid hex at byte {i}: {e}")))?;
        }
        Ok(Self(out))
    }

    /// Access the raw 32 digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sha256:{}", self.to_hex())
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<ContentDigest> for String {
    fn from(d: ContentDigest) -> Self {
        d.to_hex()
    }
}

/// Compute a SHA-256 content digest from canonical bytes.
///
/// This is the standard digest computation path. The input must be
/// [`CanonicalBytes`] — raw byte slices are not accepted.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    let hash = Sha256::digest(data.as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash);
    ContentDigest(out)
}

/// Incremental SHA-256 accumulator for composite inputs.
///
/// Exists for the few places that hash something other than a single
/// canonical value: Merkle pair hashing (`left || right`) and proof
/// transcripts (`canonical_bytes || public_inputs`). Keeping these behind
/// one named type makes every non-canonical hash site easy to audit.
#[derive(Debug, Default)]
pub struct Sha256Accumulator {
    inner: Sha256,
}

impl Sha256Accumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes into the accumulator.
    pub fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    /// Finalize into raw digest bytes.
    pub fn finalize(self) -> [u8; 32] {
        let hash = self.inner.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&hash);
        out
    }

    /// Finalize into a lowercase hex string.
    pub fn finalize_hex(self) -> String {
        self.finalize().iter().map(|b| format!("{b:02x}")).collect()
    }
}
