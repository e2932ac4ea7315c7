//! # Ed25519 Signing and Verification
//!
//! Provides Ed25519 digital signatures for attestation packages,
//! verification receipts, and anchor notes.
//!
//! ## Security Invariant
//!
//! Private keys are never serialized or logged. `SigningKey` does not
//! implement `Serialize`, and its `Debug` impl prints a placeholder.
//! Signing takes either [`CanonicalBytes`](zkpa_core::CanonicalBytes) or a
//! [`ContentDigest`](zkpa_core::ContentDigest) — never an arbitrary byte
//! slice — so every signed payload went through the canonicalization
//! pipeline first.
//!
//! ## Key material
//!
//! Keys load from a raw 32-byte seed (hex) or generate fresh from the OS
//! CSPRNG. For development deployments a seed may also be derived from a
//! word phrase (normalized, SHA-256). Checksum-grade 25-word ledger
//! mnemonics belong to the ledger SDK at its own boundary; they are not
//! parsed here.

use ed25519_dalek::{Signer, Verifier};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::error::CryptoError;
use crate::sha256::sha256_raw;
use zkpa_core::{CanonicalBytes, ContentDigest};

/// An Ed25519 signature (64 bytes), rendered as 128 lowercase hex chars.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Signature(ed25519_dalek::Signature);

impl Signature {
    /// Render as 128 lowercase hex characters.
    pub fn to_hex(&self) -> String {
        self.0
            .to_bytes()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    /// Parse from 128 hex characters.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        if hex.len() != 128 {
            return Err(CryptoError::VerificationFailed(format!(
                "signature must be 128 hex chars, got {}",
                hex.len()
            )));
        }
        let mut bytes = [0u8; 64];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let s = std::str::from_utf8(chunk)
                .map_err(|e| CryptoError::VerificationFailed(format!("invalid hex: {e}")))?;
            bytes[i] = u8::from_str_radix(s, 16).map_err(|e| {
                CryptoError::VerificationFailed(format!("invalid hex at byte {i}: {e}"))
            })?;
        }
        Ok(Self(ed25519_dalek::Signature::from_bytes(&bytes)))
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hex = self.to_hex();
        write!(f, "Signature({}...)", &hex[..8])
    }
}

impl TryFrom<String> for Signature {
    type Error = CryptoError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<Signature> for String {
    fn from(s: Signature) -> Self {
        s.to_hex()
    }
}

/// An Ed25519 verifying (public) key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VerifyingKey(ed25519_dalek::VerifyingKey);

impl VerifyingKey {
    /// Render as 64 lowercase hex characters.
    pub fn to_hex(&self) -> String {
        self.0
            .as_bytes()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    /// Parse from 64 hex characters.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let bytes = crate::sha256::decode_digest_hex(hex)
            .map_err(|e| CryptoError::KeyError(format!("verifying key: {e}")))?;
        let inner = ed25519_dalek::VerifyingKey::from_bytes(&bytes)
            .map_err(|e| CryptoError::KeyError(format!("not a valid Ed25519 point: {e}")))?;
        Ok(Self(inner))
    }

    /// Verify a signature over canonical bytes.
    pub fn verify_canonical(&self, payload: &CanonicalBytes, signature: &Signature) -> bool {
        self.0.verify(payload.as_bytes(), &signature.0).is_ok()
    }

    /// Verify a signature over a 32-byte content digest.
    pub fn verify_digest(&self, digest: &ContentDigest, signature: &Signature) -> bool {
        self.0.verify(digest.as_bytes(), &signature.0).is_ok()
    }
}

impl std::fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hex = self.to_hex();
        write!(f, "VerifyingKey({}...)", &hex[..8])
    }
}

impl TryFrom<String> for VerifyingKey {
    type Error = CryptoError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<VerifyingKey> for String {
    fn from(k: VerifyingKey) -> Self {
        k.to_hex()
    }
}

/// An Ed25519 signing (private) key.
///
/// Does not implement `Serialize` — private keys must not be accidentally
/// serialized into logs, responses, or artifacts.
pub struct SigningKey {
    inner: ed25519_dalek::SigningKey,
}

impl SigningKey {
    /// Generate a fresh key from the OS CSPRNG.
    pub fn generate() -> Self {
        Self {
            inner: ed25519_dalek::SigningKey::generate(&mut OsRng),
        }
    }

    /// Load from a raw 32-byte seed.
    pub fn from_seed_bytes(seed: [u8; 32]) -> Self {
        Self {
            inner: ed25519_dalek::SigningKey::from_bytes(&seed),
        }
    }

    /// Load from a 64-char hex seed.
    pub fn from_seed_hex(hex: &str) -> Result<Self, CryptoError> {
        let seed = crate::sha256::decode_digest_hex(hex)
            .map_err(|e| CryptoError::KeyError(format!("signing seed: {e}")))?;
        Ok(Self::from_seed_bytes(seed))
    }

    /// Derive a development seed from a word phrase.
    ///
    /// The phrase is lowercased, whitespace-normalized, and hashed with
    /// SHA-256 to produce the seed. Deterministic, so the same phrase
    /// always yields the same key. Not a checksum-grade mnemonic scheme.
    pub fn from_passphrase(phrase: &str) -> Self {
        let normalized = phrase
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");
        Self::from_seed_bytes(sha256_raw(normalized.as_bytes()))
    }

    /// The corresponding verifying key.
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey(self.inner.verifying_key())
    }

    /// Sign canonical bytes.
    pub fn sign_canonical(&self, payload: &CanonicalBytes) -> Signature {
        Signature(self.inner.sign(payload.as_bytes()))
    }

    /// Sign a 32-byte content digest.
    pub fn sign_digest(&self, digest: &ContentDigest) -> Signature {
        Signature(self.inner.sign(digest.as_bytes()))
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningKey(<private>)")
    }
}
