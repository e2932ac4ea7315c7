//! # Domain Identity Newtypes — Validated Identifier Primitives
//!
//! Newtype wrappers for the identifiers of the attestation stack. These
//! prevent accidental identifier confusion — you cannot pass a `ReceiptId`
//! where an `AttestationId` is expected.
//!
//! ## Validation
//!
//! String-backed newtypes validate their input at construction time. The
//! inner fields are private — the only way to construct these types is
//! through the validated constructors or the generators.
//!
//! ## Formats
//!
//! - `AttestationId`: `ATT-YYYYMMDDHHMMSS-XXXXXX` — a seconds-precision
//!   UTC timestamp plus 6 hex characters from the OS CSPRNG. Lexicographic
//!   order equals creation order, which keeps listings sorted for free.
//! - `ReceiptId`: `VRF-` plus 16 hex characters from the OS CSPRNG.
//! - `EvidenceLocalId`: `EV-YYYYMMDD-NNNN` with a per-day monotonic
//!   counter assigned by the evidence committer.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::CoreError;
use crate::temporal::Timestamp;

/// Unique identifier for an attestation.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(try_from = "String", into = "String")]
pub struct AttestationId(String);

impl AttestationId {
    /// Generate a fresh identifier for the given creation instant.
    ///
    /// The 6-character suffix comes from the OS CSPRNG; collisions within
    /// the same second are resolved by the caller retrying (the store's
    /// `put_if_absent` reports them).
    pub fn generate(created_at: Timestamp) -> Self {
        let mut raw = [0u8; 3];
        OsRng.fill_bytes(&mut raw);
        let suffix: String = raw.iter().map(|b| format!("{b:02x}")).collect();
        Self(format!("ATT-{}-{}", created_at.compact_seconds(), suffix))
    }

    /// Parse and validate an existing identifier.
    pub fn parse(id: impl Into<String>) -> Result<Self, CoreError> {
        let id = id.into();
        let bytes = id.as_bytes();
        let ok = bytes.len() == 25
            && id.is_ascii()
            && id.starts_with("ATT-")
            && bytes[18] == b'-'
            && bytes[4..18].iter().all(|b| b.is_ascii_digit())
            && bytes[19..]
                .iter()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(b));
        if !ok {
            return Err(CoreError::InvalidIdentifier(format!(
                "attestation id must match ATT-YYYYMMDDHHMMSS-XXXXXX: {id:?}"
            )));
        }
        Ok(Self(id))
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AttestationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AttestationId {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<AttestationId> for String {
    fn from(id: AttestationId) -> Self {
        id.0
    }
}

/// Unique identifier for a verification receipt.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(try_from = "String", into = "String")]
pub struct ReceiptId(String);

impl ReceiptId {
    /// Generate a fresh receipt identifier.
    pub fn generate() -> Self {
        let mut raw = [0u8; 8];
        OsRng.fill_bytes(&mut raw);
        let suffix: String = raw.iter().map(|b| format!("{b:02x}")).collect();
        Self(format!("VRF-{suffix}"))
    }

    /// Parse and validate an existing identifier.
    pub fn parse(id: impl Into<String>) -> Result<Self, CoreError> {
        let id = id.into();
        let bytes = id.as_bytes();
        let ok = bytes.len() == 20
            && id.is_ascii()
            && id.starts_with("VRF-")
            && bytes[4..]
                .iter()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(b));
        if !ok {
            return Err(CoreError::InvalidIdentifier(format!(
                "receipt id must match VRF-<16 hex>: {id:?}"
            )));
        }
        Ok(Self(id))
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ReceiptId {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<ReceiptId> for String {
    fn from(id: ReceiptId) -> Self {
        id.0
    }
}

/// Per-attestation local identifier for an evidence item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct EvidenceLocalId(String);

impl EvidenceLocalId {
    /// Build an evidence id from a date and a per-day counter.
    pub fn new(day: &Timestamp, counter: u64) -> Self {
        Self(format!("EV-{}-{counter:04}", day.yyyymmdd()))
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EvidenceLocalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
