//! # Evidence Commitment
//!
//! Validates evidence references and builds the Merkle commitment. The
//! engine holds references and digests only — the `data:` URI guard below
//! closes the one channel through which payload bytes could smuggle into
//! stored state.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use zkpa_core::{sha256_digest, CanonicalBytes, EvidenceLocalId, Timestamp};
use zkpa_crypto::{is_digest_hex, MerkleTree};

use crate::attestation::{EvidenceItem, EvidenceRecord};
use crate::error::EngineError;

/// Maximum accepted reference URI length.
const MAX_URI_LEN: usize = 2048;
/// Maximum accepted evidence type tag length.
const MAX_TYPE_LEN: usize = 64;

/// One evidence reference as submitted by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EvidenceInput {
    /// Opaque reference URI. Never fetched.
    pub uri: String,
    /// Declared SHA-256 digest, 64 lowercase hex chars.
    pub hash: String,
    /// Declared evidence type tag.
    #[serde(rename = "type")]
    pub kind: String,
}

/// Assigns `EV-YYYYMMDD-NNNN` local identifiers and builds commitments.
///
/// The counter is monotonic within a UTC day and resets when the day
/// rolls over.
#[derive(Debug, Default)]
pub struct EvidenceCommitter {
    day_counter: Mutex<(String, u64)>,
}

impl EvidenceCommitter {
    /// Create a committer with a fresh counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the evidence list and build its commitment record.
    ///
    /// Rejections carry the position of the offending item so callers can
    /// repair the exact entry.
    pub fn commit(
        &self,
        items: &[EvidenceInput],
        now: Timestamp,
    ) -> Result<EvidenceRecord, EngineError> {
        if items.is_empty() {
            return Err(EngineError::InvalidEvidence(
                "evidence list must not be empty".to_string(),
            ));
        }

        for (i, item) in items.iter().enumerate() {
            validate_item(i, item)?;
        }

        let assigned: Vec<EvidenceItem> = items
            .iter()
            .map(|item| EvidenceItem {
                id: self.next_local_id(now),
                uri: item.uri.clone(),
                hash: item.hash.clone(),
                kind: item.kind.clone(),
            })
            .collect();

        // Duplicate digests are permitted and preserved in order: position
        // matters in the Merkle layout.
        let leaf_hexes: Vec<String> = assigned.iter().map(|i| i.hash.clone()).collect();
        let tree = MerkleTree::from_hex_leaves(&leaf_hexes)
            .map_err(|e| EngineError::InvalidEvidence(e.to_string()))?;

        // The commitment hash binds the evidence record independently of
        // the Merkle layout: canonical JSON of the items minus local ids.
        let canonical = CanonicalBytes::new(&items.to_vec())?;
        let commitment_hash = sha256_digest(&canonical).to_hex();

        Ok(EvidenceRecord {
            merkle_root: tree.root_hex(),
            commitment_hash,
            leaf_count: tree.leaf_count(),
            tree_height: tree.height(),
            items: assigned,
        })
    }

    fn next_local_id(&self, now: Timestamp) -> EvidenceLocalId {
        let today = now.yyyymmdd();
        let mut guard = self.day_counter.lock();
        if guard.0 != today {
            *guard = (today, 0);
        }
        guard.1 += 1;
        EvidenceLocalId::new(&now, guard.1)
    }
}

fn validate_item(index: usize, item: &EvidenceInput) -> Result<(), EngineError> {
    if item.uri.is_empty() {
        return Err(EngineError::InvalidEvidence(format!(
            "evidence[{index}]: uri must not be empty"
        )));
    }
    if item.uri.len() > MAX_URI_LEN {
        return Err(EngineError::InvalidEvidence(format!(
            "evidence[{index}]: uri exceeds {MAX_URI_LEN} characters"
        )));
    }
    if item.uri.starts_with("data:") {
        return Err(EngineError::InvalidEvidence(format!(
            "evidence[{index}]: data: URIs are rejected — evidence is reference-only"
        )));
    }
    if !is_digest_hex(&item.hash) {
        return Err(EngineError::InvalidEvidence(format!(
            "evidence[{index}]: hash must be 64 lowercase hex characters"
        )));
    }
    if item.kind.is_empty() {
        return Err(EngineError::InvalidEvidence(format!(
            "evidence[{index}]: type must not be empty"
        )));
    }
    if item.kind.len() > MAX_TYPE_LEN {
        return Err(EngineError::InvalidEvidence(format!(
            "evidence[{index}]: type exceeds {MAX_TYPE_LEN} characters"
        )));
    }
    Ok(())
}
