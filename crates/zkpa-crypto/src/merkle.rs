//! # Merkle Tree — Evidence Commitment Structure
//!
//! A binary Merkle tree over evidence digests. Leaves are the 32-byte
//! evidence content digests themselves — they are **not** hashed again on
//! entry. Parent nodes are `SHA256(left || right)` over raw bytes; layers
//! with an odd node count duplicate their last node.
//!
//! A single-leaf tree has root `SHA256(leaf)`: the leaf is hashed once
//! rather than self-paired, so a commitment to one item is still distinct
//! from the item's own digest.
//!
//! ## Inclusion proofs
//!
//! A proof is the ordered list of sibling digests with their positions.
//! Verification folds the path bottom-up and compares the result to the
//! root; an empty path (single-leaf tree) folds to `SHA256(leaf)`.

use serde::{Deserialize, Serialize};

use crate::error::CryptoError;
use crate::sha256::{decode_digest_hex, encode_digest_hex};
use zkpa_core::Sha256Accumulator;

/// Which side of the current node the sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiblingPosition {
    /// Sibling is the left input of the parent hash.
    Left,
    /// Sibling is the right input of the parent hash.
    Right,
}

/// One step of a Merkle inclusion proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProofStep {
    /// Sibling digest, 64 lowercase hex characters.
    pub sibling: String,
    /// Side the sibling occupies in the parent hash.
    pub position: SiblingPosition,
}

/// Parent hash: `SHA256(left || right)` over raw 32-byte inputs.
fn pair_hash(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut acc = Sha256Accumulator::new();
    acc.update(left);
    acc.update(right);
    acc.finalize()
}

/// Single-node hash, used only for the singleton-tree root.
fn node_hash(leaf: &[u8; 32]) -> [u8; 32] {
    let mut acc = Sha256Accumulator::new();
    acc.update(leaf);
    acc.finalize()
}

/// A built Merkle tree over evidence digests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    leaves: Vec<[u8; 32]>,
    root: [u8; 32],
    height: u32,
}

impl MerkleTree {
    /// Build a tree from raw 32-byte leaves.
    ///
    /// Duplicate leaves are permitted and preserved in order — position in
    /// the layout matters. An empty leaf set is rejected.
    pub fn build(leaves: Vec<[u8; 32]>) -> Result<Self, CryptoError> {
        if leaves.is_empty() {
            return Err(CryptoError::MerkleError(
                "cannot build a tree with no leaves".to_string(),
            ));
        }

        if leaves.len() == 1 {
            let root = node_hash(&leaves[0]);
            return Ok(Self {
                leaves,
                root,
                height: 1,
            });
        }

        let mut level = leaves.clone();
        let mut height = 0u32;
        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            for pair in level.chunks(2) {
                let right = pair.get(1).unwrap_or(&pair[0]);
                next.push(pair_hash(&pair[0], right));
            }
            level = next;
            height += 1;
        }

        Ok(Self {
            leaves,
            root: level[0],
            height,
        })
    }

    /// Build a tree from 64-char lowercase hex leaf digests.
    pub fn from_hex_leaves(hex_leaves: &[String]) -> Result<Self, CryptoError> {
        let leaves: Result<Vec<[u8; 32]>, CryptoError> = hex_leaves
            .iter()
            .enumerate()
            .map(|(i, h)| {
                decode_digest_hex(h)
                    .map_err(|e| CryptoError::MerkleError(format!("leaf {i}: {e}")))
            })
            .collect();
        Self::build(leaves?)
    }

    /// The tree root, 64 lowercase hex characters.
    pub fn root_hex(&self) -> String {
        encode_digest_hex(&self.root)
    }

    /// The tree root as raw bytes.
    pub fn root(&self) -> &[u8; 32] {
        &self.root
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Number of hashing levels between the leaf layer and the root.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Build the inclusion proof for the leaf at `index`.
    pub fn proof(&self, index: usize) -> Result<Vec<MerkleProofStep>, CryptoError> {
        if index >= self.leaves.len() {
            return Err(CryptoError::MerkleError(format!(
                "leaf index {index} out of range ({} leaves)",
                self.leaves.len()
            )));
        }

        let mut path = Vec::new();
        let mut level = self.leaves.clone();
        let mut pos = index;

        while level.len() > 1 {
            let sibling_pos = if pos % 2 == 0 {
                // Even position: sibling is on the right, or the node
                // itself when the layer ends on it (duplication rule).
                if pos + 1 < level.len() { pos + 1 } else { pos }
            } else {
                pos - 1
            };
            let position = if sibling_pos >= pos {
                SiblingPosition::Right
            } else {
                SiblingPosition::Left
            };
            path.push(MerkleProofStep {
                sibling: encode_digest_hex(&level[sibling_pos]),
                position,
            });

            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            for pair in level.chunks(2) {
                let right = pair.get(1).unwrap_or(&pair[0]);
                next.push(pair_hash(&pair[0], right));
            }
            level = next;
            pos /= 2;
        }

        Ok(path)
    }

    /// Verify an inclusion proof against a root.
    ///
    /// Malformed proofs return `false` rather than an error — a proof that
    /// cannot be folded is simply not a valid proof.
    pub fn verify_proof(leaf_hex: &str, path: &[MerkleProofStep], root_hex: &str) -> bool {
        let Ok(leaf) = decode_digest_hex(leaf_hex) else {
            return false;
        };
        let Ok(root) = decode_digest_hex(root_hex) else {
            return false;
        };

        if path.is_empty() {
            return node_hash(&leaf) == root;
        }

        let mut current = leaf;
        for step in path {
            let Ok(sibling) = decode_digest_hex(&step.sibling) else {
                return false;
            };
            current = match step.position {
                SiblingPosition::Left => pair_hash(&sibling, &current),
                SiblingPosition::Right => pair_hash(&current, &sibling),
            };
        }
        current == root
    }
}
