//! # zkpa-crypto — Cryptographic Primitives for the ZKPA Stack
//!
//! Provides the hash, commitment, and signature machinery used by the
//! attestation engine:
//!
//! - SHA-256 digests over [`CanonicalBytes`](zkpa_core::CanonicalBytes)
//!   and hex codec helpers for 32-byte digests.
//! - A binary Merkle tree over evidence digests with inclusion proofs.
//! - Ed25519 signing and verification with strict key-handling rules.
//!
//! ## Security Invariant
//!
//! Digest computation over structured data flows through `CanonicalBytes`
//! (enforced by `zkpa-core`). The only raw-byte hash paths are Merkle pair
//! hashing and proof transcripts, both implemented here and nowhere else.

pub mod ed25519;
pub mod error;
pub mod merkle;
pub mod sha256;

pub use ed25519::{Signature, SigningKey, VerifyingKey};
pub use error::CryptoError;
pub use merkle::{MerkleProofStep, MerkleTree, SiblingPosition};
pub use sha256::{decode_digest_hex, encode_digest_hex, is_digest_hex, sha256_hex};
