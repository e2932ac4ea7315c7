//! # zkpa-core — Foundational Types for the ZKPA Stack
//!
//! This crate is the bedrock of the ZKPA attestation stack. It defines the
//! type-system primitives that enforce correctness guarantees at compile
//! time. Every other crate in the workspace depends on `zkpa-core`; it
//! depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `AttestationId`,
//!    `ReceiptId`, `EvidenceLocalId` — all newtypes with validated
//!    constructors. No bare strings for identifiers.
//!
//! 2. **`CanonicalBytes` newtype.** ALL digest computation flows through
//!    `CanonicalBytes::new()`. No raw `serde_json::to_vec()` for digests.
//!    Ever. This prevents the canonicalization-split defect class by
//!    construction.
//!
//! 3. **UTC-only timestamps.** The `Timestamp` type enforces UTC with Z
//!    suffix and seconds precision — matching the canonicalization rules.
//!
//! 4. **`ContentDigest` accepts only `&CanonicalBytes`.** Compile-time
//!    enforcement that all digest paths flow through canonicalization.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `zkpa-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug`, `Clone`, and implement
//!   `Serialize`/`Deserialize` where they cross a wire.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod id;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, ContentDigest, Sha256Accumulator};
pub use error::{CanonicalizationError, CoreError};
pub use id::{AttestationId, EvidenceLocalId, ReceiptId};
pub use temporal::Timestamp;
