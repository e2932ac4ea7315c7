//! # zkpa-engine — Attestation Pipeline Engine
//!
//! The deterministic state machine that turns a completed
//! compliance-control assessment into a privacy-preserving, independently
//! verifiable attestation artifact. The engine ingests evidence
//! references, builds a Merkle commitment, produces a proof artifact,
//! assembles and signs a ZKPA-v1.1 package, optionally anchors the
//! package digest on a ledger, and exposes a verification protocol that
//! yields signed receipts.
//!
//! ## Architecture
//!
//! | Module | Responsibility |
//! |---|---|
//! | [`store`] | Concurrent in-memory state: attestations, receipts, idempotency |
//! | [`interpreter`] | Control statement → claim type / proof template / risk |
//! | [`evidence`] | Evidence validation and Merkle commitment |
//! | [`proof`] | Proof artifact construction (`commitment-v1` placeholder) |
//! | [`package`] | ZKPA-v1.1 canonical package assembly and signing |
//! | [`anchor`] | Ledger adapter interface and retry-backed dispatch |
//! | [`lifecycle`] | Guarded transitions, worker pool, sweepers, cancellation |
//! | [`webhook`] | Status-change delivery with bounded retries |
//! | [`verify`] | Multi-check verification producing signed receipts |
//! | [`pipeline`] | The façade coordinating all of the above |
//!
//! Raw evidence bytes never enter the engine: evidence is reference +
//! digest only, and the package schema has no field that could carry a
//! payload.

pub mod anchor;
pub mod attestation;
pub mod config;
pub mod error;
pub mod evidence;
pub mod interpreter;
pub mod lifecycle;
pub mod oscal;
pub mod package;
pub mod pipeline;
pub mod proof;
pub mod samples;
pub mod status;
pub mod store;
pub mod verify;
pub mod webhook;

pub use anchor::{AnchorError, AnchorRecord, LedgerAdapter, MockLedger};
pub use attestation::{
    AssessmentResult, Attestation, AttestationMetadata, ClaimType, ControlDescriptor,
    EvidenceItem, EvidenceRecord, Interpretation, InterpretationSource, PackageDocument,
    PackageRecord, ProofRecord, ProofTemplate, RevocationRecord, RiskLevel, SignatureBlock,
};
pub use config::EngineConfig;
pub use error::EngineError;
pub use interpreter::{AiAdapter, ControlInterpreter};
pub use pipeline::{AttestationPipeline, CreateAttestationRequest, CreateResponse};
pub use status::{AttestationStatus, StatusEvent};
pub use store::{MemoryStore, StateStore, StoreStats};
pub use verify::{CheckName, CheckOutcome, CheckResult, VerificationReceipt};
