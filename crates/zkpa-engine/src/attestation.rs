//! # Attestation Data Model
//!
//! The full attestation record and its constituent parts: the input
//! control descriptor, the interpretation, the evidence commitment, the
//! proof artifact, the signed package, the anchor record, and metadata.
//!
//! ## Invariants
//!
//! - The identifier is globally unique and immutable.
//! - Exactly one evidence record, set at creation.
//! - State transitions follow the relation in [`crate::status`]; the
//!   bounded event log reflects their total order.
//! - `valid_until = issued_at + validity_period` (90-day default).
//! - Once terminal, no field changes other than the revocation record
//!   attached by a revoke.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use zkpa_core::{AttestationId, EvidenceLocalId, Timestamp};
use zkpa_crypto::{Signature, VerifyingKey};

use crate::error::EngineError;
use crate::status::{AttestationStatus, StatusEvent, EVENT_LOG_CAP};

/// Upstream assessment outcome for a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssessmentResult {
    /// Control assessed as satisfied.
    Pass,
    /// Control assessed as not satisfied.
    Fail,
    /// Control assessed as partially satisfied.
    Partial,
}

/// The input control descriptor: what was assessed, by which framework,
/// with what outcome, over which window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ControlDescriptor {
    /// Compliance framework tag (e.g. "NIST 800-53").
    pub framework: String,
    /// Control identifier within the framework (e.g. "AC-2").
    pub control_id: String,
    /// The control statement text.
    pub statement: String,
    /// Upstream assessment outcome.
    pub assessment_result: AssessmentResult,
    /// The assessment window, as reported upstream (opaque).
    pub assessment_window: String,
}

/// Semantic classification of what a proof is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    /// Integrity of a dataset (logs, backups, retention).
    EvidenceIntegrity,
    /// Effectiveness of a control (access, identity, accounts).
    ControlEffectiveness,
    /// Presence of an audit trail (monitoring, tracking, events).
    AuditTrail,
}

/// The chosen shape of the proof artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProofTemplate {
    /// Merkle commitment over the evidence set.
    MerkleCommitment,
    /// Zero-knowledge predicate over control properties.
    ZkPredicate,
    /// Chronological signature chain.
    SignatureChain,
}

/// Control criticality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Low criticality.
    Low,
    /// Medium criticality.
    Medium,
    /// High criticality.
    High,
}

/// Where an interpretation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum InterpretationSource {
    /// Deterministic keyword mapping.
    #[serde(rename = "rule-based")]
    RuleBased,
    /// A configured AI adapter.
    #[serde(rename = "ai")]
    Ai,
}

/// The interpretation of a control statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Interpretation {
    /// What the proof is about.
    pub claim_type: ClaimType,
    /// Chosen proof shape.
    pub proof_template: ProofTemplate,
    /// Control criticality.
    pub risk_level: RiskLevel,
    /// Evidence kind tags required for this claim/framework pair.
    pub required_evidence: Vec<String>,
    /// Short explanation of the mapping.
    pub reasoning: String,
    /// Confidence in the interpretation, 0.0–1.0.
    pub confidence: f64,
    /// Interpretation source.
    pub source: InterpretationSource,
}

/// One evidence reference. The engine never fetches or stores the
/// referenced payload — only its declared digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EvidenceItem {
    /// Assigned local identifier (`EV-YYYYMMDD-NNNN`).
    pub id: EvidenceLocalId,
    /// Opaque reference URI.
    pub uri: String,
    /// Declared SHA-256 content digest, 64 lowercase hex chars.
    pub hash: String,
    /// Declared evidence type tag.
    #[serde(rename = "type")]
    pub kind: String,
}

/// The evidence commitment record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EvidenceRecord {
    /// Ordered evidence items. Order is the Merkle layout.
    pub items: Vec<EvidenceItem>,
    /// Merkle root over the item digests (64 hex chars).
    pub merkle_root: String,
    /// `SHA-256(canonical_json(items minus local ids))` — binds the
    /// evidence record independently of the Merkle layout.
    pub commitment_hash: String,
    /// Number of leaves.
    pub leaf_count: usize,
    /// Hashing levels between leaf layer and root.
    pub tree_height: u32,
}

/// The proof artifact record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProofRecord {
    /// Algorithm tag (`commitment-v1` for the placeholder backend).
    pub algorithm: String,
    /// The proof artifact bytes (UTF-8 canonical JSON for the
    /// placeholder backend; opaque for real backends).
    pub proof_bytes: String,
    /// `SHA-256(proof_bytes)`, 64 hex chars.
    pub proof_digest: String,
    /// Declared public inputs: `[merkle_root, sha256(statement),
    /// sha256(policy)]`.
    pub public_inputs: Vec<String>,
    /// Artifact size in bytes.
    pub size: usize,
    /// When the artifact was produced.
    pub generated_at: Timestamp,
}

/// Ed25519 signature block attached to packages and receipts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SignatureBlock {
    /// Always `"Ed25519"`.
    pub algorithm: String,
    /// Signature value, 128 hex chars.
    #[schema(value_type = String)]
    pub value: Signature,
    /// Hex-encoded signer public key.
    #[schema(value_type = String)]
    pub signer_public_key: VerifyingKey,
    /// When the signature was produced.
    pub signed_at: Timestamp,
}

/// Evidence summary embedded in the package (digests only — the schema
/// has no field that could carry payload bytes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EvidenceSummary {
    /// Merkle root over the evidence digests.
    pub merkle_root: String,
    /// Layout-independent commitment hash.
    pub commitment_hash: String,
    /// Number of committed items.
    pub leaf_count: usize,
}

/// Proof summary embedded in the package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProofSummary {
    /// Proof algorithm tag.
    pub algorithm: String,
    /// Digest of the proof artifact.
    pub proof_digest: String,
    /// Declared public inputs.
    pub public_inputs: Vec<String>,
    /// Artifact size in bytes.
    pub size: usize,
}

/// Package metadata. Timestamps are ISO-8601 strings so the canonical
/// byte rendering never depends on a serializer's datetime policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PackageMetadataDoc {
    /// The governing policy string.
    pub policy: String,
    /// Issuance instant, ISO-8601 Z.
    pub issued_at: String,
    /// Expiry instant, ISO-8601 Z.
    pub valid_until: String,
    /// Issuer identifier.
    pub issuer: String,
}

/// The ZKPA-v1.1 package document. Canonicalizing this structure and
/// hashing the bytes yields the package digest; the Ed25519 signature is
/// over that digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PackageDocument {
    /// Always `"zkpa"`.
    pub protocol: String,
    /// Always `"1.1"`.
    pub version: String,
    /// The attestation this package belongs to.
    pub attestation_id: String,
    /// Evidence summary.
    pub evidence: EvidenceSummary,
    /// Proof summary.
    pub proof: ProofSummary,
    /// Package metadata.
    pub metadata: PackageMetadataDoc,
}

/// The assembled, signed package record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PackageRecord {
    /// The canonical package document.
    pub document: PackageDocument,
    /// `SHA-256(canonical_bytes(document))`, 64 hex chars.
    pub package_hash: String,
    /// Ed25519 signature over the package digest.
    pub signature: SignatureBlock,
    /// Optional external location of the exported package.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_uri: Option<String>,
}

/// Revocation record attached when a `valid` attestation is revoked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RevocationRecord {
    /// When the revocation was recorded.
    pub revoked_at: Timestamp,
    /// Operator-supplied reason.
    pub reason: String,
    /// Principal that requested the revocation, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_by: Option<String>,
}

/// Attestation-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttestationMetadata {
    /// The governing policy string.
    pub policy: String,
    /// Issuance instant.
    pub issued_at: Timestamp,
    /// Expiry instant (`issued_at + validity_period`).
    pub valid_until: Timestamp,
    /// Issuer identifier.
    pub issuer: String,
    /// Webhook target for status-change notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

/// A full attestation record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Attestation {
    /// Unique, immutable, creation-time-sortable identifier.
    #[schema(value_type = String)]
    pub id: AttestationId,
    /// Current lifecycle state.
    pub status: AttestationStatus,
    /// Creation instant.
    pub created_at: Timestamp,
    /// Set when the attestation reaches a terminal state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
    /// The assessed control.
    pub control: ControlDescriptor,
    /// Interpretation of the control statement.
    pub interpretation: Interpretation,
    /// The evidence commitment (exactly one, set at creation).
    pub evidence: EvidenceRecord,
    /// Proof artifact, present from `assembling_package` onward.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof: Option<ProofRecord>,
    /// Signed package, present once assembly completes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<PackageRecord>,
    /// Ledger anchor result or error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<crate::anchor::AnchorRecord>,
    /// Attestation metadata.
    pub metadata: AttestationMetadata,
    /// Short failure reason for failed states.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    /// Revocation record, set only by a revoke of a `valid` attestation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation: Option<RevocationRecord>,
    /// Bounded lifecycle event log (most recent 32).
    pub events: Vec<StatusEvent>,
    /// Monotonically increasing store revision.
    pub revision: u64,
}

impl Attestation {
    /// Record a lifecycle transition, enforcing the permitted relation.
    ///
    /// Appends an event (dropping the oldest beyond the cap), updates the
    /// status, and stamps `completed_at` on entry to a terminal state.
    pub fn record_transition(
        &mut self,
        to: AttestationStatus,
        reason: Option<String>,
    ) -> Result<(), EngineError> {
        if !self.status.can_transition_to(to) {
            return Err(EngineError::InvalidTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }
        let at = Timestamp::now();
        self.events.push(StatusEvent {
            from: self.status,
            to,
            at,
            reason,
        });
        if self.events.len() > EVENT_LOG_CAP {
            let excess = self.events.len() - EVENT_LOG_CAP;
            self.events.drain(..excess);
        }
        self.status = to;
        if to.is_terminal() && self.completed_at.is_none() {
            self.completed_at = Some(at);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::AttestationStatus::*;

    fn sample() -> Attestation {
        let created = Timestamp::now();
        Attestation {
            id: AttestationId::generate(created),
            status: ComputingCommitment,
            created_at: created,
            completed_at: None,
            control: ControlDescriptor {
                framework: "NIST 800-53".into(),
                control_id: "AC-2".into(),
                statement: "The organization manages information system accounts".into(),
                assessment_result: AssessmentResult::Pass,
                assessment_window: "2026-Q1".into(),
            },
            interpretation: Interpretation {
                claim_type: ClaimType::ControlEffectiveness,
                proof_template: ProofTemplate::ZkPredicate,
                risk_level: RiskLevel::High,
                required_evidence: vec!["access_logs".into()],
                reasoning: "keyword mapping".into(),
                confidence: 0.85,
                source: InterpretationSource::RuleBased,
            },
            evidence: EvidenceRecord {
                items: vec![],
                merkle_root: "00".repeat(32),
                commitment_hash: "11".repeat(32),
                leaf_count: 1,
                tree_height: 1,
            },
            proof: None,
            package: None,
            anchor: None,
            metadata: AttestationMetadata {
                policy: "NIST 800-53 - AC-2".into(),
                issued_at: created,
                valid_until: created.plus_seconds(60),
                issuer: "zkpa-issuer".into(),
                callback_url: None,
            },
            error_reason: None,
            revocation: None,
            events: vec![],
            revision: 0,
        }
    }

    #[test]
    fn permitted_transition_appends_event() {
        let mut att = sample();
        att.record_transition(GeneratingProof, None).unwrap();
        assert_eq!(att.status, GeneratingProof);
        assert_eq!(att.events.len(), 1);
        assert_eq!(att.events[0].from, ComputingCommitment);
        assert_eq!(att.events[0].to, GeneratingProof);
    }

    #[test]
    fn forbidden_transition_rejected() {
        let mut att = sample();
        let err = att.record_transition(Valid, None).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
        assert_eq!(att.status, ComputingCommitment);
        assert!(att.events.is_empty());
    }

    #[test]
    fn terminal_entry_stamps_completion() {
        let mut att = sample();
        att.record_transition(FailedEvidence, Some("bad digest".into()))
            .unwrap();
        assert!(att.completed_at.is_some());
        assert_eq!(att.events[0].reason.as_deref(), Some("bad digest"));
    }

    #[test]
    fn out_of_terminal_rejected() {
        let mut att = sample();
        att.record_transition(Failed, Some("cancelled".into())).unwrap();
        assert!(att.record_transition(GeneratingProof, None).is_err());
    }

    #[test]
    fn event_log_bounded_to_cap() {
        let mut att = sample();
        // Artificially grow the log past the cap with alternating edges.
        for _ in 0..EVENT_LOG_CAP {
            att.events.push(StatusEvent {
                from: Pending,
                to: ComputingCommitment,
                at: Timestamp::now(),
                reason: None,
            });
        }
        att.record_transition(GeneratingProof, None).unwrap();
        assert_eq!(att.events.len(), EVENT_LOG_CAP);
        let last = att.events.last().unwrap();
        assert_eq!(last.to, GeneratingProof);
    }

    #[test]
    fn serde_uses_wire_names() {
        let att = sample();
        let value = serde_json::to_value(&att).unwrap();
        assert_eq!(value["status"], "computing_commitment");
        assert_eq!(value["control"]["assessment_result"], "PASS");
        assert_eq!(value["interpretation"]["claim_type"], "control_effectiveness");
        assert_eq!(value["interpretation"]["proof_template"], "zk_predicate");
        assert_eq!(value["interpretation"]["risk_level"], "high");
        assert_eq!(value["interpretation"]["source"], "rule-based");
    }

    #[test]
    fn evidence_item_serializes_type_field() {
        let item = EvidenceItem {
            id: EvidenceLocalId::new(&Timestamp::now(), 1),
            uri: "demo://ev/1".into(),
            hash: "aa".repeat(32),
            kind: "log".into(),
        };
        let value = serde_json::to_value(&item).unwrap();
        assert!(value.get("type").is_some());
        assert!(value.get("kind").is_none());
    }
}
