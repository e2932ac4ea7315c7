//! # Attestation Lifecycle States
//!
//! Defines the lifecycle state machine: states, the permitted transition
//! relation, terminal classification, and the bounded per-attestation
//! event log.
//!
//! ```text
//! pending              → computing_commitment | failed_evidence
//! computing_commitment → generating_proof     | failed_evidence
//! generating_proof     → assembling_package   | failed_proof
//! assembling_package   → anchoring | valid    | failed
//! anchoring            → valid     | failed_anchor
//! valid                → revoked   | expired
//! ```
//!
//! Every non-terminal processing state may additionally reach `failed`:
//! this is the cooperative-cancellation edge, taken at step boundaries
//! with reason `cancelled`. Terminal states admit no outgoing transitions.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use zkpa_core::Timestamp;

/// Maximum number of retained lifecycle events per attestation.
pub const EVENT_LOG_CAP: usize = 32;

/// Lifecycle state of an attestation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttestationStatus {
    /// Accepted, processing not yet started.
    Pending,
    /// Evidence validated, Merkle commitment computed.
    ComputingCommitment,
    /// Proof artifact under construction.
    GeneratingProof,
    /// Canonical package assembly and signing.
    AssemblingPackage,
    /// Ledger submission in flight.
    Anchoring,
    /// Terminal success.
    Valid,
    /// Terminal: evidence rejected.
    FailedEvidence,
    /// Terminal: proof construction failed.
    FailedProof,
    /// Terminal: ledger submission failed permanently.
    FailedAnchor,
    /// Terminal: generic processing failure (includes cancellation).
    Failed,
    /// Terminal: revoked by the issuer after reaching `valid`.
    Revoked,
    /// Terminal: validity window elapsed.
    Expired,
}

impl AttestationStatus {
    /// The wire name of this state (snake_case).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ComputingCommitment => "computing_commitment",
            Self::GeneratingProof => "generating_proof",
            Self::AssemblingPackage => "assembling_package",
            Self::Anchoring => "anchoring",
            Self::Valid => "valid",
            Self::FailedEvidence => "failed_evidence",
            Self::FailedProof => "failed_proof",
            Self::FailedAnchor => "failed_anchor",
            Self::Failed => "failed",
            Self::Revoked => "revoked",
            Self::Expired => "expired",
        }
    }

    /// Parse a wire name back into a state.
    pub fn parse(s: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::String(s.to_string())).ok()
    }

    /// States reachable from this one.
    pub fn permitted_targets(&self) -> &'static [AttestationStatus] {
        use AttestationStatus::*;
        match self {
            Pending => &[ComputingCommitment, FailedEvidence, Failed],
            ComputingCommitment => &[GeneratingProof, FailedEvidence, Failed],
            GeneratingProof => &[AssemblingPackage, FailedProof, Failed],
            AssemblingPackage => &[Anchoring, Valid, Failed],
            Anchoring => &[Valid, FailedAnchor, Failed],
            Valid => &[Revoked, Expired],
            FailedEvidence | FailedProof | FailedAnchor | Failed | Revoked | Expired => &[],
        }
    }

    /// Returns `true` if `to` is a permitted successor of `self`.
    pub fn can_transition_to(&self, to: AttestationStatus) -> bool {
        self.permitted_targets().contains(&to)
    }

    /// Terminal states admit no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        self.permitted_targets().is_empty() || *self == Self::Valid
    }

    /// Failure states.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::FailedEvidence | Self::FailedProof | Self::FailedAnchor | Self::Failed
        )
    }
}

impl std::fmt::Display for AttestationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded lifecycle transition.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusEvent {
    /// State before the transition.
    pub from: AttestationStatus,
    /// State after the transition.
    pub to: AttestationStatus,
    /// When the transition was recorded.
    pub at: Timestamp,
    /// Optional operator- or engine-supplied reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
