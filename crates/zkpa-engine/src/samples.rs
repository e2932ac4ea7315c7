//! # Sample Control Catalog
//!
//! Pre-defined compliance controls across major frameworks for the
//! quick-attest surface, with deterministic evidence synthesis so a demo
//! attestation is reproducible end-to-end.

use serde::Serialize;

use zkpa_crypto::sha256_hex;

use crate::attestation::{ClaimType, RiskLevel};
use crate::evidence::EvidenceInput;

/// A pre-defined compliance control.
#[derive(Debug, Clone, Serialize)]
pub struct SampleControl {
    /// Control identifier within its framework.
    pub control_id: &'static str,
    /// Framework name.
    pub framework: &'static str,
    /// Short control title.
    pub title: &'static str,
    /// The control statement.
    pub statement: &'static str,
    /// Catalog-declared claim type.
    pub claim_type: ClaimType,
    /// Catalog-declared risk level.
    pub risk_level: RiskLevel,
    /// Number of evidence items synthesized for quick-attest.
    pub evidence_count: usize,
    /// One-line description.
    pub description: &'static str,
}

/// The sample catalog.
pub const SAMPLE_CONTROLS: &[SampleControl] = &[
    SampleControl {
        control_id: "AC-2",
        framework: "NIST 800-53",
        title: "Account Management",
        statement: "The organization manages information system accounts, including establishing, activating, modifying, reviewing, disabling, and removing accounts.",
        claim_type: ClaimType::ControlEffectiveness,
        risk_level: RiskLevel::High,
        evidence_count: 5,
        description: "Account lifecycle management from provisioning to removal",
    },
    SampleControl {
        control_id: "AU-2",
        framework: "NIST 800-53",
        title: "Audit Events",
        statement: "The organization determines that the information system is capable of auditing security-relevant events and coordinates the audit function across organizational entities.",
        claim_type: ClaimType::AuditTrail,
        risk_level: RiskLevel::High,
        evidence_count: 5,
        description: "Audit logging captures security-relevant events",
    },
    SampleControl {
        control_id: "CC6.1",
        framework: "SOC 2",
        title: "Logical and Physical Access Controls",
        statement: "The entity implements logical access security software, infrastructure, and architectures over protected information assets.",
        claim_type: ClaimType::ControlEffectiveness,
        risk_level: RiskLevel::High,
        evidence_count: 4,
        description: "Logical access controls protect systems from unauthorized access",
    },
    SampleControl {
        control_id: "CC7.2",
        framework: "SOC 2",
        title: "System Monitoring",
        statement: "The entity monitors system components for anomalies indicative of malicious acts, natural disasters, and errors.",
        claim_type: ClaimType::AuditTrail,
        risk_level: RiskLevel::High,
        evidence_count: 4,
        description: "Continuous monitoring detects security events and anomalies",
    },
    SampleControl {
        control_id: "A.5.15",
        framework: "ISO 27001",
        title: "Access Control",
        statement: "Rules to control physical and logical access to information and associated assets shall be established and implemented.",
        claim_type: ClaimType::ControlEffectiveness,
        risk_level: RiskLevel::Medium,
        evidence_count: 3,
        description: "Access control policy with authorization and review",
    },
    SampleControl {
        control_id: "A.8.13",
        framework: "ISO 27001",
        title: "Information Backup",
        statement: "Backup copies of information, software and systems shall be maintained and regularly tested with integrity verification.",
        claim_type: ClaimType::EvidenceIntegrity,
        risk_level: RiskLevel::Medium,
        evidence_count: 3,
        description: "Backup integrity with restore testing",
    },
    SampleControl {
        control_id: "164.308(a)(1)(ii)(D)",
        framework: "HIPAA",
        title: "Information System Activity Review",
        statement: "Implement procedures to regularly review records of information system activity, such as audit logs, access reports, and security incident tracking reports.",
        claim_type: ClaimType::AuditTrail,
        risk_level: RiskLevel::High,
        evidence_count: 4,
        description: "Regular review of system activity records",
    },
    SampleControl {
        control_id: "PCI-10.2",
        framework: "PCI-DSS",
        title: "Audit Trail Implementation",
        statement: "Implement automated audit trails for all system components to reconstruct access to cardholder data and administrative actions.",
        claim_type: ClaimType::AuditTrail,
        risk_level: RiskLevel::High,
        evidence_count: 5,
        description: "Comprehensive audit trails for payment card security",
    },
];

/// Evidence type tags cycled through during synthesis.
const EVIDENCE_KINDS: &[&str] = &["log", "config", "report", "screenshot"];

/// Look up a control by identifier.
pub fn control_by_id(control_id: &str) -> Option<&'static SampleControl> {
    SAMPLE_CONTROLS.iter().find(|c| c.control_id == control_id)
}

/// Case-insensitive search across id, title, statement, and framework.
pub fn search(query: &str) -> Vec<&'static SampleControl> {
    let q = query.to_lowercase();
    SAMPLE_CONTROLS
        .iter()
        .filter(|c| {
            c.control_id.to_lowercase().contains(&q)
                || c.title.to_lowercase().contains(&q)
                || c.statement.to_lowercase().contains(&q)
                || c.framework.to_lowercase().contains(&q)
        })
        .collect()
}

/// Synthesize the control's deterministic evidence list.
///
/// URIs and digests are pure functions of (control, index) so repeated
/// demos produce byte-identical commitments.
pub fn synthesize_evidence(control: &SampleControl) -> Vec<EvidenceInput> {
    (0..control.evidence_count)
        .map(|i| EvidenceInput {
            uri: format!("demo://evidence/{}/{}", control.control_id, i + 1),
            hash: sha256_hex(format!("{}:{}:{}", control.framework, control.control_id, i).as_bytes()),
            kind: EVIDENCE_KINDS[i % EVIDENCE_KINDS.len()].to_string(),
        })
        .collect()
}
