//! # Control Interpreter
//!
//! Maps a control statement to a claim type, proof template, risk level,
//! and required evidence kinds.
//!
//! The rule-based path is authoritative and total: every input produces a
//! result, and the output is a pure function of the lowercased statement,
//! framework, and control identifier. An optional AI adapter may refine
//! the mapping; its output is schema-validated and any failure (timeout,
//! malformed JSON, out-of-vocabulary values) falls back to the rules.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::attestation::{
    ClaimType, Interpretation, InterpretationSource, ProofTemplate, RiskLevel,
};
use crate::error::EngineError;

/// Wall-clock budget for a configured AI adapter.
const AI_TIMEOUT: Duration = Duration::from_secs(2);

/// Keyword groups scanned in enumeration order; the first group with a
/// match wins. Substring containment on the lowercased statement —
/// `authenticat` deliberately covers both "authenticate" and
/// "authentication".
const GROUP_INTEGRITY: &[&str] = &["integrity", "backup", "log", "retention"];
const GROUP_ACCESS: &[&str] = &[
    "access",
    "authenticat",
    "account",
    "identity",
    "least privilege",
    "mfa",
];
const GROUP_AUDIT: &[&str] = &["monitor", "audit", "track", "trail", "event"];

/// Adapter contract for an external model that proposes interpretations.
///
/// The returned JSON must carry `claim_type`, `proof_template`,
/// `risk_level`, `evidence_requirements`, `reasoning`, and optionally
/// `confidence`. The caller validates everything; a misbehaving adapter
/// can degrade quality but never correctness.
#[async_trait]
pub trait AiAdapter: Send + Sync {
    /// Propose an interpretation for the given control.
    async fn interpret(
        &self,
        statement: &str,
        framework: &str,
        control_id: Option<&str>,
    ) -> Result<Value, EngineError>;
}

/// The control interpreter: deterministic rules plus optional AI refinement.
pub struct ControlInterpreter {
    ai: Option<Arc<dyn AiAdapter>>,
}

impl ControlInterpreter {
    /// Rule-based only.
    pub fn rule_based() -> Self {
        Self { ai: None }
    }

    /// Rules with an AI adapter in front.
    pub fn with_ai(ai: Arc<dyn AiAdapter>) -> Self {
        Self { ai: Some(ai) }
    }

    /// Interpret a control statement.
    ///
    /// Tries the AI adapter (2 s budget) when configured, validating the
    /// response against the output vocabulary; otherwise — or on any
    /// failure — applies the deterministic rules.
    pub async fn interpret(
        &self,
        statement: &str,
        framework: &str,
        control_id: Option<&str>,
    ) -> Interpretation {
        if let Some(ai) = &self.ai {
            match tokio::time::timeout(AI_TIMEOUT, ai.interpret(statement, framework, control_id))
                .await
            {
                Ok(Ok(value)) => match validate_ai_output(&value, framework) {
                    Some(interpretation) => return interpretation,
                    None => {
                        tracing::warn!(
                            framework,
                            "AI interpretation failed schema validation, using rules"
                        );
                    }
                },
                Ok(Err(err)) => {
                    tracing::warn!(framework, error = %err, "AI adapter error, using rules");
                }
                Err(_) => {
                    tracing::warn!(framework, "AI adapter timed out, using rules");
                }
            }
        }
        rule_based_interpretation(statement, framework, control_id)
    }
}

/// The deterministic keyword mapping. Total: every input maps somewhere.
pub fn rule_based_interpretation(
    statement: &str,
    framework: &str,
    control_id: Option<&str>,
) -> Interpretation {
    let lowered = statement.to_lowercase();
    let contains_any = |keywords: &[&str]| keywords.iter().any(|k| lowered.contains(k));

    let (claim_type, proof_template, risk_level) = if contains_any(GROUP_INTEGRITY) {
        (
            ClaimType::EvidenceIntegrity,
            ProofTemplate::MerkleCommitment,
            RiskLevel::Medium,
        )
    } else if contains_any(GROUP_ACCESS) {
        (
            ClaimType::ControlEffectiveness,
            ProofTemplate::ZkPredicate,
            RiskLevel::High,
        )
    } else if contains_any(GROUP_AUDIT) {
        (
            ClaimType::AuditTrail,
            ProofTemplate::SignatureChain,
            RiskLevel::Medium,
        )
    } else {
        (
            ClaimType::ControlEffectiveness,
            ProofTemplate::MerkleCommitment,
            RiskLevel::Medium,
        )
    };

    let control_label = control_id.unwrap_or("unidentified control");
    let reasoning = format!(
        "Keyword analysis of {control_label} ({framework}) classifies it as {}; {} selected as the proof template.",
        claim_label(claim_type),
        template_label(proof_template),
    );

    Interpretation {
        claim_type,
        proof_template,
        risk_level,
        required_evidence: required_evidence_kinds(claim_type, framework),
        reasoning,
        confidence: 0.85,
        source: InterpretationSource::RuleBased,
    }
}

/// Fixed evidence-kind table per (claim type, framework).
pub fn required_evidence_kinds(claim_type: ClaimType, framework: &str) -> Vec<String> {
    let base: &[&str] = match claim_type {
        ClaimType::EvidenceIntegrity => &[
            "backup_records",
            "integrity_checksums",
            "audit_logs",
            "recovery_procedures",
        ],
        ClaimType::ControlEffectiveness => &[
            "access_logs",
            "user_directory",
            "permission_matrix",
            "authentication_records",
            "policy_documents",
        ],
        ClaimType::AuditTrail => &[
            "audit_logs",
            "monitoring_data",
            "event_records",
            "compliance_reports",
        ],
    };
    let mut kinds: Vec<String> = base.iter().map(|s| s.to_string()).collect();
    match framework {
        "HIPAA" => kinds.push("phi_access_reports".to_string()),
        "PCI-DSS" => kinds.push("cardholder_data_logs".to_string()),
        _ => {}
    }
    kinds
}

fn claim_label(claim: ClaimType) -> &'static str {
    match claim {
        ClaimType::EvidenceIntegrity => "evidence integrity",
        ClaimType::ControlEffectiveness => "control effectiveness",
        ClaimType::AuditTrail => "audit trail",
    }
}

fn template_label(template: ProofTemplate) -> &'static str {
    match template {
        ProofTemplate::MerkleCommitment => "merkle commitment",
        ProofTemplate::ZkPredicate => "zk predicate",
        ProofTemplate::SignatureChain => "signature chain",
    }
}

/// Validate an AI adapter response against the output vocabulary.
///
/// Returns `None` on any missing field or out-of-vocabulary value; the
/// caller falls back to the rules. Confidence defaults to 0.95 when the
/// adapter does not report one, and is clamped to [0, 1].
fn validate_ai_output(value: &Value, framework: &str) -> Option<Interpretation> {
    let claim_type: ClaimType = serde_json::from_value(value.get("claim_type")?.clone()).ok()?;
    let proof_template: ProofTemplate =
        serde_json::from_value(value.get("proof_template")?.clone()).ok()?;
    let risk_level: RiskLevel = serde_json::from_value(value.get("risk_level")?.clone()).ok()?;

    let required_evidence = match value.get("evidence_requirements") {
        Some(Value::Array(items)) => {
            let kinds: Option<Vec<String>> = items
                .iter()
                .map(|v| v.as_str().map(|s| s.to_string()))
                .collect();
            kinds?
        }
        _ => required_evidence_kinds(claim_type, framework),
    };

    let reasoning = value.get("reasoning")?.as_str()?.to_string();
    let confidence = value
        .get("confidence")
        .and_then(Value::as_f64)
        .unwrap_or(0.95)
        .clamp(0.0, 1.0);

    Some(Interpretation {
        claim_type,
        proof_template,
        risk_level,
        required_evidence,
        reasoning,
        confidence,
        source: InterpretationSource::Ai,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn account_management_maps_to_zk_predicate() {
        let interp = rule_based_interpretation(
            "The organization manages information system accounts",
            "NIST 800-53",
            Some("AC-2"),
        );
        assert_eq!(interp.claim_type, ClaimType::ControlEffectiveness);
        assert_eq!(interp.proof_template, ProofTemplate::ZkPredicate);
        assert_eq!(interp.risk_level, RiskLevel::High);
        assert_eq!(interp.source, InterpretationSource::RuleBased);
        assert!((interp.confidence - 0.85).abs() < f64::EPSILON);
    }

    #[test]
    fn integrity_group_wins_ties() {
        // "log" (integrity group) and "access" (access group) both match;
        // the integrity group is enumerated first.
        let interp = rule_based_interpretation(
            "Access logs are retained with integrity checks",
            "SOC 2",
            None,
        );
        assert_eq!(interp.claim_type, ClaimType::EvidenceIntegrity);
        assert_eq!(interp.proof_template, ProofTemplate::MerkleCommitment);
        assert_eq!(interp.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn audit_group_maps_to_signature_chain() {
        let interp =
            rule_based_interpretation("The entity monitors system components", "SOC 2", None);
        assert_eq!(interp.claim_type, ClaimType::AuditTrail);
        assert_eq!(interp.proof_template, ProofTemplate::SignatureChain);
    }

    #[test]
    fn unmatched_statement_uses_default() {
        let interp = rule_based_interpretation(
            "The organization maintains a documented policy",
            "ISO 27001",
            None,
        );
        assert_eq!(interp.claim_type, ClaimType::ControlEffectiveness);
        assert_eq!(interp.proof_template, ProofTemplate::MerkleCommitment);
        assert_eq!(interp.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn interpretation_is_deterministic() {
        let a = rule_based_interpretation("MFA is required for all users", "NIST 800-53", Some("IA-2"));
        let b = rule_based_interpretation("MFA is required for all users", "NIST 800-53", Some("IA-2"));
        assert_eq!(a, b);
    }

    #[test]
    fn case_insensitive_matching() {
        let upper = rule_based_interpretation("BACKUP PROCEDURES EXIST", "SOC 2", None);
        let lower = rule_based_interpretation("backup procedures exist", "SOC 2", None);
        assert_eq!(upper.claim_type, lower.claim_type);
        assert_eq!(upper.claim_type, ClaimType::EvidenceIntegrity);
    }

    #[test]
    fn framework_extends_evidence_kinds() {
        let hipaa = required_evidence_kinds(ClaimType::AuditTrail, "HIPAA");
        assert!(hipaa.contains(&"phi_access_reports".to_string()));
        let pci = required_evidence_kinds(ClaimType::AuditTrail, "PCI-DSS");
        assert!(pci.contains(&"cardholder_data_logs".to_string()));
        let nist = required_evidence_kinds(ClaimType::AuditTrail, "NIST 800-53");
        assert!(!nist.contains(&"phi_access_reports".to_string()));
    }

    #[test]
    fn ai_output_validation_accepts_well_formed() {
        let value = json!({
            "claim_type": "audit_trail",
            "proof_template": "signature_chain",
            "risk_level": "high",
            "evidence_requirements": ["audit_logs"],
            "reasoning": "model says so",
            "confidence": 0.91
        });
        let interp = validate_ai_output(&value, "SOC 2").unwrap();
        assert_eq!(interp.claim_type, ClaimType::AuditTrail);
        assert_eq!(interp.source, InterpretationSource::Ai);
        assert!((interp.confidence - 0.91).abs() < 1e-9);
    }

    #[test]
    fn ai_output_missing_confidence_defaults() {
        let value = json!({
            "claim_type": "evidence_integrity",
            "proof_template": "merkle_commitment",
            "risk_level": "medium",
            "evidence_requirements": [],
            "reasoning": "r"
        });
        let interp = validate_ai_output(&value, "SOC 2").unwrap();
        assert!((interp.confidence - 0.95).abs() < 1e-9);
    }

    #[test]
    fn ai_output_out_of_vocabulary_rejected() {
        let value = json!({
            "claim_type": "something_else",
            "proof_template": "merkle_commitment",
            "risk_level": "medium",
            "reasoning": "r"
        });
        assert!(validate_ai_output(&value, "SOC 2").is_none());
    }

    struct SlowAdapter;

    #[async_trait]
    impl AiAdapter for SlowAdapter {
        async fn interpret(
            &self,
            _statement: &str,
            _framework: &str,
            _control_id: Option<&str>,
        ) -> Result<Value, EngineError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(json!({}))
        }
    }

    struct BrokenAdapter;

    #[async_trait]
    impl AiAdapter for BrokenAdapter {
        async fn interpret(
            &self,
            _statement: &str,
            _framework: &str,
            _control_id: Option<&str>,
        ) -> Result<Value, EngineError> {
            Ok(json!({"claim_type": "not-a-claim"}))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_adapter_falls_back_to_rules() {
        let interpreter = ControlInterpreter::with_ai(Arc::new(SlowAdapter));
        let interp = interpreter
            .interpret("account management", "NIST 800-53", Some("AC-2"))
            .await;
        assert_eq!(interp.source, InterpretationSource::RuleBased);
    }

    #[tokio::test]
    async fn malformed_adapter_output_falls_back_to_rules() {
        let interpreter = ControlInterpreter::with_ai(Arc::new(BrokenAdapter));
        let interp = interpreter
            .interpret("audit events are tracked", "SOC 2", None)
            .await;
        assert_eq!(interp.source, InterpretationSource::RuleBased);
        assert_eq!(interp.claim_type, ClaimType::AuditTrail);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_rule_based_is_a_function_of_its_inputs(
            statement in "[a-zA-Z ]{0,80}",
            framework in prop_oneof![
                Just("NIST 800-53"),
                Just("SOC 2"),
                Just("HIPAA"),
                Just("PCI-DSS")
            ],
        ) {
            let a = rule_based_interpretation(&statement, framework, Some("C-1"));
            let b = rule_based_interpretation(&statement, framework, Some("C-1"));
            prop_assert_eq!(a, b);
        }
    }
}
