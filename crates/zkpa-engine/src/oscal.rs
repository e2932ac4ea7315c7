//! # OSCAL Export
//!
//! Maps a finished attestation onto an OSCAL assessment-results document
//! for the download surface. The mapping is intentionally shallow: the
//! attestation is the authoritative artifact; the OSCAL rendering exists
//! so compliance tooling can ingest the outcome without understanding
//! the package schema.

use serde_json::{json, Value};

use crate::attestation::{AssessmentResult, Attestation};

/// OSCAL schema version stamped on exported documents.
const OSCAL_VERSION: &str = "1.1.2";

/// Render an attestation as an OSCAL assessment-results document.
pub fn export_assessment_results(att: &Attestation) -> Value {
    let finding_state = match att.control.assessment_result {
        AssessmentResult::Pass => "satisfied",
        AssessmentResult::Fail | AssessmentResult::Partial => "not-satisfied",
    };

    json!({
        "assessment-results": {
            "uuid": att.id.as_str(),
            "metadata": {
                "title": format!(
                    "Attestation of {} {}",
                    att.control.framework, att.control.control_id
                ),
                "last-modified": att
                    .completed_at
                    .unwrap_or(att.created_at)
                    .to_iso8601(),
                "version": "1.0",
                "oscal-version": OSCAL_VERSION,
            },
            "results": [{
                "uuid": format!("{}-result", att.id.as_str()),
                "title": att.control.control_id,
                "description": att.control.statement,
                "start": att.created_at.to_iso8601(),
                "end": att
                    .completed_at
                    .map(|t| t.to_iso8601())
                    .unwrap_or_else(|| att.created_at.to_iso8601()),
                "findings": [{
                    "title": format!("{} assessment", att.control.control_id),
                    "description": format!(
                        "Cryptographic attestation over {} evidence item(s); merkle root {}",
                        att.evidence.leaf_count, att.evidence.merkle_root
                    ),
                    "target": {
                        "type": "objective-id",
                        "target-id": att.control.control_id,
                        "status": { "state": finding_state },
                    },
                }],
            }],
            "back-matter": {
                "resources": [{
                    "uuid": format!("{}-package", att.id.as_str()),
                    "title": "ZKPA signed package digest",
                    "description": att
                        .package
                        .as_ref()
                        .map(|p| p.package_hash.clone())
                        .unwrap_or_else(|| "unassembled".to_string()),
                }],
            },
        }
    })
}
