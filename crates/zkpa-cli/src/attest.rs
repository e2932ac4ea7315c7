//! # `zkpa attest` — One-Shot Local Attestation
//!
//! Runs the attestation pipeline stages locally without a server:
//! interpret the control, commit the evidence, build the proof artifact,
//! assemble and sign the package, and optionally anchor against the
//! in-process mock ledger. The signed package lands on stdout or in
//! `--out`.

use std::path::PathBuf;

use clap::Args;
use serde_json::json;

use zkpa_core::Timestamp;
use zkpa_crypto::SigningKey;
use zkpa_engine::anchor::{self, MockLedger};
use zkpa_engine::attestation::AttestationMetadata;
use zkpa_engine::evidence::{EvidenceCommitter, EvidenceInput};
use zkpa_engine::interpreter::rule_based_interpretation;
use zkpa_engine::package;
use zkpa_engine::proof::{CommitmentV1, ProofBackend, ProofContext};

use crate::{read_json_file, CliError};

/// Arguments for `zkpa attest`.
#[derive(Args, Debug)]
pub struct AttestArgs {
    /// Path to a JSON file holding the evidence list:
    /// `[{"uri": ..., "hash": ..., "type": ...}, ...]`.
    #[arg(long)]
    pub evidence: PathBuf,

    /// The control statement text.
    #[arg(long)]
    pub statement: String,

    /// The framework tag.
    #[arg(long)]
    pub framework: String,

    /// The control identifier.
    #[arg(long)]
    pub control_id: String,

    /// The governing policy string.
    #[arg(long)]
    pub policy: String,

    /// Hex seed for the signing key; ephemeral when omitted.
    #[arg(long)]
    pub seed_hex: Option<String>,

    /// Anchor the package digest against the in-process mock ledger.
    #[arg(long)]
    pub anchor: bool,

    /// Write the signed package here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Run a one-shot attestation.
pub fn run_attest(args: AttestArgs) -> Result<(), CliError> {
    let evidence_value = read_json_file(&args.evidence)?;
    let items: Vec<EvidenceInput> = serde_json::from_value(evidence_value)
        .map_err(|e| CliError::Usage(format!("evidence file has the wrong shape: {e}")))?;

    let now = Timestamp::now();
    let interpretation =
        rule_based_interpretation(&args.statement, &args.framework, Some(&args.control_id));
    let committer = EvidenceCommitter::new();
    let evidence = committer.commit(&items, now)?;

    let backend = CommitmentV1;
    let proof = backend.generate(&ProofContext {
        merkle_root: &evidence.merkle_root,
        statement: &args.statement,
        policy: &args.policy,
        template: interpretation.proof_template,
        risk: interpretation.risk_level,
    })?;

    let signer = match &args.seed_hex {
        Some(seed_hex) => SigningKey::from_seed_hex(seed_hex)?,
        None => SigningKey::generate(),
    };
    let metadata = AttestationMetadata {
        policy: args.policy.clone(),
        issued_at: now,
        valid_until: now.plus_seconds(90 * 24 * 3600),
        issuer: "zkpa-cli".to_string(),
        callback_url: None,
    };
    let attestation_id =
        zkpa_core::AttestationId::generate(now);
    let pkg = package::assemble(
        attestation_id.as_str(),
        &evidence,
        &proof,
        &metadata,
        &signer,
    )?;

    let anchor_record = if args.anchor {
        let note = anchor::anchor_note(
            attestation_id.as_str(),
            &evidence.merkle_root,
            &pkg.package_hash,
            now,
        )?;
        let ledger = MockLedger::new("mockchain", "local");
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| CliError::Internal(e.to_string()))?;
        let record = runtime
            .block_on(anchor::dispatch(&ledger, &note))
            .map_err(|e| CliError::Ledger(e.to_string()))?;
        Some(record)
    } else {
        None
    };

    let output = json!({
        "attestation_id": attestation_id.as_str(),
        "interpretation": interpretation,
        "evidence": evidence,
        "proof": proof,
        "package": pkg,
        "anchor": anchor_record,
    });
    let rendered =
        serde_json::to_string_pretty(&output).map_err(|e| CliError::Internal(e.to_string()))?;

    match &args.out {
        Some(path) => std::fs::write(path, rendered)
            .map_err(|e| CliError::Internal(format!("cannot write {}: {e}", path.display())))?,
        None => println!("{rendered}"),
    }
    Ok(())
}
