//! # `zkpa verify` — Package Verification
//!
//! Verifies a package artifact produced by `zkpa attest` or downloaded
//! from the API: recomputes the canonical package digest, checks the
//! Ed25519 signature, and (when the artifact carries the evidence
//! record) rebuilds the Merkle root.

use std::path::PathBuf;

use clap::Args;
use serde_json::json;

use zkpa_crypto::MerkleTree;
use zkpa_engine::package;
use zkpa_engine::PackageRecord;

use crate::{read_json_file, CliError};

/// Arguments for `zkpa verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Path to the package artifact JSON.
    #[arg(long)]
    pub package: PathBuf,
}

/// Run package verification. Exits 2 when any check fails.
pub fn run_verify(args: VerifyArgs) -> Result<(), CliError> {
    let artifact = read_json_file(&args.package)?;

    // Accept both the CLI artifact shape ({"package": {...}}) and the
    // API download shape ({"package": doc, "package_hash", "signature"}).
    let record: PackageRecord = if artifact.get("package").map(|p| p.get("document").is_some())
        == Some(true)
    {
        serde_json::from_value(artifact["package"].clone())
            .map_err(|e| CliError::Usage(format!("package record has the wrong shape: {e}")))?
    } else {
        let rebuilt = json!({
            "document": artifact["package"],
            "package_hash": artifact["package_hash"],
            "signature": artifact["signature"],
        });
        serde_json::from_value(rebuilt)
            .map_err(|e| CliError::Usage(format!("package artifact has the wrong shape: {e}")))?
    };

    let mut failures = Vec::new();

    match package::verify_signature(&record) {
        Ok(true) => {}
        Ok(false) => failures.push("package digest or signature mismatch".to_string()),
        Err(err) => failures.push(format!("signature check could not run: {err}")),
    }

    // Rebuild the Merkle root when the artifact carries evidence items.
    if let Some(items) = artifact["evidence"]["items"].as_array() {
        let leaves: Option<Vec<String>> = items
            .iter()
            .map(|i| i["hash"].as_str().map(|s| s.to_string()))
            .collect();
        match leaves {
            Some(leaves) if !leaves.is_empty() => match MerkleTree::from_hex_leaves(&leaves) {
                Ok(tree) => {
                    if tree.root_hex() != record.document.evidence.merkle_root {
                        failures.push("merkle root does not match evidence items".to_string());
                    }
                }
                Err(err) => failures.push(format!("cannot rebuild merkle tree: {err}")),
            },
            _ => failures.push("evidence items are malformed".to_string()),
        }
    }

    if failures.is_empty() {
        println!(
            "{}",
            json!({
                "result": "PASS",
                "package_hash": record.package_hash,
                "signer_public_key": record.signature.signer_public_key.to_hex(),
            })
        );
        Ok(())
    } else {
        println!("{}", json!({ "result": "FAIL", "failures": failures }));
        Err(CliError::Validation(failures.join("; ")))
    }
}
