//! # zkpa-cli — Command-Line Tools for the Attestation Stack
//!
//! Provides the `zkpa` command-line interface:
//!
//! - `zkpa keygen` — Ed25519 key generation (random or phrase-derived).
//! - `zkpa interpret` — deterministic control interpretation.
//! - `zkpa attest` — one-shot local attestation: commit, prove, sign,
//!   optionally anchor against the in-process mock ledger.
//! - `zkpa verify` — verify a downloaded package artifact.
//!
//! ## Exit codes
//!
//! | Code | Meaning |
//! |---|---|
//! | 0 | Success |
//! | 1 | Usage error |
//! | 2 | Validation or verification failure |
//! | 3 | Ledger failure |
//! | 4 | Internal error |

pub mod attest;
pub mod interpret;
pub mod keygen;
pub mod verify;

use std::process::ExitCode;

use thiserror::Error;

/// CLI error classified by exit code.
#[derive(Error, Debug)]
pub enum CliError {
    /// Bad invocation or unreadable input file.
    #[error("usage: {0}")]
    Usage(String),

    /// Input failed validation, or a verification check failed.
    #[error("validation: {0}")]
    Validation(String),

    /// Ledger submission failed.
    #[error("ledger: {0}")]
    Ledger(String),

    /// Unclassified internal failure.
    #[error("internal: {0}")]
    Internal(String),
}

impl CliError {
    /// The process exit code for this error class.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Usage(_) => ExitCode::from(1),
            Self::Validation(_) => ExitCode::from(2),
            Self::Ledger(_) => ExitCode::from(3),
            Self::Internal(_) => ExitCode::from(4),
        }
    }
}

impl From<zkpa_engine::EngineError> for CliError {
    fn from(err: zkpa_engine::EngineError) -> Self {
        use zkpa_engine::EngineError as E;
        match err {
            E::InvalidRequest(msg) | E::InvalidEvidence(msg) => Self::Validation(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<zkpa_crypto::CryptoError> for CliError {
    fn from(err: zkpa_crypto::CryptoError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Read a JSON file into a value, classifying failures as usage errors.
pub fn read_json_file(path: &std::path::Path) -> Result<serde_json::Value, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::Usage(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| CliError::Usage(format!("{} is not valid JSON: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_contract() {
        assert_eq!(CliError::Usage("x".into()).exit_code(), ExitCode::from(1));
        assert_eq!(
            CliError::Validation("x".into()).exit_code(),
            ExitCode::from(2)
        );
        assert_eq!(CliError::Ledger("x".into()).exit_code(), ExitCode::from(3));
        assert_eq!(
            CliError::Internal("x".into()).exit_code(),
            ExitCode::from(4)
        );
    }

    #[test]
    fn engine_errors_classify() {
        let validation: CliError =
            zkpa_engine::EngineError::InvalidEvidence("empty".into()).into();
        assert!(matches!(validation, CliError::Validation(_)));

        let internal: CliError = zkpa_engine::EngineError::Internal("boom".into()).into();
        assert!(matches!(internal, CliError::Internal(_)));
    }
}
