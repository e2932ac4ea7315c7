//! # `zkpa interpret` — Control Interpretation
//!
//! Runs the deterministic rule-based interpretation and prints the
//! result as JSON. The CLI never calls an AI adapter; it exists so the
//! mapping can be inspected and diffed offline.

use clap::Args;

use zkpa_engine::interpreter::rule_based_interpretation;

use crate::CliError;

/// Arguments for `zkpa interpret`.
#[derive(Args, Debug)]
pub struct InterpretArgs {
    /// The control statement text.
    #[arg(long)]
    pub statement: String,

    /// The framework tag (e.g. "NIST 800-53").
    #[arg(long)]
    pub framework: String,

    /// Optional control identifier.
    #[arg(long)]
    pub control_id: Option<String>,
}

/// Run interpretation.
pub fn run_interpret(args: InterpretArgs) -> Result<(), CliError> {
    if args.statement.trim().is_empty() {
        return Err(CliError::Validation(
            "statement must not be empty".to_string(),
        ));
    }
    let interpretation = rule_based_interpretation(
        &args.statement,
        &args.framework,
        args.control_id.as_deref(),
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&interpretation)
            .map_err(|e| CliError::Internal(e.to_string()))?
    );
    Ok(())
}
