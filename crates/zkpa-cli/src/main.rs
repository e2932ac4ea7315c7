//! # zkpa CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.
//! Uses clap derive macros; exit codes follow the documented contract
//! (0 success, 1 usage, 2 validation, 3 ledger, 4 internal).

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use zkpa_cli::attest::{run_attest, AttestArgs};
use zkpa_cli::interpret::{run_interpret, InterpretArgs};
use zkpa_cli::keygen::{run_keygen, KeygenArgs};
use zkpa_cli::verify::{run_verify, VerifyArgs};

/// ZKPA attestation toolchain.
///
/// Ed25519 key provisioning, deterministic control interpretation,
/// one-shot local attestation, and package verification.
#[derive(Parser, Debug)]
#[command(name = "zkpa", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate or derive an Ed25519 signing key.
    Keygen(KeygenArgs),

    /// Interpret a control statement with the deterministic rules.
    Interpret(InterpretArgs),

    /// Run a one-shot local attestation and emit the signed package.
    Attest(AttestArgs),

    /// Verify a package artifact (digest, signature, merkle root).
    Verify(VerifyArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Keygen(args) => run_keygen(args),
        Commands::Interpret(args) => run_interpret(args),
        Commands::Attest(args) => run_attest(args),
        Commands::Verify(args) => run_verify(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            err.exit_code()
        }
    }
}
