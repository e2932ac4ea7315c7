//! # `zkpa keygen` — Ed25519 Key Generation
//!
//! Generates a signing key (random, from a word phrase, or from a raw
//! seed) and prints the key material as JSON. The seed is printed —
//! this command exists to provision development deployments, and the
//! operator is expected to move the seed into configuration.

use clap::Args;
use serde_json::json;

use zkpa_crypto::SigningKey;

use crate::CliError;

/// Arguments for `zkpa keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Derive the key from a word phrase instead of the OS CSPRNG.
    #[arg(long, conflicts_with = "seed_hex")]
    pub phrase: Option<String>,

    /// Load the key from a 64-char hex seed (prints the public key).
    #[arg(long)]
    pub seed_hex: Option<String>,
}

/// Run key generation.
pub fn run_keygen(args: KeygenArgs) -> Result<(), CliError> {
    let (key, seed_source) = match (&args.phrase, &args.seed_hex) {
        (Some(phrase), _) => (SigningKey::from_passphrase(phrase), "phrase"),
        (None, Some(seed_hex)) => (SigningKey::from_seed_hex(seed_hex)?, "seed"),
        (None, None) => (SigningKey::generate(), "random"),
    };

    let output = json!({
        "public_key": key.verifying_key().to_hex(),
        "source": seed_source,
    });
    println!("{}", serde_json::to_string_pretty(&output).expect("json"));
    Ok(())
}
