//! # Crypto Error Types

use thiserror::Error;

/// Error in cryptographic operations.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Signature verification failed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// Key generation or parsing failed.
    #[error("key error: {0}")]
    KeyError(String),

    /// Digest computation or decoding failed.
    #[error("digest error: {0}")]
    DigestError(String),

    /// Merkle tree construction or proof failure.
    #[error("merkle error: {0}")]
    MerkleError(String),
}
