//! # Error Types — Structured Error Hierarchy
//!
//! Defines the error types used by the foundational layer. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Canonicalization errors fail loudly with full context.
//! - Identifier validation errors name the violating value and the rule.
//! - Downstream crates define their own error enums and convert from these.

use thiserror::Error;

/// Top-level error type for the foundational layer.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// An identifier failed its format validation.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A digest string failed its format validation.
    #[error("invalid digest: {0}")]
    InvalidDigest(String),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Canonical payloads carry integers and strings only.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
