//! # Ledger Anchoring
//!
//! Submits the package digest to a public ledger through the
//! [`LedgerAdapter`] interface and records the transaction result.
//!
//! ## Design Decision: Anchoring is Optional
//!
//! The pipeline is self-contained; anchoring adds third-party
//! verifiability but is not required for an attestation to become
//! `valid`. With no adapter configured the lifecycle skips directly from
//! `assembling_package` to `valid`.
//!
//! ## Note payload
//!
//! `canonical_json({protocol, version, attestation_id, merkle_root,
//! package_hash, timestamp})` — the superset shape carrying both the
//! Merkle root and the package digest. A conforming adapter embeds these
//! bytes verbatim (e.g. the note field of a zero-amount self-transfer on
//! Algorand TestNet, or any chain with an opaque memo).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use zkpa_core::{CanonicalBytes, Timestamp};
use zkpa_crypto::sha256_hex;

use crate::error::EngineError;

/// Per-attempt ledger submission timeout.
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);
/// First retry delay; doubles per attempt.
const RETRY_BASE: Duration = Duration::from_millis(500);
/// Maximum submission attempts.
const MAX_ATTEMPTS: u32 = 5;
/// Total elapsed budget across attempts.
const TOTAL_BUDGET: Duration = Duration::from_secs(30);

/// Errors from ledger operations, split by retry eligibility.
#[derive(Error, Debug)]
pub enum AnchorError {
    /// Worth retrying: congestion, timeouts, transient transport faults.
    #[error("transient anchor failure: {0}")]
    Transient(String),

    /// Not worth retrying: malformed key, insufficient funds, permanent
    /// rejection by the ledger.
    #[error("permanent anchor failure: {0}")]
    Permanent(String),
}

/// Result of a ledger anchor operation, or its recorded failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AnchorRecord {
    /// Chain name (e.g. "algorand").
    pub chain: String,
    /// Network name (e.g. "testnet").
    pub network: String,
    /// Ledger transaction identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// Block height containing the transaction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u64>,
    /// Whether the transaction is confirmed.
    pub confirmed: bool,
    /// Explorer URL for the transaction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    /// SHA-256 of the submitted note bytes, for later on-chain comparison.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_digest: Option<String>,
    /// Recorded failure, when submission did not succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnchorRecord {
    /// An anchor record that carries only a failure.
    pub fn failed(chain: &str, network: &str, error: String) -> Self {
        Self {
            chain: chain.to_string(),
            network: network.to_string(),
            transaction_id: None,
            block_height: None,
            confirmed: false,
            explorer_url: None,
            note_digest: None,
            error: Some(error),
        }
    }
}

/// Build the canonical anchor note for an attestation.
pub fn anchor_note(
    attestation_id: &str,
    merkle_root: &str,
    package_hash: &str,
    timestamp: Timestamp,
) -> Result<CanonicalBytes, EngineError> {
    let note = serde_json::json!({
        "protocol": crate::package::PROTOCOL,
        "version": crate::package::VERSION,
        "attestation_id": attestation_id,
        "merkle_root": merkle_root,
        "package_hash": package_hash,
        "timestamp": timestamp.to_iso8601(),
    });
    CanonicalBytes::from_value(note).map_err(EngineError::from)
}

/// Abstract ledger adapter.
///
/// Implementations must only report success once the note is durably
/// recorded on the target chain; a false positive here would let the
/// pipeline claim third-party verifiability that does not exist.
#[async_trait]
pub trait LedgerAdapter: Send + Sync {
    /// Submit note bytes to the ledger.
    async fn submit(&self, note: &[u8]) -> Result<AnchorRecord, AnchorError>;

    /// Retrieve the note bytes recorded for a transaction, when the
    /// adapter supports queries.
    async fn lookup(&self, transaction_id: &str) -> Result<Option<Vec<u8>>, AnchorError>;

    /// Chain name for records produced by this adapter.
    fn chain(&self) -> &str;

    /// Network name for records produced by this adapter.
    fn network(&self) -> &str;
}

/// Retry-backed submission wrapper.
///
/// Transient failures retry with exponential backoff (base 500 ms,
/// factor 2) up to 5 attempts or 30 s elapsed, whichever ends first.
/// Permanent failures return immediately; the caller records them on the
/// anchor field without further retries.
pub async fn dispatch(
    adapter: &dyn LedgerAdapter,
    note: &CanonicalBytes,
) -> Result<AnchorRecord, AnchorError> {
    let started = tokio::time::Instant::now();
    let mut delay = RETRY_BASE;

    for attempt in 1..=MAX_ATTEMPTS {
        let result = tokio::time::timeout(SUBMIT_TIMEOUT, adapter.submit(note.as_bytes())).await;
        match result {
            Ok(Ok(mut record)) => {
                record.note_digest = Some(sha256_hex(note.as_bytes()));
                return Ok(record);
            }
            Ok(Err(AnchorError::Permanent(reason))) => {
                return Err(AnchorError::Permanent(reason));
            }
            Ok(Err(AnchorError::Transient(reason))) => {
                tracing::warn!(attempt, reason, "transient anchor failure");
            }
            Err(_) => {
                tracing::warn!(attempt, "ledger submission timed out");
            }
        }

        if attempt == MAX_ATTEMPTS || started.elapsed() + delay > TOTAL_BUDGET {
            return Err(AnchorError::Transient(format!(
                "ledger submission failed after {attempt} attempts"
            )));
        }
        tokio::time::sleep(delay).await;
        delay *= 2;
    }

    // The loop always returns; this is the compiler's exhaustiveness anchor.
    Err(AnchorError::Transient("retry budget exhausted".to_string()))
}

/// In-process mock ledger for demos and tests.
///
/// Stores submitted notes keyed by a deterministic transaction identifier
/// derived from the note digest, with an incrementing block counter.
/// Provides NO third-party verifiability; it exists so the anchoring path
/// is exercised end-to-end without a chain dependency.
#[derive(Debug)]
pub struct MockLedger {
    chain: String,
    network: String,
    next_block: AtomicU64,
    notes: DashMap<String, Vec<u8>>,
}

impl MockLedger {
    /// Create a mock ledger with the given chain and network labels.
    pub fn new(chain: impl Into<String>, network: impl Into<String>) -> Self {
        Self {
            chain: chain.into(),
            network: network.into(),
            next_block: AtomicU64::new(1),
            notes: DashMap::new(),
        }
    }

    /// Shared handle with default labels.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new("mockchain", "local"))
    }
}

#[async_trait]
impl LedgerAdapter for MockLedger {
    async fn submit(&self, note: &[u8]) -> Result<AnchorRecord, AnchorError> {
        let tx_id = format!("mock-tx-{}", &sha256_hex(note)[..16]);
        let block = self.next_block.fetch_add(1, Ordering::SeqCst);
        self.notes.insert(tx_id.clone(), note.to_vec());

        Ok(AnchorRecord {
            chain: self.chain.clone(),
            network: self.network.clone(),
            transaction_id: Some(tx_id.clone()),
            block_height: Some(block),
            confirmed: true,
            explorer_url: Some(format!(
                "https://{}-{}.explorer.invalid/tx/{tx_id}",
                self.chain, self.network
            )),
            note_digest: None,
            error: None,
        })
    }

    async fn lookup(&self, transaction_id: &str) -> Result<Option<Vec<u8>>, AnchorError> {
        Ok(self.notes.get(transaction_id).map(|e| e.value().clone()))
    }

    fn chain(&self) -> &str {
        &self.chain
    }

    fn network(&self) -> &str {
        &self.network
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn note() -> CanonicalBytes {
        anchor_note(
            "ATT-20260101000000-abcdef",
            &"aa".repeat(32),
            &"bb".repeat(32),
            Timestamp::now(),
        )
        .unwrap()
    }

    #[test]
    fn note_is_canonical_and_complete() {
        let n = note();
        let value: serde_json::Value = serde_json::from_slice(n.as_bytes()).unwrap();
        assert_eq!(value["protocol"], "zkpa");
        assert_eq!(value["version"], "1.1");
        assert!(value["merkle_root"].is_string());
        assert!(value["package_hash"].is_string());
        assert!(value["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn mock_ledger_round_trip() {
        let ledger = MockLedger::new("mockchain", "local");
        let n = note();
        let record = dispatch(&ledger, &n).await.unwrap();
        assert!(record.confirmed);
        assert_eq!(record.chain, "mockchain");
        assert_eq!(record.note_digest, Some(sha256_hex(n.as_bytes())));

        let tx = record.transaction_id.unwrap();
        let stored = ledger.lookup(&tx).await.unwrap().unwrap();
        assert_eq!(stored, n.as_bytes());
    }

    #[tokio::test]
    async fn mock_ledger_blocks_increment() {
        let ledger = MockLedger::new("mockchain", "local");
        let a = ledger.submit(b"one").await.unwrap();
        let b = ledger.submit(b"two").await.unwrap();
        assert_eq!(a.block_height, Some(1));
        assert_eq!(b.block_height, Some(2));
    }

    struct PermanentlyBroken;

    #[async_trait]
    impl LedgerAdapter for PermanentlyBroken {
        async fn submit(&self, _note: &[u8]) -> Result<AnchorRecord, AnchorError> {
            Err(AnchorError::Permanent("insufficient funds".to_string()))
        }
        async fn lookup(&self, _tx: &str) -> Result<Option<Vec<u8>>, AnchorError> {
            Ok(None)
        }
        fn chain(&self) -> &str {
            "deadchain"
        }
        fn network(&self) -> &str {
            "testnet"
        }
    }

    struct FlakyThenOk {
        failures_left: AtomicU32,
        inner: MockLedger,
    }

    #[async_trait]
    impl LedgerAdapter for FlakyThenOk {
        async fn submit(&self, note: &[u8]) -> Result<AnchorRecord, AnchorError> {
            if self.failures_left.fetch_sub(1, Ordering::SeqCst) > 0 {
                return Err(AnchorError::Transient("congestion".to_string()));
            }
            self.inner.submit(note).await
        }
        async fn lookup(&self, tx: &str) -> Result<Option<Vec<u8>>, AnchorError> {
            self.inner.lookup(tx).await
        }
        fn chain(&self) -> &str {
            self.inner.chain()
        }
        fn network(&self) -> &str {
            self.inner.network()
        }
    }

    #[tokio::test]
    async fn permanent_failure_returns_without_retry() {
        let err = dispatch(&PermanentlyBroken, &note()).await.unwrap_err();
        assert!(matches!(err, AnchorError::Permanent(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_retry_then_succeed() {
        let adapter = FlakyThenOk {
            failures_left: AtomicU32::new(2),
            inner: MockLedger::new("mockchain", "local"),
        };
        let record = dispatch(&adapter, &note()).await.unwrap();
        assert!(record.confirmed);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_exhaustion_reports_attempts() {
        let adapter = FlakyThenOk {
            failures_left: AtomicU32::new(u32::MAX),
            inner: MockLedger::new("mockchain", "local"),
        };
        let err = dispatch(&adapter, &note()).await.unwrap_err();
        match err {
            AnchorError::Transient(msg) => assert!(msg.contains("attempts"), "got: {msg}"),
            other => panic!("expected transient exhaustion, got {other}"),
        }
    }

    #[test]
    fn failed_record_shape() {
        let record = AnchorRecord::failed("algorand", "testnet", "rejected".into());
        assert!(!record.confirmed);
        assert_eq!(record.error.as_deref(), Some("rejected"));
        assert!(record.transaction_id.is_none());
    }
}
