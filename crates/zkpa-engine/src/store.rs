//! # State Store — Concurrent In-Process State
//!
//! `DashMap`-backed containers for attestations, verification receipts,
//! and idempotency entries, behind the object-safe [`StateStore`] trait
//! so a persistent implementation can be swapped in without touching the
//! pipeline.
//!
//! ## Concurrency discipline
//!
//! All mutation goes through [`StateStore::update_attestation`], which
//! runs the caller's closure against a clone under the shard write lock
//! and only writes back on success. Readers never observe a partially
//! written attestation, concurrent updates serialize per identifier, and
//! a failed update leaves the stored value untouched. Every successful
//! write bumps the monotonically increasing `revision`.

use dashmap::DashMap;

use zkpa_core::{AttestationId, ReceiptId, Timestamp};

use crate::attestation::Attestation;
use crate::error::EngineError;
use crate::status::AttestationStatus;
use crate::verify::VerificationReceipt;

/// Idempotency entries expire 24 hours after creation.
pub const IDEMPOTENCY_TTL_SECS: i64 = 24 * 60 * 60;

/// Storage statistics for the demo surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, utoipa::ToSchema)]
pub struct StoreStats {
    /// Stored attestations.
    pub attestations: usize,
    /// Stored verification receipts.
    pub receipts: usize,
    /// Live idempotency entries.
    pub idempotency_keys: usize,
}

/// Abstract state store. Implementations must be safe for concurrent
/// readers with writes serialized per identifier.
pub trait StateStore: Send + Sync {
    /// Insert a new attestation; fails with `Conflict` if the identifier
    /// is already present.
    fn put_attestation_if_absent(&self, attestation: Attestation) -> Result<(), EngineError>;

    /// Read an attestation by identifier.
    fn get_attestation(&self, id: &AttestationId) -> Option<Attestation>;

    /// Apply a mutation under the per-identifier write lock.
    ///
    /// The closure runs against a clone; the store only commits (and
    /// bumps the revision) when the closure returns `Ok`. Returns the
    /// committed record.
    fn update_attestation(
        &self,
        id: &AttestationId,
        f: &mut dyn FnMut(&mut Attestation) -> Result<(), EngineError>,
    ) -> Result<Attestation, EngineError>;

    /// Remove an attestation. Used only as compensation when an
    /// idempotency race is lost after insertion, and by the demo reset.
    fn remove_attestation(&self, id: &AttestationId);

    /// List attestations ordered by identifier (= creation order), with
    /// optional status filter and pagination.
    fn list_attestations(
        &self,
        status: Option<AttestationStatus>,
        limit: usize,
        offset: usize,
    ) -> Vec<Attestation>;

    /// Identifiers of attestations currently in the given state.
    fn ids_in_status(&self, status: AttestationStatus) -> Vec<AttestationId>;

    /// Store a verification receipt. Receipts are immutable; an existing
    /// identifier is never overwritten.
    fn put_receipt(&self, receipt: VerificationReceipt);

    /// Read a receipt by identifier.
    fn get_receipt(&self, id: &ReceiptId) -> Option<VerificationReceipt>;

    /// Register `key → id` unless a live entry exists. Returns the
    /// existing (winning) attestation identifier when the caller lost the
    /// race; `None` means the caller's entry is now registered. An
    /// expired entry is replaced as if absent.
    fn put_idempotency_if_absent(
        &self,
        key: &str,
        id: &AttestationId,
        now: Timestamp,
    ) -> Option<AttestationId>;

    /// Look up a live idempotency entry.
    fn get_idempotency(&self, key: &str, now: Timestamp) -> Option<AttestationId>;

    /// Drop expired idempotency entries; returns how many were removed.
    fn expire_idempotency(&self, now: Timestamp) -> usize;

    /// Clear everything. Demo mode only.
    fn reset_all(&self);

    /// Container sizes.
    fn stats(&self) -> StoreStats;
}

#[derive(Debug, Clone)]
struct IdempotencyEntry {
    attestation_id: AttestationId,
    created_at: Timestamp,
}

impl IdempotencyEntry {
    fn expired(&self, now: Timestamp) -> bool {
        self.created_at.plus_seconds(IDEMPOTENCY_TTL_SECS) <= now
    }
}

/// In-memory `StateStore` implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    attestations: DashMap<AttestationId, Attestation>,
    receipts: DashMap<ReceiptId, VerificationReceipt>,
    idempotency: DashMap<String, IdempotencyEntry>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn put_attestation_if_absent(&self, attestation: Attestation) -> Result<(), EngineError> {
        match self.attestations.entry(attestation.id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(EngineError::Conflict(format!(
                "attestation {} already exists",
                attestation.id
            ))),
            dashmap::mapref::entry::Entry::Vacant(v) => {
                v.insert(attestation);
                Ok(())
            }
        }
    }

    fn get_attestation(&self, id: &AttestationId) -> Option<Attestation> {
        self.attestations.get(id).map(|e| e.value().clone())
    }

    fn update_attestation(
        &self,
        id: &AttestationId,
        f: &mut dyn FnMut(&mut Attestation) -> Result<(), EngineError>,
    ) -> Result<Attestation, EngineError> {
        let mut entry = self
            .attestations
            .get_mut(id)
            .ok_or_else(|| EngineError::NotFound(format!("attestation {id}")))?;
        // Mutate a clone so a failing closure cannot leave a torn record.
        let mut candidate = entry.value().clone();
        f(&mut candidate)?;
        candidate.revision = entry.value().revision + 1;
        *entry.value_mut() = candidate.clone();
        Ok(candidate)
    }

    fn remove_attestation(&self, id: &AttestationId) {
        self.attestations.remove(id);
    }

    fn list_attestations(
        &self,
        status: Option<AttestationStatus>,
        limit: usize,
        offset: usize,
    ) -> Vec<Attestation> {
        let mut items: Vec<Attestation> = self
            .attestations
            .iter()
            .filter(|e| status.map_or(true, |s| e.value().status == s))
            .map(|e| e.value().clone())
            .collect();
        // Identifier order is creation order by construction.
        items.sort_by(|a, b| a.id.cmp(&b.id));
        items.into_iter().skip(offset).take(limit).collect()
    }

    fn ids_in_status(&self, status: AttestationStatus) -> Vec<AttestationId> {
        self.attestations
            .iter()
            .filter(|e| e.value().status == status)
            .map(|e| e.key().clone())
            .collect()
    }

    fn put_receipt(&self, receipt: VerificationReceipt) {
        // Receipt identifiers come from a CSPRNG; an existing entry is
        // left untouched to honor receipt immutability.
        self.receipts.entry(receipt.receipt_id.clone()).or_insert(receipt);
    }

    fn get_receipt(&self, id: &ReceiptId) -> Option<VerificationReceipt> {
        self.receipts.get(id).map(|e| e.value().clone())
    }

    fn put_idempotency_if_absent(
        &self,
        key: &str,
        id: &AttestationId,
        now: Timestamp,
    ) -> Option<AttestationId> {
        match self.idempotency.entry(key.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                if occupied.get().expired(now) {
                    occupied.insert(IdempotencyEntry {
                        attestation_id: id.clone(),
                        created_at: now,
                    });
                    None
                } else {
                    Some(occupied.get().attestation_id.clone())
                }
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(IdempotencyEntry {
                    attestation_id: id.clone(),
                    created_at: now,
                });
                None
            }
        }
    }

    fn get_idempotency(&self, key: &str, now: Timestamp) -> Option<AttestationId> {
        self.idempotency
            .get(key)
            .filter(|e| !e.value().expired(now))
            .map(|e| e.value().attestation_id.clone())
    }

    fn expire_idempotency(&self, now: Timestamp) -> usize {
        let before = self.idempotency.len();
        self.idempotency.retain(|_, entry| !entry.expired(now));
        before - self.idempotency.len()
    }

    fn reset_all(&self) {
        self.attestations.clear();
        self.receipts.clear();
        self.idempotency.clear();
        tracing::warn!("state store cleared");
    }

    fn stats(&self) -> StoreStats {
        StoreStats {
            attestations: self.attestations.len(),
            receipts: self.receipts.len(),
            idempotency_keys: self.idempotency.len(),
        }
    }
}
