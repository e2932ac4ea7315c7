//! # Lifecycle Engine
//!
//! Executes guarded state transitions against the store, runs the bounded
//! attestation worker pool, hosts the cooperative-cancellation flags, and
//! owns the two singleton sweepers (expiry, idempotency TTL).
//!
//! Transitions are written through `update_attestation`, so the new state
//! and its event-log entry land atomically and concurrent writers
//! serialize per identifier. Every committed transition fans out a
//! webhook delivery when the attestation carries a `callback_url`.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use tokio::sync::mpsc;

use zkpa_core::{AttestationId, Timestamp};

use crate::attestation::Attestation;
use crate::error::EngineError;
use crate::status::AttestationStatus;
use crate::store::StateStore;
use crate::webhook::{StatusChangedEvent, WebhookDispatcher};

/// Sweep interval for the expiry and idempotency sweepers.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);
/// Work queue depth for the attestation pool.
const QUEUE_DEPTH: usize = 1024;

/// Transition executor shared by the pipeline, the workers, and the
/// sweepers.
pub struct TransitionHub {
    store: Arc<dyn StateStore>,
    webhooks: WebhookDispatcher,
    cancel_requests: DashSet<AttestationId>,
}

impl TransitionHub {
    /// Create a hub over a store and a webhook dispatcher.
    pub fn new(store: Arc<dyn StateStore>, webhooks: WebhookDispatcher) -> Self {
        Self {
            store,
            webhooks,
            cancel_requests: DashSet::new(),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// Execute a bare transition: state change + event record, atomically.
    pub fn transition(
        &self,
        id: &AttestationId,
        to: AttestationStatus,
        reason: Option<String>,
    ) -> Result<Attestation, EngineError> {
        self.transition_with(id, to, reason, &mut |_| Ok(()))
    }

    /// Execute a transition together with an additional mutation (e.g.
    /// storing the proof record alongside entering `assembling_package`).
    /// The extra mutation runs first so a failure leaves the record in
    /// its prior state.
    pub fn transition_with(
        &self,
        id: &AttestationId,
        to: AttestationStatus,
        reason: Option<String>,
        mutate: &mut dyn FnMut(&mut Attestation) -> Result<(), EngineError>,
    ) -> Result<Attestation, EngineError> {
        let reason_ref = &reason;
        let updated = self.store.update_attestation(id, &mut |att| {
            mutate(att)?;
            att.record_transition(to, reason_ref.clone())
        })?;

        tracing::info!(
            attestation = %id,
            from = %updated.events.last().map(|e| e.from.as_str()).unwrap_or("?"),
            to = %to,
            "attestation state changed"
        );

        if let Some(url) = &updated.metadata.callback_url {
            let event = StatusChangedEvent::new(
                id.as_str(),
                updated
                    .events
                    .last()
                    .map(|e| e.from)
                    .unwrap_or(updated.status),
                to,
                updated
                    .events
                    .last()
                    .map(|e| e.at)
                    .unwrap_or_else(Timestamp::now),
            );
            self.webhooks.enqueue(url, event);
        }

        Ok(updated)
    }

    /// Request cooperative cancellation. Returns an error when the
    /// attestation is unknown or already terminal.
    pub fn request_cancel(&self, id: &AttestationId) -> Result<(), EngineError> {
        let att = self
            .store
            .get_attestation(id)
            .ok_or_else(|| EngineError::NotFound(format!("attestation {id}")))?;
        if att.status.is_terminal() {
            return Err(EngineError::Conflict(format!(
                "attestation {id} is already {}",
                att.status
            )));
        }
        self.cancel_requests.insert(id.clone());
        Ok(())
    }

    /// Observe (and consume) a cancellation request at a step boundary.
    ///
    /// When set, transitions the attestation to `failed` / `cancelled`
    /// and reports `EngineError::Cancelled` so the worker stops.
    pub fn checkpoint(&self, id: &AttestationId) -> Result<(), EngineError> {
        if self.cancel_requests.remove(id).is_some() {
            self.transition_with(id, AttestationStatus::Failed, Some("cancelled".into()), &mut |att| {
                att.error_reason = Some("cancelled".to_string());
                Ok(())
            })?;
            return Err(EngineError::Cancelled);
        }
        Ok(())
    }

    /// Drop any stale cancellation flag (used when processing ends).
    pub fn clear_cancel(&self, id: &AttestationId) {
        self.cancel_requests.remove(id);
    }

    /// One expiry pass: `valid` attestations past `valid_until` become
    /// `expired`. Returns how many were transitioned.
    pub fn sweep_expired(&self, now: Timestamp) -> usize {
        let mut swept = 0;
        for id in self.store.ids_in_status(AttestationStatus::Valid) {
            let Some(att) = self.store.get_attestation(&id) else {
                continue;
            };
            if att.metadata.valid_until <= now {
                match self.transition(&id, AttestationStatus::Expired, Some("validity window elapsed".into())) {
                    Ok(_) => swept += 1,
                    Err(err) => {
                        // A concurrent revoke may have won; that is fine.
                        tracing::debug!(attestation = %id, error = %err, "expiry sweep skipped");
                    }
                }
            }
        }
        swept
    }
}

/// The bounded attestation worker pool.
///
/// `submit` enqueues an attestation identifier; one of `worker_count`
/// workers picks it up and drives the background pipeline end-to-end.
pub struct WorkerPool {
    tx: mpsc::Sender<AttestationId>,
}

impl WorkerPool {
    /// Spawn the pool. `process` is the per-attestation driver.
    pub fn spawn<F, Fut>(worker_count: usize, process: F) -> Self
    where
        F: Fn(AttestationId) -> Fut + Send + Sync + Clone + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<AttestationId>(QUEUE_DEPTH);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        for worker in 0..worker_count.max(1) {
            let rx = rx.clone();
            let process = process.clone();
            tokio::spawn(async move {
                loop {
                    let id = {
                        let mut guard = rx.lock().await;
                        guard.recv().await
                    };
                    let Some(id) = id else { break };
                    process(id).await;
                }
                tracing::debug!(worker, "attestation worker shut down");
            });
        }

        Self { tx }
    }

    /// Enqueue an attestation for background processing.
    pub async fn submit(&self, id: AttestationId) -> Result<(), EngineError> {
        self.tx
            .send(id)
            .await
            .map_err(|_| EngineError::Internal("worker pool is shut down".to_string()))
    }
}

/// Spawn the singleton expiry + idempotency sweeper task.
pub fn spawn_sweepers(hub: Arc<TransitionHub>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        // The first tick fires immediately; skip it so tests that pause
        // time see exactly one sweep per elapsed interval.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let now = Timestamp::now();
            let expired = hub.sweep_expired(now);
            let dropped = hub.store().expire_idempotency(now);
            if expired > 0 || dropped > 0 {
                tracing::info!(expired, idempotency_dropped = dropped, "sweep complete");
            }
        }
    });
}
