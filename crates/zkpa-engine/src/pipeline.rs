//! # Pipeline Façade
//!
//! The single entrypoint coordinating interpretation, evidence
//! commitment, proof generation, package assembly, anchoring, and
//! verification, with idempotency enforcement and at-most-once-per-key
//! processing.
//!
//! The synchronous phase of `create` blocks only on CPU (hashing, JSON
//! canonicalization): interpretation and the evidence commitment run
//! before the call returns, so the response already reflects
//! `computing_commitment`. The remainder runs on the bounded worker pool,
//! pausing at each step boundary to update state — those boundaries are
//! also the cancellation points.

use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use zkpa_core::{AttestationId, ReceiptId, Timestamp};
use zkpa_crypto::SigningKey;

use crate::anchor::{self, AnchorRecord, LedgerAdapter};
use crate::attestation::{
    Attestation, AttestationMetadata, ControlDescriptor, RevocationRecord,
};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::evidence::{EvidenceCommitter, EvidenceInput};
use crate::interpreter::{AiAdapter, ControlInterpreter};
use crate::lifecycle::{spawn_sweepers, TransitionHub, WorkerPool};
use crate::oscal;
use crate::package;
use crate::proof::{CommitmentV1, ProofBackend, ProofContext};
use crate::samples;
use crate::status::AttestationStatus;
use crate::store::{StateStore, StoreStats};
use crate::verify::{CheckName, VerificationEngine, VerificationReceipt};
use crate::webhook::WebhookDispatcher;

/// Identifier collision retry budget.
const ID_RETRIES: u32 = 3;
/// Inter-step delay in fast-demo mode.
const DEMO_STEP_DELAY: Duration = Duration::from_millis(50);

/// A request to create an attestation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateAttestationRequest {
    /// Evidence references to commit.
    pub evidence: Vec<EvidenceInput>,
    /// The governing policy string.
    pub policy: String,
    /// The assessed control.
    pub control: ControlDescriptor,
    /// Optional webhook target for status changes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

/// The create response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateResponse {
    /// The attestation identifier.
    #[schema(value_type = String)]
    pub claim_id: AttestationId,
    /// State at response time.
    pub status: AttestationStatus,
    /// Creation instant.
    pub created_at: Timestamp,
}

/// The attestation pipeline façade.
pub struct AttestationPipeline {
    config: EngineConfig,
    store: Arc<dyn StateStore>,
    hub: Arc<TransitionHub>,
    interpreter: ControlInterpreter,
    committer: EvidenceCommitter,
    backend: Arc<dyn ProofBackend>,
    signer: Arc<SigningKey>,
    ledger: Option<Arc<dyn LedgerAdapter>>,
    verifier: VerificationEngine,
    pool: OnceLock<WorkerPool>,
}

impl AttestationPipeline {
    /// Construct and start the pipeline: spawns the worker pool, the
    /// webhook pool, and the sweeper task. Requires a Tokio runtime.
    pub fn start(
        config: EngineConfig,
        store: Arc<dyn StateStore>,
        signer: Arc<SigningKey>,
        ai: Option<Arc<dyn AiAdapter>>,
        ledger: Option<Arc<dyn LedgerAdapter>>,
    ) -> Arc<Self> {
        let webhooks = WebhookDispatcher::spawn(config.webhook_worker_count);
        let hub = Arc::new(TransitionHub::new(store.clone(), webhooks));
        let backend: Arc<dyn ProofBackend> = Arc::new(CommitmentV1);
        let interpreter = match ai {
            Some(adapter) => ControlInterpreter::with_ai(adapter),
            None => ControlInterpreter::rule_based(),
        };
        let verifier = VerificationEngine::new(
            store.clone(),
            signer.clone(),
            backend.clone(),
            ledger.clone(),
        );

        let pipeline = Arc::new(Self {
            config,
            store,
            hub: hub.clone(),
            interpreter,
            committer: EvidenceCommitter::new(),
            backend,
            signer,
            ledger,
            verifier,
            pool: OnceLock::new(),
        });

        let for_workers = pipeline.clone();
        let pool = WorkerPool::spawn(pipeline.config.worker_count, move |id| {
            let pipeline = for_workers.clone();
            async move { pipeline.process(id).await }
        });
        let _ = pipeline.pool.set(pool);

        spawn_sweepers(hub);
        pipeline
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The issuer's verifying key (hex) for external verifiers.
    pub fn issuer_public_key(&self) -> String {
        self.signer.verifying_key().to_hex()
    }

    /// Create an attestation.
    ///
    /// Runs interpretation and the evidence commitment synchronously,
    /// persists the record in `computing_commitment`, and enqueues the
    /// background continuation. Validation failures surface before
    /// anything is stored.
    pub async fn create(
        &self,
        request: CreateAttestationRequest,
        idempotency_key: Option<String>,
        principal: Option<String>,
    ) -> Result<CreateResponse, EngineError> {
        let now = Timestamp::now();

        if let Some(key) = &idempotency_key {
            if let Some(existing) = self.store.get_idempotency(key, now) {
                return self.replay_response(&existing);
            }
        }

        validate_request(&request)?;

        let interpretation = self
            .interpreter
            .interpret(
                &request.control.statement,
                &request.control.framework,
                Some(&request.control.control_id),
            )
            .await;
        let evidence = self.committer.commit(&request.evidence, now)?;

        let metadata = AttestationMetadata {
            policy: request.policy.clone(),
            issued_at: now,
            valid_until: now.plus_seconds(self.config.validity_period_secs),
            issuer: principal.unwrap_or_else(|| self.config.issuer.clone()),
            callback_url: request.callback_url.clone(),
        };

        let mut attestation = Attestation {
            id: AttestationId::generate(now),
            status: AttestationStatus::Pending,
            created_at: now,
            completed_at: None,
            control: request.control,
            interpretation,
            evidence,
            proof: None,
            package: None,
            anchor: None,
            metadata,
            error_reason: None,
            revocation: None,
            events: Vec::new(),
            revision: 0,
        };
        attestation.record_transition(AttestationStatus::ComputingCommitment, None)?;

        let mut inserted = false;
        for attempt in 0..ID_RETRIES {
            match self.store.put_attestation_if_absent(attestation.clone()) {
                Ok(()) => {
                    inserted = true;
                    break;
                }
                Err(EngineError::Conflict(_)) if attempt + 1 < ID_RETRIES => {
                    attestation.id = AttestationId::generate(now);
                }
                Err(err) => return Err(err),
            }
        }
        if !inserted {
            return Err(EngineError::Conflict(
                "identifier collision retries exhausted".to_string(),
            ));
        }
        let id = attestation.id.clone();

        if let Some(key) = &idempotency_key {
            if let Some(winner) = self.store.put_idempotency_if_absent(key, &id, now) {
                if winner != id {
                    // Lost the race: exactly one attestation may be
                    // attributable to the key, so the orphan is removed
                    // and the winner's record is returned.
                    self.store.remove_attestation(&id);
                    return self.replay_response(&winner);
                }
            }
        }

        self.pool()?.submit(id.clone()).await?;

        Ok(CreateResponse {
            claim_id: id,
            status: AttestationStatus::ComputingCommitment,
            created_at: now,
        })
    }

    /// Read an attestation.
    pub fn get(&self, id: &AttestationId) -> Result<Attestation, EngineError> {
        self.store
            .get_attestation(id)
            .ok_or_else(|| EngineError::NotFound(format!("attestation {id}")))
    }

    /// List attestations (identifier order = creation order).
    pub fn list(
        &self,
        status: Option<AttestationStatus>,
        limit: usize,
        offset: usize,
    ) -> Vec<Attestation> {
        self.store.list_attestations(status, limit, offset)
    }

    /// Run verification checks and mint a signed receipt.
    pub async fn verify(
        &self,
        id: &AttestationId,
        checks: &[CheckName],
    ) -> Result<VerificationReceipt, EngineError> {
        self.verifier.verify(id, checks).await
    }

    /// Read a stored receipt.
    pub fn get_receipt(&self, id: &ReceiptId) -> Result<VerificationReceipt, EngineError> {
        self.verifier
            .get_receipt(id)
            .ok_or_else(|| EngineError::NotFound(format!("receipt {id}")))
    }

    /// Revoke a `valid` attestation.
    pub fn revoke(
        &self,
        id: &AttestationId,
        reason: String,
        revoked_by: Option<String>,
    ) -> Result<Attestation, EngineError> {
        let now = Timestamp::now();
        let reason_clone = reason.clone();
        self.hub.transition_with(
            id,
            AttestationStatus::Revoked,
            Some(reason),
            &mut |att| {
                att.revocation = Some(RevocationRecord {
                    revoked_at: now,
                    reason: reason_clone.clone(),
                    revoked_by: revoked_by.clone(),
                });
                Ok(())
            },
        )
    }

    /// Request cooperative cancellation of a non-terminal attestation.
    pub fn cancel(&self, id: &AttestationId) -> Result<(), EngineError> {
        self.hub.request_cancel(id)
    }

    /// The signed package as a downloadable JSON value.
    pub fn download_json(&self, id: &AttestationId) -> Result<serde_json::Value, EngineError> {
        let att = self.get(id)?;
        let pkg = att.package.as_ref().ok_or_else(|| {
            EngineError::Conflict(format!("attestation {id} has no assembled package yet"))
        })?;
        Ok(serde_json::json!({
            "package": pkg.document,
            "package_hash": pkg.package_hash,
            "signature": pkg.signature,
        }))
    }

    /// The OSCAL assessment-results rendering.
    pub fn download_oscal(&self, id: &AttestationId) -> Result<serde_json::Value, EngineError> {
        Ok(oscal::export_assessment_results(&self.get(id)?))
    }

    /// One-call attestation from a sample control with synthesized
    /// deterministic evidence.
    pub async fn quick_attest(
        &self,
        control_id: &str,
        callback_url: Option<String>,
    ) -> Result<CreateResponse, EngineError> {
        let control = samples::control_by_id(control_id)
            .ok_or_else(|| EngineError::NotFound(format!("sample control {control_id}")))?;
        let request = CreateAttestationRequest {
            evidence: samples::synthesize_evidence(control),
            policy: format!(
                "{} - {}: {}",
                control.framework, control.control_id, control.title
            ),
            control: ControlDescriptor {
                framework: control.framework.to_string(),
                control_id: control.control_id.to_string(),
                statement: control.statement.to_string(),
                assessment_result: crate::attestation::AssessmentResult::Pass,
                assessment_window: "sample".to_string(),
            },
            callback_url,
        };
        self.create(request, None, None).await
    }

    /// Interpret a control statement without creating state.
    pub async fn interpret(
        &self,
        statement: &str,
        framework: &str,
        control_id: Option<&str>,
    ) -> crate::attestation::Interpretation {
        self.interpreter
            .interpret(statement, framework, control_id)
            .await
    }

    /// Run one expiry sweep immediately (tests and operator tooling; the
    /// background sweeper runs this once per minute).
    pub fn run_expiry_sweep(&self, now: Timestamp) -> usize {
        self.hub.sweep_expired(now)
    }

    /// Store statistics.
    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// Clear all state. Demo deployments only; the API layer gates this
    /// on the demo-mode flag.
    pub fn reset(&self) {
        self.store.reset_all();
    }

    fn pool(&self) -> Result<&WorkerPool, EngineError> {
        self.pool
            .get()
            .ok_or_else(|| EngineError::Internal("worker pool not started".to_string()))
    }

    fn replay_response(&self, id: &AttestationId) -> Result<CreateResponse, EngineError> {
        let att = self.store.get_attestation(id).ok_or_else(|| {
            EngineError::Internal(format!(
                "idempotency entry references missing attestation {id}"
            ))
        })?;
        Ok(CreateResponse {
            claim_id: att.id,
            status: att.status,
            created_at: att.created_at,
        })
    }

    async fn step_delay(&self) {
        if self.config.fast_demo {
            tokio::time::sleep(DEMO_STEP_DELAY).await;
        }
    }

    /// Worker entrypoint: drive one attestation end-to-end.
    async fn process(self: Arc<Self>, id: AttestationId) {
        match self.run_background(&id).await {
            Ok(()) => {}
            Err(EngineError::Cancelled) => {
                tracing::info!(attestation = %id, "processing cancelled");
            }
            Err(err) => {
                tracing::warn!(attestation = %id, error = %err, "processing ended in failure");
            }
        }
        self.hub.clear_cancel(&id);
    }

    async fn run_background(&self, id: &AttestationId) -> Result<(), EngineError> {
        let att = self.get(id)?;
        if att.status != AttestationStatus::ComputingCommitment {
            tracing::debug!(attestation = %id, status = %att.status, "skipping: not in entry state");
            return Ok(());
        }

        self.hub.checkpoint(id)?;
        self.hub
            .transition(id, AttestationStatus::GeneratingProof, None)?;
        self.step_delay().await;

        // Proof generation (CPU-bound, no suspension inside).
        let att = self.get(id)?;
        let ctx = ProofContext {
            merkle_root: &att.evidence.merkle_root,
            statement: &att.control.statement,
            policy: &att.metadata.policy,
            template: att.interpretation.proof_template,
            risk: att.interpretation.risk_level,
        };
        let proof = match self.backend.generate(&ctx) {
            Ok(proof) => proof,
            Err(err) => {
                let reason = err.to_string();
                self.hub.transition_with(
                    id,
                    AttestationStatus::FailedProof,
                    Some(reason.clone()),
                    &mut |a| {
                        a.error_reason = Some(reason.clone());
                        Ok(())
                    },
                )?;
                return Err(err);
            }
        };
        self.hub.transition_with(
            id,
            AttestationStatus::AssemblingPackage,
            None,
            &mut |a| {
                a.proof = Some(proof.clone());
                Ok(())
            },
        )?;
        self.hub.checkpoint(id)?;
        self.step_delay().await;

        // Package assembly and signing.
        let att = self.get(id)?;
        let proof_record = att
            .proof
            .as_ref()
            .ok_or_else(|| EngineError::Internal("proof record vanished".to_string()))?;
        let pkg = match package::assemble(
            att.id.as_str(),
            &att.evidence,
            proof_record,
            &att.metadata,
            &self.signer,
        ) {
            Ok(pkg) => pkg,
            Err(err) => {
                let reason = err.to_string();
                self.hub.transition_with(
                    id,
                    AttestationStatus::Failed,
                    Some(reason.clone()),
                    &mut |a| {
                        a.error_reason = Some(reason.clone());
                        Ok(())
                    },
                )?;
                return Err(err);
            }
        };

        let Some(ledger) = self.ledger.clone() else {
            // No adapter configured: assembling_package → valid directly.
            self.hub.transition_with(id, AttestationStatus::Valid, None, &mut |a| {
                a.package = Some(pkg.clone());
                Ok(())
            })?;
            return Ok(());
        };

        self.hub.transition_with(
            id,
            AttestationStatus::Anchoring,
            None,
            &mut |a| {
                a.package = Some(pkg.clone());
                Ok(())
            },
        )?;
        self.hub.checkpoint(id)?;
        self.step_delay().await;

        let note = anchor::anchor_note(
            att.id.as_str(),
            &att.evidence.merkle_root,
            &pkg.package_hash,
            Timestamp::now(),
        )?;
        match anchor::dispatch(ledger.as_ref(), &note).await {
            Ok(record) => {
                // A mid-flight cancel lets the submission complete and its
                // outcome be recorded; the state then becomes failed
                // rather than valid.
                self.store.update_attestation(id, &mut |a| {
                    a.anchor = Some(record.clone());
                    Ok(())
                })?;
                self.hub.checkpoint(id)?;
                self.hub.transition(id, AttestationStatus::Valid, None)?;
                Ok(())
            }
            Err(err) => {
                let reason = err.to_string();
                let failed_record =
                    AnchorRecord::failed(ledger.chain(), ledger.network(), reason.clone());
                self.hub.transition_with(
                    id,
                    AttestationStatus::FailedAnchor,
                    Some(reason.clone()),
                    &mut |a| {
                        a.anchor = Some(failed_record.clone());
                        a.error_reason = Some(reason.clone());
                        Ok(())
                    },
                )?;
                Err(EngineError::Internal(reason))
            }
        }
    }
}

fn validate_request(request: &CreateAttestationRequest) -> Result<(), EngineError> {
    if request.control.framework.trim().is_empty() {
        return Err(EngineError::InvalidRequest(
            "control.framework must not be empty".to_string(),
        ));
    }
    if request.control.control_id.trim().is_empty() {
        return Err(EngineError::InvalidRequest(
            "control.control_id must not be empty".to_string(),
        ));
    }
    if request.control.statement.trim().is_empty() {
        return Err(EngineError::InvalidRequest(
            "control.statement must not be empty".to_string(),
        ));
    }
    if request.policy.trim().is_empty() {
        return Err(EngineError::InvalidRequest(
            "policy must not be empty".to_string(),
        ));
    }
    if let Some(url) = &request.callback_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(EngineError::InvalidRequest(
                "callback_url must be an http(s) URL".to_string(),
            ));
        }
    }
    Ok(())
}
