//! # Webhook Dispatch
//!
//! Delivers `attestation.status_changed` events to the attestation's
//! `callback_url` on a pool separate from attestation processing, so slow
//! receivers never stall the pipeline.
//!
//! Delivery contract: at-least-once, per-attestation enqueue order, no
//! cross-delivery ordering after retries — receivers order by the
//! embedded `at` timestamp. Retries cover connect errors, 5xx, 408, and
//! 429 with exponential backoff and ±20 % jitter; any other 4xx and all
//! 2xx terminate the delivery. Exhausted deliveries are dropped with an
//! error log.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use zkpa_core::Timestamp;

use crate::status::AttestationStatus;

/// Per-attempt delivery timeout.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);
/// Maximum delivery attempts.
const MAX_ATTEMPTS: u32 = 5;
/// First retry delay; doubles per attempt.
const RETRY_BASE: Duration = Duration::from_secs(1);
/// Jitter applied to each retry delay.
const JITTER: f64 = 0.2;
/// Queue depth before enqueues start shedding.
const QUEUE_DEPTH: usize = 1024;

/// The status-change payload receivers get.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusChangedEvent {
    /// Always `"attestation.status_changed"`.
    pub event: String,
    /// The attestation identifier.
    pub claim_id: String,
    /// State before the transition.
    pub from: AttestationStatus,
    /// State after the transition.
    pub to: AttestationStatus,
    /// When the transition was recorded. Receivers must order by this.
    pub at: Timestamp,
}

impl StatusChangedEvent {
    /// Build the payload for a transition.
    pub fn new(claim_id: &str, from: AttestationStatus, to: AttestationStatus, at: Timestamp) -> Self {
        Self {
            event: "attestation.status_changed".to_string(),
            claim_id: claim_id.to_string(),
            from,
            to,
            at,
        }
    }
}

#[derive(Debug)]
struct Delivery {
    url: String,
    payload: StatusChangedEvent,
}

/// Outcome classification for one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptOutcome {
    Delivered,
    Retry,
    Drop,
}

fn classify_status(status: u16) -> AttemptOutcome {
    match status {
        200..=299 => AttemptOutcome::Delivered,
        408 | 429 => AttemptOutcome::Retry,
        500..=599 => AttemptOutcome::Retry,
        _ => AttemptOutcome::Drop,
    }
}

/// Backoff for the given zero-based attempt: `base * 2^attempt`, jittered
/// by the supplied factor in `[-JITTER, +JITTER]`.
fn backoff_delay(attempt: u32, jitter_factor: f64) -> Duration {
    let base_ms = RETRY_BASE.as_millis() as f64 * 2f64.powi(attempt as i32);
    Duration::from_millis((base_ms * (1.0 + jitter_factor)).max(0.0) as u64)
}

/// Handle for enqueuing webhook deliveries.
#[derive(Clone)]
pub struct WebhookDispatcher {
    tx: mpsc::Sender<Delivery>,
}

impl WebhookDispatcher {
    /// Spawn `worker_count` delivery workers and return the dispatcher.
    pub fn spawn(worker_count: usize) -> Self {
        let (tx, rx) = mpsc::channel::<Delivery>(QUEUE_DEPTH);
        let rx = std::sync::Arc::new(tokio::sync::Mutex::new(rx));

        for worker in 0..worker_count.max(1) {
            let rx = rx.clone();
            let client = reqwest::Client::builder()
                .timeout(DELIVERY_TIMEOUT)
                .user_agent("zkpa-webhook/1.1")
                .build()
                .expect("reqwest client construction is infallible with static config");
            tokio::spawn(async move {
                loop {
                    let delivery = {
                        let mut guard = rx.lock().await;
                        guard.recv().await
                    };
                    let Some(delivery) = delivery else { break };
                    deliver(&client, &delivery).await;
                }
                tracing::debug!(worker, "webhook worker shut down");
            });
        }

        Self { tx }
    }

    /// Enqueue a delivery. Sheds (with a warning) when the queue is full
    /// rather than blocking the lifecycle engine.
    pub fn enqueue(&self, url: &str, payload: StatusChangedEvent) {
        let delivery = Delivery {
            url: url.to_string(),
            payload,
        };
        if let Err(err) = self.tx.try_send(delivery) {
            tracing::warn!(error = %err, "webhook queue full, delivery dropped");
        }
    }
}

async fn deliver(client: &reqwest::Client, delivery: &Delivery) {
    for attempt in 0..MAX_ATTEMPTS {
        let response = client
            .post(&delivery.url)
            .json(&delivery.payload)
            .send()
            .await;

        match response {
            Ok(resp) => match classify_status(resp.status().as_u16()) {
                AttemptOutcome::Delivered => {
                    tracing::debug!(
                        url = %delivery.url,
                        claim_id = %delivery.payload.claim_id,
                        "webhook delivered"
                    );
                    return;
                }
                AttemptOutcome::Drop => {
                    tracing::warn!(
                        url = %delivery.url,
                        status = resp.status().as_u16(),
                        "webhook rejected by receiver, not retrying"
                    );
                    return;
                }
                AttemptOutcome::Retry => {
                    tracing::warn!(
                        url = %delivery.url,
                        status = resp.status().as_u16(),
                        attempt = attempt + 1,
                        "webhook attempt failed"
                    );
                }
            },
            Err(err) => {
                tracing::warn!(
                    url = %delivery.url,
                    attempt = attempt + 1,
                    error = %err,
                    "webhook transport error"
                );
            }
        }

        if attempt + 1 < MAX_ATTEMPTS {
            let jitter = rand::thread_rng().gen_range(-JITTER..=JITTER);
            tokio::time::sleep(backoff_delay(attempt, jitter)).await;
        }
    }

    tracing::error!(
        url = %delivery.url,
        claim_id = %delivery.payload.claim_id,
        "webhook delivery exhausted after {MAX_ATTEMPTS} attempts, dropped"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::AttestationStatus::*;

    #[test]
    fn classify_success_codes() {
        assert_eq!(classify_status(200), AttemptOutcome::Delivered);
        assert_eq!(classify_status(201), AttemptOutcome::Delivered);
        assert_eq!(classify_status(204), AttemptOutcome::Delivered);
    }

    #[test]
    fn classify_retryable_codes() {
        assert_eq!(classify_status(408), AttemptOutcome::Retry);
        assert_eq!(classify_status(429), AttemptOutcome::Retry);
        assert_eq!(classify_status(500), AttemptOutcome::Retry);
        assert_eq!(classify_status(503), AttemptOutcome::Retry);
    }

    #[test]
    fn classify_fatal_codes() {
        assert_eq!(classify_status(400), AttemptOutcome::Drop);
        assert_eq!(classify_status(404), AttemptOutcome::Drop);
        assert_eq!(classify_status(410), AttemptOutcome::Drop);
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(backoff_delay(0, 0.0), Duration::from_secs(1));
        assert_eq!(backoff_delay(1, 0.0), Duration::from_secs(2));
        assert_eq!(backoff_delay(2, 0.0), Duration::from_secs(4));
        assert_eq!(backoff_delay(3, 0.0), Duration::from_secs(8));
    }

    #[test]
    fn backoff_jitter_bounds() {
        let low = backoff_delay(0, -JITTER);
        let high = backoff_delay(0, JITTER);
        assert_eq!(low, Duration::from_millis(800));
        assert_eq!(high, Duration::from_millis(1200));
    }

    #[test]
    fn event_payload_shape() {
        let event = StatusChangedEvent::new(
            "ATT-20260101000000-abcdef",
            Anchoring,
            Valid,
            Timestamp::now(),
        );
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "attestation.status_changed");
        assert_eq!(value["from"], "anchoring");
        assert_eq!(value["to"], "valid");
        assert!(value["at"].is_string());
    }

    #[tokio::test]
    async fn enqueue_does_not_block_when_no_receiver_is_reachable() {
        let dispatcher = WebhookDispatcher::spawn(1);
        // Deliveries to an unroutable port are retried and dropped in the
        // background; enqueue itself must return immediately.
        dispatcher.enqueue(
            "http://127.0.0.1:1/webhook",
            StatusChangedEvent::new("ATT-20260101000000-abcdef", Pending, Failed, Timestamp::now()),
        );
    }
}
