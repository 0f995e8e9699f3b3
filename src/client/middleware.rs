//! # Vote Dispatcher
//!
//! The caller-side layer around [`VoteRelayClient`]. The client delivers one
//! vote per call and never retries, because resending a vote is not guaranteed
//! to be idempotent on the remote server. Whether to take that risk is a policy
//! decision, and it lives here.
//!
//! ## Responsibilities
//!
//! - **Retry**: up to `max_attempts`, only for `ConnectTimeout` and `TransportError`
//! - **Backoff**: linear delay plus uniform jitter between attempts
//! - **Cancellation**: one token covers every attempt and every delay
//! - **Scheduling**: [`VoteDispatcher::spawn`] runs a dispatch as its own task
//! - **Metrics**: every attempt is recorded when metrics are attached
//!
//! ## Usage
//!
//! ```rust,ignore
//! let client = Arc::new(VoteRelayClient::new(config.clone()));
//! let dispatcher = Arc::new(VoteDispatcher::new(client, config.retry.clone()));
//!
//! // Fire the vote now, persist the outcome once it lands
//! let handle = dispatcher.clone().spawn(target, voter);
//! let report = handle.await?;
//! store_outcome(report.outcome);
//! ```

use chrono::Utc;
use log::{info, warn};
use rand::Rng;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::client::client::VoteRelayClient;
use crate::client::metrics::RelayMetrics;
use crate::common::config::RetryPolicy;
use crate::common::connection::{Connector, TcpConnector};
use crate::common::error::RelayError;
use crate::common::vote::{VoteOutcome, VoteTarget, VoterIdentity};

/// What a dispatch ended with.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    /// Correlates the log lines of every attempt
    pub request_id: Uuid,
    /// Outcome of the last attempt
    pub outcome: VoteOutcome,
    /// Number of attempts actually made; the first one always runs, so at least 1
    pub attempts: u32,
}

/// Retrying front end for a shared [`VoteRelayClient`].
pub struct VoteDispatcher<C = TcpConnector> {
    client: Arc<VoteRelayClient<C>>,
    policy: RetryPolicy,
    metrics: Option<Arc<Mutex<RelayMetrics>>>,
}

impl<C: Connector + 'static> VoteDispatcher<C> {
    pub fn new(client: Arc<VoteRelayClient<C>>, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy,
            metrics: None,
        }
    }

    /// Record every attempt into `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<Mutex<RelayMetrics>>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Deliver a vote, retrying transport failures per the policy.
    pub async fn dispatch(&self, target: &VoteTarget, voter: &VoterIdentity) -> DispatchReport {
        self.dispatch_cancellable(target, voter, &CancellationToken::new())
            .await
    }

    /// Like [`dispatch`](Self::dispatch); `cancel` also interrupts the delay between attempts.
    pub async fn dispatch_cancellable(
        &self,
        target: &VoteTarget,
        voter: &VoterIdentity,
        cancel: &CancellationToken,
    ) -> DispatchReport {
        let request_id = Uuid::new_v4();
        let label = target.label();
        let max_attempts = self.policy.max_attempts.max(1);

        let mut attempt = 1;
        loop {
            if attempt > 1 {
                let delay = self.retry_delay(attempt);
                info!(
                    "🔄 [{}] Retry attempt {}/{} to {} in {:?}",
                    request_id, attempt, max_attempts, label, delay
                );

                let cancelled = tokio::select! {
                    _ = cancel.cancelled() => true,
                    _ = tokio::time::sleep(delay) => false,
                };
                if cancelled {
                    info!("[{}] Vote to {} cancelled before retry", request_id, label);
                    return DispatchReport {
                        request_id,
                        outcome: VoteOutcome::failed(Utc::now(), &RelayError::Cancelled),
                        attempts: attempt - 1,
                    };
                }
            }

            let started = Instant::now();
            let outcome = self.client.send_vote_cancellable(target, voter, cancel).await;
            self.record(&label, &outcome, started.elapsed());

            let retryable = outcome.error_kind.is_some_and(|kind| kind.is_retryable());
            if outcome.success || !retryable || attempt >= max_attempts {
                if !outcome.success && retryable {
                    warn!(
                        "❌ [{}] Giving up on vote to {} after {} attempts",
                        request_id, label, attempt
                    );
                }
                return DispatchReport {
                    request_id,
                    outcome,
                    attempts: attempt,
                };
            }

            attempt += 1;
        }
    }

    /// Schedule a dispatch as an independent task and return its handle.
    pub fn spawn(self: Arc<Self>, target: VoteTarget, voter: VoterIdentity) -> JoinHandle<DispatchReport> {
        tokio::spawn(async move { self.dispatch(&target, &voter).await })
    }

    fn retry_delay(&self, attempt: u32) -> Duration {
        let base = self
            .policy
            .base_delay_ms
            .saturating_mul(u64::from(attempt.saturating_sub(1)));
        let jitter = if self.policy.max_jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.policy.max_jitter_ms)
        } else {
            0
        };
        Duration::from_millis(base.saturating_add(jitter))
    }

    fn record(&self, label: &str, outcome: &VoteOutcome, latency: Duration) {
        if let Some(metrics) = &self.metrics {
            match metrics.lock() {
                Ok(mut metrics) => metrics.record(label, outcome, latency),
                Err(e) => warn!("Metrics lock poisoned: {}", e),
            }
        }
    }
}
