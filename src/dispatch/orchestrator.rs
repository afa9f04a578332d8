use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use tokio::task::{JoinError, JoinHandle};
use tracing::Instrument;

use crate::channel::{ChannelMessageResponse, ChannelResolver};
use crate::metrics::DispatchMetrics;
use crate::quota::{QuotaAccountant, QuotaCounters, QuotaPolicy, QuotaReservation};

use super::config::DispatchConfig;
use super::types::{DispatchResult, DispatchStatus, NotificationMessage, RecipientOutcome};

/// Scheme label used for recipients that do not resolve to a channel
const UNRESOLVED_SCHEME: &str = "unresolved";

/// Statistics for the dispatch orchestrator
#[derive(Debug, Default)]
pub struct DispatcherStats {
    /// Dispatch requests received
    pub total_requests: AtomicU64,
    /// Requests that passed admission
    pub admitted: AtomicU64,
    /// Requests rejected for quota
    pub rejected: AtomicU64,
    /// Admitted requests where at least one recipient failed
    pub multi_status: AtomicU64,
    /// Successful recipient deliveries
    pub recipients_delivered: AtomicU64,
    /// Failed recipient deliveries
    pub recipients_failed: AtomicU64,
}

impl DispatcherStats {
    pub fn snapshot(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            admitted: self.admitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            multi_status: self.multi_status.load(Ordering::Relaxed),
            recipients_delivered: self.recipients_delivered.load(Ordering::Relaxed),
            recipients_failed: self.recipients_failed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatcher statistics
#[derive(Debug, Clone, Serialize)]
pub struct DispatcherStatsSnapshot {
    pub total_requests: u64,
    pub admitted: u64,
    pub rejected: u64,
    pub multi_status: u64,
    pub recipients_delivered: u64,
    pub recipients_failed: u64,
}

/// Runs the admission-check-then-send protocol for one message at a time.
///
/// 1. Estimate: every recipient's channel adds its cost to one projected
///    `QuotaCounters`, sequentially and without I/O.
/// 2. Admit: ask the accountant; a rejection contacts nobody and commits
///    nothing.
/// 3. Fan out: one task per recipient, full join, no sibling cancellation.
/// 4. Aggregate: outcomes are slotted back into declaration order.
/// 5. Commit: the projected counters are committed exactly once.
///
/// Steps 3 to 5 run on a detached task. Once a message is admitted, dropping
/// the `dispatch` future does not stop its sends, and its usage is still
/// committed (or its strict-mode reservation finalized).
pub struct DispatchOrchestrator {
    resolver: Arc<ChannelResolver>,
    accountant: Arc<QuotaAccountant>,
    config: DispatchConfig,
    stats: Arc<DispatcherStats>,
}

impl DispatchOrchestrator {
    pub fn new(resolver: Arc<ChannelResolver>, accountant: Arc<QuotaAccountant>) -> Self {
        Self::with_config(resolver, accountant, DispatchConfig::default())
    }

    pub fn with_config(
        resolver: Arc<ChannelResolver>,
        accountant: Arc<QuotaAccountant>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            resolver,
            accountant,
            config,
            stats: Arc::new(DispatcherStats::default()),
        }
    }

    pub fn resolver(&self) -> &Arc<ChannelResolver> {
        &self.resolver
    }

    pub fn accountant(&self) -> &Arc<QuotaAccountant> {
        &self.accountant
    }

    /// Get dispatcher statistics
    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.stats.snapshot()
    }

    /// Dispatch one message to all of its recipients
    #[tracing::instrument(
        name = "dispatcher.dispatch",
        skip(self, message),
        fields(
            ref_tag = %message.ref_tag,
            recipient_count = message.recipients.len()
        )
    )]
    pub async fn dispatch(&self, message: NotificationMessage) -> DispatchResult {
        let started = Instant::now();
        self.stats.total_requests.fetch_add(1, Ordering::Relaxed);
        DispatchMetrics::record_batch_size(message.recipients.len());

        let projected = Arc::new(self.estimate(&message));

        let reservation = match self.accountant.policy() {
            QuotaPolicy::Soft => {
                if !self.accountant.is_admissible(&projected) {
                    return self.reject(message, &projected);
                }
                None
            }
            QuotaPolicy::Strict => match self.accountant.try_reserve(&projected) {
                Some(reservation) => Some(reservation),
                None => return self.reject(message, &projected),
            },
        };
        self.stats.admitted.fetch_add(1, Ordering::Relaxed);

        let message = Arc::new(message);
        let admitted = AdmittedDispatch {
            resolver: self.resolver.clone(),
            accountant: self.accountant.clone(),
            config: self.config.clone(),
            stats: self.stats.clone(),
            message: message.clone(),
            projected,
            reservation,
            started,
        };

        match tokio::spawn(admitted.run().in_current_span()).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "Dispatch task failed");
                let outcomes = message
                    .recipients
                    .iter()
                    .map(|recipient| RecipientOutcome {
                        recipient: recipient.clone(),
                        response: ChannelMessageResponse::internal_error(
                            "internal error: dispatch task failed",
                        ),
                    })
                    .collect();
                DispatchResult::aggregate(message.ref_tag.clone(), outcomes)
            }
        }
    }

    /// Build the projected counters for `message`.
    ///
    /// Recipients that do not resolve cannot be sent to and add nothing.
    fn estimate(&self, message: &NotificationMessage) -> QuotaCounters {
        let projected = QuotaCounters::new();
        for identifier in &message.recipients {
            match self.resolver.resolve(identifier) {
                Ok((channel, recipient)) => channel.estimate_usage(
                    &message.ref_tag,
                    &recipient,
                    &message.channel_message,
                    &projected,
                ),
                Err(e) => tracing::debug!(
                    recipient = %identifier,
                    error = %e,
                    "Recipient excluded from quota estimate"
                ),
            }
        }
        projected
    }

    fn reject(&self, message: NotificationMessage, projected: &QuotaCounters) -> DispatchResult {
        self.stats.rejected.fetch_add(1, Ordering::Relaxed);
        DispatchMetrics::record_outcome(DispatchStatus::QuotaExceeded);

        tracing::warn!(
            ref_tag = %message.ref_tag,
            projected = ?projected.usage(),
            usage = ?self.accountant.usage(),
            budget = ?self.accountant.budget(),
            "Dispatch rejected, quota exceeded"
        );

        DispatchResult::rejected(message.ref_tag)
    }
}

/// An admitted message: everything needed to send, aggregate and commit
/// without borrowing the orchestrator.
struct AdmittedDispatch {
    resolver: Arc<ChannelResolver>,
    accountant: Arc<QuotaAccountant>,
    config: DispatchConfig,
    stats: Arc<DispatcherStats>,
    message: Arc<NotificationMessage>,
    projected: Arc<QuotaCounters>,
    reservation: Option<QuotaReservation>,
    started: Instant,
}

impl AdmittedDispatch {
    async fn run(self) -> DispatchResult {
        let outcomes = self.fan_out().await;
        let result = DispatchResult::aggregate(self.message.ref_tag.clone(), outcomes);

        match self.reservation {
            Some(reservation) => self.accountant.finalize(reservation, &self.projected),
            None => self.accountant.commit(&self.projected),
        }

        let delivered = result.delivered();
        let failed = result.failed();
        self.stats
            .recipients_delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);
        self.stats
            .recipients_failed
            .fetch_add(failed as u64, Ordering::Relaxed);
        if result.status == DispatchStatus::MultiStatus {
            self.stats.multi_status.fetch_add(1, Ordering::Relaxed);
        }
        DispatchMetrics::record_outcome(result.status);

        tracing::info!(
            ref_tag = %result.ref_tag,
            status = result.status.as_str(),
            representative_status = ?result.representative_status,
            delivered = delivered,
            failed = failed,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "Dispatch completed"
        );

        result
    }

    /// Send to every recipient concurrently and wait for all of them.
    ///
    /// Tasks complete in any order; each outcome is written back into the slot
    /// of the recipient that produced it.
    async fn fan_out(&self) -> Vec<RecipientOutcome> {
        let message = &self.message;
        let total = message.recipients.len();
        let limit = self.config.concurrency_limit();
        let mut slots: Vec<Option<ChannelMessageResponse>> = vec![None; total];
        let mut in_flight = FuturesUnordered::new();

        for index in 0..total {
            let task = self.spawn_send(index);
            in_flight.push(async move { (index, task.await) });

            // Drain completed sends while at the concurrency limit
            while in_flight.len() >= limit {
                match in_flight.next().await {
                    Some((done, joined)) => {
                        slots[done] = Some(settle(&message.recipients[done], joined));
                    }
                    None => break,
                }
            }
        }

        while let Some((done, joined)) = in_flight.next().await {
            slots[done] = Some(settle(&message.recipients[done], joined));
        }

        message
            .recipients
            .iter()
            .zip(slots)
            .map(|(recipient, slot)| RecipientOutcome {
                recipient: recipient.clone(),
                response: slot.unwrap_or_else(|| {
                    ChannelMessageResponse::internal_error("internal error: no delivery outcome")
                }),
            })
            .collect()
    }

    /// Spawn the send for the recipient at `index`.
    fn spawn_send(&self, index: usize) -> JoinHandle<ChannelMessageResponse> {
        let resolver = self.resolver.clone();
        let message = self.message.clone();
        let counters = self.projected.clone();
        let send_timeout = self.config.send_timeout();
        let span = tracing::debug_span!(
            "dispatcher.send",
            recipient_index = index,
            recipient = %message.recipients[index]
        );

        tokio::spawn(
            async move {
                let started = Instant::now();
                let identifier = &message.recipients[index];

                let (channel, recipient) = match resolver.resolve(identifier) {
                    Ok(resolved) => resolved,
                    Err(e) => {
                        tracing::debug!(error = %e, "Recipient did not resolve");
                        DispatchMetrics::record_recipient(UNRESOLVED_SCHEME, false);
                        return e.to_response();
                    }
                };

                let send = channel.send(
                    &message.ref_tag,
                    &recipient,
                    &message.channel_message,
                    &counters,
                );
                let response = match send_timeout {
                    Some(limit) => match tokio::time::timeout(limit, send).await {
                        Ok(response) => response,
                        Err(_) => ChannelMessageResponse::gateway_timeout(format!(
                            "send timed out after {}ms",
                            limit.as_millis()
                        )),
                    },
                    None => send.await,
                };

                DispatchMetrics::record_recipient(channel.scheme(), response.is_ok());
                DispatchMetrics::observe_send_latency(
                    channel.scheme(),
                    started.elapsed().as_secs_f64(),
                );
                tracing::debug!(
                    status_code = response.status_code,
                    status_text = %response.status_text,
                    "Recipient send finished"
                );

                response
            }
            .instrument(span),
        )
    }
}

/// Turn a joined send task into an outcome. A panicked or cancelled task only
/// fails its own recipient.
fn settle(
    identifier: &str,
    joined: Result<ChannelMessageResponse, JoinError>,
) -> ChannelMessageResponse {
    joined.unwrap_or_else(|e| {
        tracing::error!(recipient = %identifier, error = %e, "Recipient send task failed");
        let detail = if e.is_panic() {
            "channel panicked"
        } else {
            "send task cancelled"
        };
        ChannelMessageResponse::internal_error(format!("internal error: {detail}"))
    })
}
