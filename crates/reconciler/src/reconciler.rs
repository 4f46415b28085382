//! The reconciliation loop.
//!
//! Every `interval` the loop lists all in-flight jobs, gathers evidence for
//! each one independently and concurrently, normalizes it and writes the
//! result back. A failure for one uid is logged and counted; it never
//! aborts the tick or the loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use rendertrack_core::normalizer::{normalize, Evidence, Normalized, NormalizerPolicy};
use rendertrack_core::types::Timestamp;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::evidence::{ArtifactProbe, RenderStatusSource};
use crate::store::{JobRecord, JobStore, RecordUpdate};

/// Default time between ticks.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// Default upper bound on one upstream status call.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of jobs reconciled concurrently within a tick.
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// Tunables for the reconciliation loop.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub interval: Duration,
    pub upstream_timeout: Duration,
    pub max_concurrency: usize,
    pub policy: NormalizerPolicy,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            policy: NormalizerPolicy::default(),
        }
    }
}

/// Per-tick counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Uids listed as in flight.
    pub polled: usize,
    /// Records whose state, progress or output path changed.
    pub updated: usize,
    /// Records whose evidence matched what was already stored.
    pub unchanged: usize,
    /// Fresh jobs with no upstream status yet.
    pub deferred: usize,
    /// Records that vanished or turned terminal mid-tick.
    pub skipped: usize,
    /// Records whose store read or write failed.
    pub failed: usize,
}

impl TickSummary {
    fn record(&mut self, outcome: UidOutcome) {
        match outcome {
            UidOutcome::Updated => self.updated += 1,
            UidOutcome::Unchanged => self.unchanged += 1,
            UidOutcome::Deferred => self.deferred += 1,
            UidOutcome::Skipped => self.skipped += 1,
            UidOutcome::Failed => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UidOutcome {
    Updated,
    Unchanged,
    Deferred,
    Skipped,
    Failed,
}

/// Background reconciler for render job state.
///
/// Created once at startup and driven by [`Reconciler::run`]; tests call
/// [`Reconciler::reconcile_at`] directly.
pub struct Reconciler {
    store: Arc<dyn JobStore>,
    upstream: Arc<dyn RenderStatusSource>,
    probe: Arc<dyn ArtifactProbe>,
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn JobStore>,
        upstream: Arc<dyn RenderStatusSource>,
        probe: Arc<dyn ArtifactProbe>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            store,
            upstream,
            probe,
            config,
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Run the loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            interval_ms = self.config.interval.as_millis() as u64,
            max_concurrency = self.config.max_concurrency,
            grace_secs = self.config.policy.grace_period.as_secs(),
            min_artifact_bytes = self.config.policy.min_artifact_bytes,
            "Render job reconciler started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Render job reconciler shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.reconcile_once().await;
                }
            }
        }
    }

    /// Reconcile every in-flight job once against the current time.
    pub async fn reconcile_once(&self) -> TickSummary {
        self.reconcile_at(Utc::now()).await
    }

    /// Reconcile every in-flight job once, measuring job age against `now`.
    pub async fn reconcile_at(&self, now: Timestamp) -> TickSummary {
        let uids = match self.store.list_non_terminal_uids().await {
            Ok(uids) => uids,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list in-flight render jobs, skipping tick");
                return TickSummary::default();
            }
        };

        let mut summary = TickSummary {
            polled: uids.len(),
            ..Default::default()
        };
        if uids.is_empty() {
            return summary;
        }

        let outcomes: Vec<UidOutcome> = futures::stream::iter(uids)
            .map(|uid| async move { self.reconcile_uid(&uid, now).await })
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            summary.record(outcome);
        }

        if summary.updated > 0 || summary.failed > 0 {
            tracing::info!(?summary, "Reconciliation tick complete");
        } else {
            tracing::debug!(?summary, "Reconciliation tick complete");
        }
        summary
    }

    async fn reconcile_uid(&self, uid: &str, now: Timestamp) -> UidOutcome {
        let record = match self.store.get_record(uid).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::debug!(uid, "Render job vanished before reconciliation");
                return UidOutcome::Skipped;
            }
            Err(e) => {
                tracing::error!(uid, error = %e, "Failed to load render job");
                return UidOutcome::Failed;
            }
        };
        if record.state.is_terminal() {
            return UidOutcome::Skipped;
        }

        let evidence = self.gather_evidence(&record, now).await;
        let Some(normalized) = normalize(&evidence, &self.config.policy) else {
            tracing::debug!(uid, "No render status yet, job within grace period");
            return UidOutcome::Deferred;
        };

        let Some(update) = plan_update(&record, normalized) else {
            return UidOutcome::Unchanged;
        };

        match self.store.update_record(uid, &update).await {
            Ok(true) => {
                tracing::info!(
                    uid,
                    from = %record.state,
                    state = %update.state,
                    progress = update.progress,
                    output_path = ?update.output_path,
                    "Render job reconciled",
                );
                UidOutcome::Updated
            }
            Ok(false) => {
                tracing::debug!(uid, "Render job turned terminal before write, skipped");
                UidOutcome::Skipped
            }
            Err(e) => {
                tracing::error!(uid, error = %e, "Failed to persist render job state");
                UidOutcome::Failed
            }
        }
    }

    /// Collect upstream status, falling back to job age and the artifact on
    /// disk when the render service has nothing usable.
    async fn gather_evidence(&self, record: &JobRecord, now: Timestamp) -> Evidence {
        let fetched = tokio::time::timeout(
            self.config.upstream_timeout,
            self.upstream.fetch_status(&record.uid),
        )
        .await;

        let payload = match fetched {
            Ok(payload) => payload,
            Err(_) => {
                tracing::warn!(
                    uid = %record.uid,
                    timeout_ms = self.config.upstream_timeout.as_millis() as u64,
                    "Render status request timed out",
                );
                None
            }
        };
        if let Some(payload) = payload {
            return Evidence::Upstream(payload);
        }

        let elapsed = elapsed_since(record.submitted_at, now);
        let artifact_size = if self.config.policy.within_grace(elapsed) {
            None
        } else {
            match record.output_path.as_deref() {
                Some(path) => self.probe.stat_size(path).await,
                None => None,
            }
        };

        Evidence::Absent {
            elapsed,
            artifact_size,
        }
    }
}

/// Time since `submitted_at`; a timestamp in the future counts as zero.
fn elapsed_since(submitted_at: Timestamp, now: Timestamp) -> Duration {
    (now - submitted_at).to_std().unwrap_or(Duration::ZERO)
}

/// Turn a normalized outcome into the write to perform, or `None` if the
/// stored record already says the same thing.
///
/// While a job stays non-terminal its progress never moves backwards.
fn plan_update(record: &JobRecord, normalized: Normalized) -> Option<RecordUpdate> {
    let progress = if normalized.state.is_terminal() {
        normalized.progress
    } else {
        normalized.progress.max(record.progress)
    };

    let output_changed = normalized
        .output_path
        .as_ref()
        .is_some_and(|path| record.output_path.as_ref() != Some(path));

    if normalized.state == record.state && progress == record.progress && !output_changed {
        return None;
    }

    Some(RecordUpdate {
        state: normalized.state,
        progress,
        output_path: normalized.output_path,
    })
}
