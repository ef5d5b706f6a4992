//! Tracks a fixed set of background jobs until they all finish, the wait
//! budget runs out, or the owner cancels.
//!
//! A session polls every job once per tick, concurrently, and resolves exactly
//! once. The terminal [`StatusUpdate`] reaches the sink right before the
//! outcome is returned; nothing is reported after that.

use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::Instrument;
use uuid::Uuid;

use crate::models::job::{JobId, JobSnapshot};
use crate::models::outcome::{PollOutcome, StatusUpdate};
use crate::services::aggregate::{assess_tick, TickAssessment};
use crate::services::sink::StatusSink;
use crate::services::status_client::{JobStatusClient, StatusQueryError};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(180);

/// Tick interval and total wait budget of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerSettings {
    pub poll_interval: Duration,
    pub max_wait: Duration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }
}

impl PollerSettings {
    /// Number of ticks the budget allows; never less than one.
    pub fn max_attempts(&self) -> u32 {
        let interval = self.poll_interval.as_millis().max(1);
        let attempts = self.max_wait.as_millis() / interval;
        attempts.clamp(1, u32::MAX as u128) as u32
    }
}

/// Polls a [`JobStatusClient`] on behalf of one or more sessions.
pub struct JobPoller<C> {
    client: Arc<C>,
    settings: PollerSettings,
}

impl<C> Clone for JobPoller<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            settings: self.settings,
        }
    }
}

impl<C: JobStatusClient> JobPoller<C> {
    pub fn new(client: C, settings: PollerSettings) -> Self {
        Self::with_shared_client(Arc::new(client), settings)
    }

    pub fn with_shared_client(client: Arc<C>, settings: PollerSettings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> PollerSettings {
        self.settings
    }

    /// Track `job_ids` until every job is terminal, the budget is spent,
    /// or `cancel` fires.
    ///
    /// Only an empty id set is an error; every other way a session can end
    /// is a [`PollOutcome`].
    pub async fn track(
        &self,
        job_ids: &[JobId],
        label: &str,
        sink: &dyn StatusSink,
        cancel: &CancellationToken,
    ) -> Result<PollOutcome, PollerError> {
        ensure_not_empty(job_ids)?;
        Ok(self.run_session(job_ids, label, sink, cancel).await)
    }

    /// Same as [`track`](Self::track) for a single job.
    pub async fn track_one(
        &self,
        job_id: &JobId,
        label: &str,
        sink: &dyn StatusSink,
        cancel: &CancellationToken,
    ) -> Result<PollOutcome, PollerError> {
        self.track(std::slice::from_ref(job_id), label, sink, cancel)
            .await
    }

    async fn run_session(
        &self,
        job_ids: &[JobId],
        label: &str,
        sink: &dyn StatusSink,
        cancel: &CancellationToken,
    ) -> PollOutcome {
        let span = tracing::info_span!(
            "poll_session",
            session_id = %Uuid::new_v4(),
            label = %label,
            jobs = job_ids.len()
        );

        async move {
            let started = Instant::now();
            let max_attempts = self.settings.max_attempts();
            tracing::info!(
                max_attempts,
                interval_ms = self.settings.poll_interval.as_millis() as u64,
                "Tracking jobs"
            );

            let outcome = self.poll_loop(job_ids, label, sink, cancel, max_attempts).await;

            sink.report(&StatusUpdate::from_outcome(label, &outcome));
            metrics::counter!("job_poll_sessions_total", "outcome" => outcome.kind()).increment(1);
            metrics::histogram!("job_poll_session_seconds").record(started.elapsed().as_secs_f64());

            match &outcome {
                PollOutcome::Converged(summary) => tracing::info!(
                    completed = summary.completed,
                    failed = summary.failed,
                    keywords_found = summary.keywords_found,
                    "All jobs finished"
                ),
                PollOutcome::TimedOut { attempts, .. } => {
                    tracing::warn!(attempts, "Wait budget exhausted, jobs still running")
                }
                PollOutcome::Cancelled { attempts } => {
                    tracing::info!(attempts, "Session cancelled")
                }
            }

            outcome
        }
        .instrument(span)
        .await
    }

    async fn poll_loop(
        &self,
        job_ids: &[JobId],
        label: &str,
        sink: &dyn StatusSink,
        cancel: &CancellationToken,
        max_attempts: u32,
    ) -> PollOutcome {
        let period = self.settings.poll_interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut attempts: u32 = 0;
        let mut last_progress = None;

        loop {
            let cancelled = tokio::select! {
                biased;
                _ = cancel.cancelled() => true,
                _ = ticker.tick() => false,
            };
            if cancelled {
                return PollOutcome::Cancelled { attempts };
            }

            attempts += 1;
            metrics::counter!("job_poll_ticks_total").increment(1);

            let results = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                results = self.query_all(job_ids) => Some(results),
            };
            let Some(results) = results else {
                return PollOutcome::Cancelled { attempts };
            };

            match assess_tick(label, attempts, &results) {
                TickAssessment::Converged(summary) => return PollOutcome::Converged(summary),
                TickAssessment::InProgress(report) => {
                    tracing::debug!(
                        attempt = attempts,
                        average_progress = report.average_progress,
                        terminal = report.terminal,
                        unreachable = report.unreachable,
                        "Jobs still in progress"
                    );
                    sink.report(&StatusUpdate::Progress(report.clone()));
                    last_progress = Some(report);
                }
                TickAssessment::NoData => {
                    tracing::debug!(attempt = attempts, "No job answered this tick");
                }
            }

            if attempts >= max_attempts {
                return PollOutcome::TimedOut {
                    attempts,
                    last_progress,
                };
            }
        }
    }

    async fn query_all(&self, job_ids: &[JobId]) -> Vec<Result<JobSnapshot, StatusQueryError>> {
        let queries = job_ids.iter().map(|job_id| async move {
            let result = self.client.fetch_status(job_id).await;
            if let Err(e) = &result {
                metrics::counter!("job_poll_query_failures_total").increment(1);
                tracing::warn!(job_id = %job_id, error = %e, "Status query failed, skipping job this tick");
            }
            result
        });
        join_all(queries).await
    }
}

impl<C: JobStatusClient + 'static> JobPoller<C> {
    /// Start a session on the runtime and hand back its owning handle.
    ///
    /// Dropping the handle cancels the session.
    pub fn spawn(
        &self,
        job_ids: Vec<JobId>,
        label: impl Into<String>,
        sink: Arc<dyn StatusSink>,
    ) -> Result<PollHandle, PollerError> {
        ensure_not_empty(&job_ids)?;

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let poller = self.clone();
        let label = label.into();

        let task = tokio::spawn(async move {
            poller
                .run_session(&job_ids, &label, sink.as_ref(), &token)
                .await
        });

        Ok(PollHandle {
            cancel: cancel.clone(),
            task,
            _guard: cancel.drop_guard(),
        })
    }
}

fn ensure_not_empty(job_ids: &[JobId]) -> Result<(), PollerError> {
    if job_ids.is_empty() {
        return Err(PollerError::InvalidArgument(
            "at least one job id is required".to_string(),
        ));
    }
    Ok(())
}

/// Owner of a spawned poll session.
pub struct PollHandle {
    cancel: CancellationToken,
    task: JoinHandle<PollOutcome>,
    _guard: DropGuard,
}

impl PollHandle {
    /// Abandon the session. It resolves as [`PollOutcome::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the session's single resolution.
    pub async fn outcome(self) -> Result<PollOutcome, PollerError> {
        let PollHandle { task, _guard, .. } = self;
        Ok(task.await?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PollerError {
    /// Rejected before any tick, e.g. an empty job set.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Only from [`PollHandle::outcome`]: the session task panicked or was aborted.
    #[error("Poll session task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
