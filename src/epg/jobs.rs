//! Sync job tracking and scheduling.
//!
//! At most one sync task runs per logical job id; the map from job id to
//! its cancellation token enforces that. The scheduler pair mirrors the
//! external timer contract: a recurring sync every N milliseconds, or a
//! one-shot run as soon as possible.

use std::sync::Arc;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::epg::sync::SyncOrchestrator;

/// Tracks in-flight sync tasks by job id.
#[derive(Clone)]
pub struct SyncJobs {
    orchestrator: SyncOrchestrator,
    clock: Arc<dyn crate::clock::Clock>,
    active: Arc<DashMap<String, CancellationToken>>,
}

impl SyncJobs {
    pub fn new(orchestrator: SyncOrchestrator, clock: Arc<dyn crate::clock::Clock>) -> Self {
        Self {
            orchestrator,
            clock,
            active: Arc::new(DashMap::new()),
        }
    }

    /// Start a one-shot sync covering `[now, now + window_ms)`.
    ///
    /// A run still going after `deadline_ms` has its token cancelled; it
    /// winds down at the next cancellation check point and reports
    /// `Cancelled` through the status channel.
    ///
    /// Returns `false` without starting anything when a task with this job
    /// id is already in flight.
    pub fn request_sync(
        &self,
        job_id: impl Into<String>,
        input_id: impl Into<String>,
        window_ms: i64,
        deadline_ms: i64,
    ) -> bool {
        let job_id = job_id.into();
        let input_id = input_id.into();
        let token = match self.try_claim(&job_id) {
            Some(token) => token,
            None => return false,
        };

        let orchestrator = self.orchestrator.clone();
        let clock = Arc::clone(&self.clock);
        let active = Arc::clone(&self.active);
        let task_job_id = job_id.clone();
        tokio::spawn(async move {
            let watchdog_token = token.clone();
            let watchdog_job_id = task_job_id.clone();
            let watchdog = tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(deadline_ms.max(0) as u64))
                    .await;
                warn!("Sync job {} exceeded its deadline, cancelling", watchdog_job_id);
                watchdog_token.cancel();
            });

            let start = clock.now_utc_ms();
            // Run result is already surfaced through the status observer.
            let _ = orchestrator
                .sync(&input_id, start, start + window_ms, &token)
                .await;
            watchdog.abort();
            active.remove(&task_job_id);
        });
        info!(
            "Requested one-shot sync job {} (deadline {} ms)",
            job_id, deadline_ms
        );
        true
    }

    /// Start a recurring sync: one run immediately, then one every
    /// `period_ms` until the job is cancelled.
    ///
    /// Returns `false` when the job id is already in flight.
    pub fn schedule_recurring(
        &self,
        job_id: impl Into<String>,
        input_id: impl Into<String>,
        period_ms: i64,
        window_ms: i64,
    ) -> bool {
        let job_id = job_id.into();
        let input_id = input_id.into();
        let token = match self.try_claim(&job_id) {
            Some(token) => token,
            None => return false,
        };

        let orchestrator = self.orchestrator.clone();
        let clock = Arc::clone(&self.clock);
        let active = Arc::clone(&self.active);
        let task_job_id = job_id.clone();
        tokio::spawn(async move {
            let period = std::time::Duration::from_millis(period_ms.max(0) as u64);
            loop {
                let start = clock.now_utc_ms();
                let _ = orchestrator
                    .sync(&input_id, start, start + window_ms, &token)
                    .await;

                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(period) => {}
                }
            }
            active.remove(&task_job_id);
            debug!("Recurring sync job {} stopped", task_job_id);
        });
        info!(
            "Scheduled recurring sync job {} every {} ms",
            job_id, period_ms
        );
        true
    }

    /// Cancel an in-flight job. The task observes the token at its next
    /// check point; already-applied batches stay applied.
    pub fn cancel(&self, job_id: &str) -> bool {
        match self.active.get(job_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, job_id: &str) -> bool {
        self.active.contains_key(job_id)
    }

    fn try_claim(&self, job_id: &str) -> Option<CancellationToken> {
        let token = CancellationToken::new();
        match self.active.entry(job_id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                warn!("Sync job {} already in flight, ignoring request", job_id);
                None
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(token.clone());
                Some(token)
            }
        }
    }
}
