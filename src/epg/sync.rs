//! Sync orchestrator: pulls the channel lineup and program schedules from
//! the feed, reconciles them against the content store, and reports
//! progress through a publish-style status channel.
//!
//! One run is one cancellable task. Cancellation is observed between
//! channels and between write batches; batches already applied stay
//! applied. A store write failure aborts the whole run — continuing would
//! leave later channels reconciled against state the earlier failure
//! invalidated.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::epg::expand::expand;
use crate::epg::reconcile::{reconcile, ProgramOp};
use crate::error::{ReconcileError, SyncError};
use crate::feed::FeedSource;
use crate::model::StoredChannel;
use crate::store::ContentStore;

/// Status broadcasts consumed by host UIs. Field names and variants are a
/// stable contract.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncStatus {
    Started {
        input_id: String,
    },
    Scanned {
        input_id: String,
        channels_scanned: usize,
        total_channels: usize,
        channel_name: String,
        channel_number: String,
    },
    Finished {
        input_id: String,
        report: SyncReport,
    },
    Error {
        input_id: String,
        reason: u32,
    },
}

/// Publish-style sink for [`SyncStatus`] events.
pub trait SyncObserver: Send + Sync {
    fn on_status(&self, status: SyncStatus);
}

/// Observer that drops every status event.
pub struct NullObserver;

impl SyncObserver for NullObserver {
    fn on_status(&self, _status: SyncStatus) {}
}

/// Summary of one completed sync run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub total_channels: usize,
    pub channels_scanned: usize,
    pub channels_inserted: usize,
    pub channels_updated: usize,
    pub channels_deleted: usize,
    pub programs_inserted: usize,
    pub programs_updated: usize,
    pub programs_deleted: usize,
    /// Channels whose program fetch came back empty or failed this run.
    pub channels_without_programs: usize,
}

/// Drives a full channel + program sync against the store.
#[derive(Clone)]
pub struct SyncOrchestrator {
    store: Arc<dyn ContentStore>,
    feed: Arc<dyn FeedSource>,
    observer: Arc<dyn SyncObserver>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl SyncOrchestrator {
    pub fn new(
        store: Arc<dyn ContentStore>,
        feed: Arc<dyn FeedSource>,
        observer: Arc<dyn SyncObserver>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            feed,
            observer,
            clock,
            config,
        }
    }

    /// Run one sync over `[window_start, window_end)`.
    ///
    /// Emits `Started` first, then one `Scanned` per channel, and finally
    /// either `Finished` or `Error` with the failure's reason code.
    pub async fn sync(
        &self,
        input_id: &str,
        window_start: i64,
        window_end: i64,
        token: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        self.observer.on_status(SyncStatus::Started {
            input_id: input_id.to_string(),
        });

        match self.run(input_id, window_start, window_end, token).await {
            Ok(report) => {
                info!(
                    "Sync finished for {}: {}/{} channels, {} inserts / {} updates / {} deletes",
                    input_id,
                    report.channels_scanned,
                    report.total_channels,
                    report.programs_inserted,
                    report.programs_updated,
                    report.programs_deleted
                );
                self.observer.on_status(SyncStatus::Finished {
                    input_id: input_id.to_string(),
                    report: report.clone(),
                });
                Ok(report)
            }
            Err(e) => {
                warn!("Sync failed for {}: {}", input_id, e);
                self.observer.on_status(SyncStatus::Error {
                    input_id: input_id.to_string(),
                    reason: e.reason(),
                });
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        input_id: &str,
        window_start: i64,
        window_end: i64,
        token: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        if input_id.is_empty() {
            return Err(SyncError::InputIdMissing);
        }

        let mut report = SyncReport::default();

        let fetched = self.feed.channels().await.map_err(|e| {
            warn!("Channel fetch failed: {}", e);
            SyncError::NoChannels
        })?;
        if fetched.is_empty() {
            return Err(SyncError::NoChannels);
        }

        self.reconcile_channels(input_id, fetched, &mut report)
            .await?;

        // Re-read so programs attach to store-assigned rows, in store order.
        let channels = self.store.channels_for_input(input_id).await?;
        report.total_channels = channels.len();

        for stored in &channels {
            if token.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            self.sync_channel(input_id, stored, window_start, window_end, token, &mut report)
                .await?;

            report.channels_scanned += 1;
            self.observer.on_status(SyncStatus::Scanned {
                input_id: input_id.to_string(),
                channels_scanned: report.channels_scanned,
                total_channels: report.total_channels,
                channel_name: stored.channel.display_name().to_string(),
                channel_number: stored.channel.display_number().to_string(),
            });
        }

        Ok(report)
    }

    /// Three-way channel reconciliation keyed on `original_network_id`:
    /// insert new, update matching, delete persisted rows the feed no
    /// longer carries.
    async fn reconcile_channels(
        &self,
        input_id: &str,
        fetched: Vec<crate::model::Channel>,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let existing = self.store.channels_for_input(input_id).await?;
        let mut by_network_id: HashMap<i32, StoredChannel> = existing
            .into_iter()
            .map(|sc| (sc.channel.original_network_id(), sc))
            .collect();

        for channel in fetched {
            let channel = channel.with_sync_defaults(input_id);
            match by_network_id.remove(&channel.original_network_id()) {
                Some(stored) => {
                    if stored.channel != channel {
                        self.store.update_channel(stored.id, channel).await?;
                        report.channels_updated += 1;
                    }
                }
                None => {
                    self.store.insert_channel(channel).await?;
                    report.channels_inserted += 1;
                }
            }
        }

        for (_, stale) in by_network_id {
            debug!(
                "Deleting channel {} ({}) no longer in feed",
                stale.id,
                stale.channel.display_name()
            );
            self.store.delete_channel(stale.id).await?;
            report.channels_deleted += 1;
        }

        Ok(())
    }

    async fn sync_channel(
        &self,
        input_id: &str,
        stored: &StoredChannel,
        window_start: i64,
        window_end: i64,
        token: &CancellationToken,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let programs = match self
            .feed
            .programs_for_channel(stored, window_start, window_end)
            .await
        {
            Ok(programs) => programs,
            Err(e) => {
                // A single channel with a broken feed should not starve the
                // rest of the lineup; report and move on.
                warn!(
                    "Program fetch failed for channel {} ({}): {}",
                    stored.id,
                    stored.channel.display_name(),
                    e
                );
                self.report_no_programs(input_id, stored.id, report);
                return Ok(());
            }
        };

        let expanded = match expand(stored, &programs, window_start, window_end) {
            Ok(expanded) => expanded,
            Err(e) => {
                warn!(
                    "Expansion failed for channel {} ({}): {}",
                    stored.id,
                    stored.channel.display_name(),
                    e
                );
                self.report_no_programs(input_id, stored.id, report);
                return Ok(());
            }
        };

        let persisted = self.store.programs_for_channel(stored.id).await?;
        let ops = match reconcile(&persisted, &expanded, self.clock.now_utc_ms()) {
            Ok(ops) => ops,
            Err(ReconcileError::NoPrograms) => {
                self.report_no_programs(input_id, stored.id, report);
                return Ok(());
            }
        };

        debug!(
            "Channel {} ({}): {} reconciliation ops",
            stored.id,
            stored.channel.display_name(),
            ops.len()
        );

        // Bounded batches to respect store operation-size limits; failure of
        // one batch aborts the whole run.
        for batch in ops.chunks(self.config.batch_size) {
            if token.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            self.store.apply_program_ops(stored.id, batch).await?;
            for op in batch {
                match op {
                    ProgramOp::Insert(_) => report.programs_inserted += 1,
                    ProgramOp::Update { .. } => report.programs_updated += 1,
                    ProgramOp::Delete { .. } => report.programs_deleted += 1,
                }
            }
        }

        Ok(())
    }

    fn report_no_programs(&self, input_id: &str, channel_id: i64, report: &mut SyncReport) {
        report.channels_without_programs += 1;
        self.observer.on_status(SyncStatus::Error {
            input_id: input_id.to_string(),
            reason: SyncError::NoPrograms { channel_id }.reason(),
        });
    }
}
