//! Error taxonomy for the scheduling and playback engines.
//!
//! Two tiers, mirroring how failures propagate:
//! - argument/shape errors ([`ModelError`], [`ExpandError`], [`ReconcileError`])
//!   are local and fatal to the single call, never retried automatically;
//! - run-level errors ([`SyncError`]) abort the current sync run and are
//!   surfaced to observers with a numeric reason code, but never take the
//!   process down.

use thiserror::Error;

use crate::store::StoreError;

/// Invariant violations raised at value construction time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("advertisement stop {stop} precedes start {start}")]
    AdStopBeforeStart { start: i64, stop: i64 },
    #[error("program must end after it starts (start {start}, end {end})")]
    EmptyProgramWindow { start: i64, end: i64 },
}

/// Failures of a single program-expansion call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpandError {
    #[error("invalid expansion window: start {start} is after end {end}")]
    InvalidWindow { start: i64, end: i64 },
    /// A repeatable channel whose schedule sums to a non-positive duration
    /// cannot be anchored to the epoch.
    #[error("repeatable schedule has degenerate cycle duration {0} ms")]
    DegenerateCycle(i64),
}

/// Failures of a single reconciliation call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// The freshly fetched program list was empty — likely an upstream feed
    /// failure, so it is reported instead of silently producing no ops.
    #[error("fetched program list is empty")]
    NoPrograms,
}

/// Run-level sync failures, surfaced through the status channel.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("input id is missing")]
    InputIdMissing,
    #[error("sync run was cancelled")]
    Cancelled,
    #[error("channel fetch returned no channels")]
    NoChannels,
    #[error("feed returned no programs for channel {channel_id}")]
    NoPrograms { channel_id: i64 },
    #[error("content store write failed: {0}")]
    DatabaseWriteFailure(#[from] StoreError),
}

impl SyncError {
    /// Numeric reason code carried in [`SyncStatus::Error`] broadcasts.
    /// Host UIs may render or ignore these; the values are stable.
    ///
    /// [`SyncStatus::Error`]: crate::epg::SyncStatus::Error
    pub fn reason(&self) -> u32 {
        match self {
            SyncError::InputIdMissing => 1,
            SyncError::NoChannels => 2,
            SyncError::NoPrograms { .. } => 3,
            SyncError::DatabaseWriteFailure(_) => 4,
            SyncError::Cancelled => 5,
        }
    }
}

/// Typed errors from the provider-data custom-key API.
///
/// Everywhere else a malformed payload degrades to the default value; only
/// the explicit custom get/put surface reports parse failures.
#[derive(Debug, Error)]
pub enum ProviderDataError {
    #[error("malformed provider data payload: {0}")]
    Malformed(#[from] serde_json::Error),
}
