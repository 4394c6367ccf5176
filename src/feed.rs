//! Feed collaborator: the upstream source of canonical channel and program
//! data. Implementations (XMLTV fetchers, static demo schedules, test fakes)
//! live with the host; the engine only consumes this trait.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Channel, Program, StoredChannel};

/// A typed feed failure carrying a caller-defined reason code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (reason {code})")]
pub struct FeedError {
    pub code: i32,
    pub message: String,
}

impl FeedError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Source of canonical channel and program lists.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the full channel lineup.
    async fn channels(&self) -> Result<Vec<Channel>, FeedError>;

    /// Fetch the canonical program list for one persisted channel over
    /// `[start_ms, end_ms)`. For repeatable channels this is the single
    /// cycle the expansion engine loops; the list must be ordered by start
    /// time.
    async fn programs_for_channel(
        &self,
        channel: &StoredChannel,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<Program>, FeedError>;
}
