//! Content-store collaborator.
//!
//! The platform database is external; the engine talks to it through
//! [`ContentStore`]. [`MemoryStore`] is the built-in backend used by demos
//! and tests — it honors the same contract, including atomic batch applies.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::epg::ProgramOp;
use crate::model::{Channel, Program, RecordedProgram, StoredChannel, StoredProgram};

/// Store-level failures. A batch failure leaves the store exactly as it was
/// before the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("batch write rejected: {0}")]
    BatchRejected(String),
    #[error("channel row {0} not found")]
    ChannelNotFound(i64),
    #[error("program row {0} not found")]
    ProgramNotFound(i64),
}

/// Tabular channel/program storage keyed by store-assigned row ids.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// All channels belonging to `input_id`, in store-assigned row order.
    async fn channels_for_input(&self, input_id: &str) -> Result<Vec<StoredChannel>, StoreError>;

    /// Look up one channel row.
    async fn channel(&self, id: i64) -> Result<Option<StoredChannel>, StoreError>;

    async fn insert_channel(&self, channel: Channel) -> Result<i64, StoreError>;

    async fn update_channel(&self, id: i64, channel: Channel) -> Result<(), StoreError>;

    async fn delete_channel(&self, id: i64) -> Result<(), StoreError>;

    /// All programs for a channel, ordered by start time.
    async fn programs_for_channel(&self, channel_id: i64) -> Result<Vec<StoredProgram>, StoreError>;

    /// The program airing on `channel_id` at `at_ms`, if any.
    async fn program_at(
        &self,
        channel_id: i64,
        at_ms: i64,
    ) -> Result<Option<StoredProgram>, StoreError>;

    /// Apply one reconciliation batch atomically, in the given order.
    /// Either every operation lands or none does.
    async fn apply_program_ops(
        &self,
        channel_id: i64,
        ops: &[ProgramOp],
    ) -> Result<(), StoreError>;

    /// Look up recorded-program metadata.
    async fn recorded_program(&self, id: i64) -> Result<Option<RecordedProgram>, StoreError>;
}

#[derive(Default)]
struct MemoryInner {
    next_id: i64,
    channels: BTreeMap<i64, Channel>,
    programs: BTreeMap<i64, (i64, Program)>,
    recordings: BTreeMap<i64, RecordedProgram>,
}

impl MemoryInner {
    fn alloc_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory [`ContentStore`] backend.
///
/// Batches are applied under one lock, which gives the all-or-nothing
/// semantics for free: operations are validated against a staged copy and
/// only committed as a whole.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a recording row (row id is store-assigned, as with channels).
    pub fn insert_recording(&self, recording: RecordedProgram) -> i64 {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        let id = inner.alloc_id();
        inner.recordings.insert(id, recording);
        id
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn channels_for_input(&self, input_id: &str) -> Result<Vec<StoredChannel>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .channels
            .iter()
            .filter(|(_, c)| c.input_id() == Some(input_id))
            .map(|(id, c)| StoredChannel::new(*id, c.clone()))
            .collect())
    }

    async fn channel(&self, id: i64) -> Result<Option<StoredChannel>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .channels
            .get(&id)
            .map(|c| StoredChannel::new(id, c.clone())))
    }

    async fn insert_channel(&self, channel: Channel) -> Result<i64, StoreError> {
        let mut inner = self.lock();
        let id = inner.alloc_id();
        inner.channels.insert(id, channel);
        Ok(id)
    }

    async fn update_channel(&self, id: i64, channel: Channel) -> Result<(), StoreError> {
        let mut inner = self.lock();
        match inner.channels.get_mut(&id) {
            Some(slot) => {
                *slot = channel;
                Ok(())
            }
            None => Err(StoreError::ChannelNotFound(id)),
        }
    }

    async fn delete_channel(&self, id: i64) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.channels.remove(&id).is_none() {
            return Err(StoreError::ChannelNotFound(id));
        }
        // Programs cascade with their channel.
        inner.programs.retain(|_, (channel_id, _)| *channel_id != id);
        Ok(())
    }

    async fn programs_for_channel(
        &self,
        channel_id: i64,
    ) -> Result<Vec<StoredProgram>, StoreError> {
        let inner = self.lock();
        let mut rows: Vec<StoredProgram> = inner
            .programs
            .iter()
            .filter(|(_, (cid, _))| *cid == channel_id)
            .map(|(id, (_, p))| StoredProgram::new(*id, p.clone()))
            .collect();
        rows.sort_by_key(|row| (row.program.start_utc_ms(), row.id));
        Ok(rows)
    }

    async fn program_at(
        &self,
        channel_id: i64,
        at_ms: i64,
    ) -> Result<Option<StoredProgram>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .programs
            .iter()
            .find(|(_, (cid, p))| {
                *cid == channel_id && p.start_utc_ms() <= at_ms && at_ms < p.end_utc_ms()
            })
            .map(|(id, (_, p))| StoredProgram::new(*id, p.clone())))
    }

    async fn apply_program_ops(
        &self,
        channel_id: i64,
        ops: &[ProgramOp],
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();

        // Validate the whole batch before touching anything.
        for op in ops {
            match op {
                ProgramOp::Update { id, .. } | ProgramOp::Delete { id } => {
                    if !inner.programs.contains_key(id) {
                        return Err(StoreError::ProgramNotFound(*id));
                    }
                }
                ProgramOp::Insert(_) => {}
            }
        }

        for op in ops {
            match op {
                ProgramOp::Insert(program) => {
                    let id = inner.alloc_id();
                    inner.programs.insert(id, (channel_id, program.clone()));
                }
                ProgramOp::Update { id, program } => {
                    inner.programs.insert(*id, (channel_id, program.clone()));
                }
                ProgramOp::Delete { id } => {
                    inner.programs.remove(id);
                }
            }
        }
        Ok(())
    }

    async fn recorded_program(&self, id: i64) -> Result<Option<RecordedProgram>, StoreError> {
        let inner = self.lock();
        Ok(inner.recordings.get(&id).cloned())
    }
}
