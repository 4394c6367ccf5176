//! Electronic-program-guide engines: window expansion, three-way
//! reconciliation against persisted rows, and the sync orchestrator that
//! drives both across a channel lineup.

pub mod expand;
pub mod jobs;
pub mod reconcile;
pub mod sync;

pub use expand::expand;
pub use jobs::SyncJobs;
pub use reconcile::{default_update_policy, reconcile, reconcile_with, ProgramOp};
pub use sync::{NullObserver, SyncObserver, SyncOrchestrator, SyncReport, SyncStatus};
