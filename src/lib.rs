//! playhead - EPG expansion, sync and playback timeline engine for
//! streaming TV channels.
//!
//! Three cooperating pieces:
//! - `epg`: expands short repeatable program loops into concrete guide
//!   rows, reconciles fresh feed data against stored rows without
//!   disturbing what viewers are watching, and orchestrates full
//!   cancellable sync runs.
//! - `playback`: the per-session clock that schedules mid-stream ads,
//!   tracks time-shift against the live edge and gates content on
//!   parental ratings.
//! - `model` / `store` / `feed`: the channel and program data model plus
//!   the seams to the host's database and upstream feed.

pub mod clock;
pub mod config;
pub mod epg;
pub mod error;
pub mod feed;
pub mod model;
pub mod playback;
pub mod store;

pub use clock::{Clock, SystemClock};
pub use config::EngineConfig;
pub use epg::{SyncJobs, SyncObserver, SyncOrchestrator, SyncReport, SyncStatus};
pub use playback::{Session, SessionContext, SessionHandle};
