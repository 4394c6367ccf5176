//! Collaborator seams for the playback session.
//!
//! The decoding/rendering pipeline is opaque to the engine: it only drives
//! transport controls and reads back position. Every call site tolerates
//! the player being absent — a session without a player still advances its
//! timeline and bookkeeping.

use crate::model::{Advertisement, ContentRating, Program, VideoLocator};

/// Transport controls of the opaque player collaborator.
pub trait Player: Send + Sync {
    /// Point the player at a new media source.
    fn load(&self, video: &VideoLocator);
    fn play(&self);
    fn pause(&self);
    fn stop(&self);
    fn release(&self);
    /// Seek within the loaded media, in player-relative milliseconds.
    fn seek_to(&self, position_ms: i64);
    fn set_volume(&self, volume: f32);
    fn set_playback_speed(&self, speed: f32);
    /// Current player-relative position in milliseconds. Authoritative for
    /// elapsed program time once playback has started.
    fn position_ms(&self) -> i64;
    fn duration_ms(&self) -> i64;
}

/// Push-style player state changes fed back into the session queue.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    Started,
    Buffering,
    Ready,
    Ended,
    Error(String),
}

/// Host-side notifications emitted by a session.
///
/// Ad rendering happens host-side on a separate sub-player: the session
/// asks for an ad via `on_play_ad` and learns about completion through
/// [`SessionHandle::notify_ad_completed`].
///
/// [`SessionHandle::notify_ad_completed`]: crate::playback::SessionHandle::notify_ad_completed
pub trait SessionCallback: Send + Sync {
    /// An ad must start now, `clip_offset_ms` into the creative (non-zero
    /// when tuning mid-ad).
    fn on_play_ad(&self, ad: &Advertisement, clip_offset_ms: i64);
    /// Tear down any ad sub-player left over from previous content.
    fn on_release_ad_player(&self);
    /// The current content is blocked by the given rating. The player has
    /// already been reset when this fires — no blocked frame renders.
    fn on_content_blocked(&self, rating: &ContentRating);
    /// A previously blocked rating was cleared; content is playing again.
    fn on_content_allowed(&self);
    /// Program content started (or restarted) at the given elapsed offset.
    fn on_play_program(&self, program: &Program, start_position_ms: i64);
    /// No content can play right now.
    fn on_video_unavailable(&self, reason: &str);
}

/// Parental-control policy collaborator.
pub trait RatingPolicy: Send + Sync {
    fn is_blocked(&self, rating: &ContentRating) -> bool;
}

/// Policy that blocks nothing.
pub struct AllowAll;

impl RatingPolicy for AllowAll {
    fn is_blocked(&self, _rating: &ContentRating) -> bool {
        false
    }
}
