//! Playback domain: the per-session timeline clock, the opaque player
//! seam, and the cross-session ad bookkeeping.

pub mod ad_tracker;
pub mod player;
pub mod session;
pub mod timeline;

pub use ad_tracker::ChannelAdTracker;
pub use player::{AllowAll, Player, PlayerEvent, RatingPolicy, SessionCallback};
pub use session::{Session, SessionContext, SessionHandle};
pub use timeline::LIVE;
