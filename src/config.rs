//! Engine configuration.
//!
//! All tunables default to the values the playback and sync behavior was
//! designed around; `PLAYHEAD_*` environment variables override them for
//! deployments that need different ad pacing or sync cadence. Invalid values
//! fall back to the defaults rather than failing startup.

use std::env;

/// Look-back buffer when deciding whether an ad has fully elapsed.
///
/// An ad whose stop time is within this many milliseconds of "now" is
/// treated as finished rather than re-entered.
pub const DEFAULT_AD_LOOKBACK_MS: i64 = 2_000;

/// Minimum gap between wall-clock and a stored playback position before the
/// session is classified as time-shifted. Below this, playback snaps back to
/// live. Distinct from the ad look-back buffer: the two gate different
/// decisions and are kept separately configurable.
pub const DEFAULT_TIMESHIFT_THRESHOLD_MS: i64 = 3_000;

/// Minimum wall-clock interval between on-tune channel ads, per channel.
pub const DEFAULT_CHANNEL_AD_INTERVAL_MS: i64 = 300_000;

/// Maximum number of store operations applied per atomic batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Length of the program window fetched by a recurring sync (48 hours).
pub const DEFAULT_SYNC_WINDOW_MS: i64 = 172_800_000;

/// Period between recurring sync runs (6 hours).
pub const DEFAULT_SYNC_PERIOD_MS: i64 = 21_600_000;

/// Tunable constants shared by the sync orchestrator and playback sessions.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Ad elapsed-ness look-back buffer in milliseconds.
    pub ad_lookback_ms: i64,
    /// Live-vs-time-shifted classification threshold in milliseconds.
    pub timeshift_threshold_ms: i64,
    /// Per-channel minimum interval between on-tune ads in milliseconds.
    pub channel_ad_interval_ms: i64,
    /// Store operations per atomic write batch.
    pub batch_size: usize,
    /// Program window length for recurring syncs in milliseconds.
    pub sync_window_ms: i64,
    /// Recurring sync period in milliseconds.
    pub sync_period_ms: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ad_lookback_ms: DEFAULT_AD_LOOKBACK_MS,
            timeshift_threshold_ms: DEFAULT_TIMESHIFT_THRESHOLD_MS,
            channel_ad_interval_ms: DEFAULT_CHANNEL_AD_INTERVAL_MS,
            batch_size: DEFAULT_BATCH_SIZE,
            sync_window_ms: DEFAULT_SYNC_WINDOW_MS,
            sync_period_ms: DEFAULT_SYNC_PERIOD_MS,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the environment, falling back to defaults for
    /// absent or unparseable values.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ad_lookback_ms: env_i64("PLAYHEAD_AD_LOOKBACK_MS", defaults.ad_lookback_ms),
            timeshift_threshold_ms: env_i64(
                "PLAYHEAD_TIMESHIFT_THRESHOLD_MS",
                defaults.timeshift_threshold_ms,
            ),
            channel_ad_interval_ms: env_i64(
                "PLAYHEAD_CHANNEL_AD_INTERVAL_MS",
                defaults.channel_ad_interval_ms,
            ),
            batch_size: env_usize("PLAYHEAD_BATCH_SIZE", defaults.batch_size),
            sync_window_ms: env_i64("PLAYHEAD_SYNC_WINDOW_MS", defaults.sync_window_ms),
            sync_period_ms: env_i64("PLAYHEAD_SYNC_PERIOD_MS", defaults.sync_period_ms),
        }
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
