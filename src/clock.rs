//! Wall-clock abstraction.
//!
//! The playback timeline and the reconciliation engine both reason about
//! "now" in UTC milliseconds. Injecting the clock keeps every temporal edge
//! case reproducible in tests.

/// Source of the current UTC time in milliseconds since the epoch.
pub trait Clock: Send + Sync + 'static {
    fn now_utc_ms(&self) -> i64;
}

/// Production clock backed by the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
