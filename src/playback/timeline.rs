//! Pure timeline arithmetic for the session clock.
//!
//! Everything here is a function of explicit inputs so the subtle cases —
//! the look-back buffer around ad boundaries, the live-edge hysteresis,
//! the player-position-driven recomputation on resume — are testable
//! without an actor or timers.

use crate::model::{Advertisement, Program};

/// Sentinel for "playing at the live edge" (no time-shift position set).
pub const LIVE: i64 = i64::MIN;

/// Resolve the session's effective "current time".
///
/// Returns `(time, is_live)`. A stored time-shift position only counts as
/// shifted once it trails wall-clock by more than `threshold_ms`; inside
/// that band the session snaps back to live. The hysteresis prevents
/// oscillation right at the live edge.
pub fn effective_time(now_ms: i64, timeshift_pos_ms: i64, threshold_ms: i64) -> (i64, bool) {
    if timeshift_pos_ms == LIVE {
        return (now_ms, true);
    }
    if now_ms - timeshift_pos_ms > threshold_ms {
        (timeshift_pos_ms, false)
    } else {
        (now_ms, true)
    }
}

/// Sum of durations of every ad that has fully elapsed by time `t`.
///
/// An ad counts as elapsed once its stop time is at or before
/// `t + lookback_ms`: one that just barely finished is treated as fully
/// watched rather than re-entered.
pub fn elapsed_ad_ms(ads: &[Advertisement], t: i64, lookback_ms: i64) -> i64 {
    ads.iter()
        .filter(|ad| ad.stop_utc_ms() <= t + lookback_ms)
        .map(Advertisement::duration_ms)
        .sum()
}

/// The next ad that still needs to play at time `t`: the earliest ad not
/// yet elapsed. Its start may already be in the past (tuning mid-ad), in
/// which case the caller plays it immediately, clipped.
pub fn next_ad(ads: &[Advertisement], t: i64, lookback_ms: i64) -> Option<&Advertisement> {
    ads.iter().find(|ad| ad.stop_utc_ms() > t + lookback_ms)
}

/// Elapsed program time at `t`: naive wall progress minus elapsed ad time,
/// clamped at zero.
pub fn elapsed_program_ms(program: &Program, t: i64, lookback_ms: i64) -> i64 {
    let ads = program.provider_data().ads();
    (t - program.start_utc_ms() - elapsed_ad_ms(ads, t, lookback_ms)).max(0)
}

/// Recompute the timeline from the player's reported position.
///
/// Once playing, the player's position is authoritative for elapsed program
/// time. Walking the ad list in order, an ad counts as elapsed when its
/// scheduled playback completed before the virtual position implied by the
/// ads counted so far. Returns `(elapsed_ad_ms, virtual_time)` where
/// `virtual_time = program.start + player_position + elapsed_ad_ms`.
pub fn from_player_position(
    program: &Program,
    player_position_ms: i64,
    lookback_ms: i64,
) -> (i64, i64) {
    let mut elapsed_ads = 0;
    for ad in program.provider_data().ads() {
        let virtual_t = program.start_utc_ms() + player_position_ms + elapsed_ads;
        if ad.stop_utc_ms() <= virtual_t + lookback_ms {
            elapsed_ads += ad.duration_ms();
        }
    }
    (
        elapsed_ads,
        program.start_utc_ms() + player_position_ms + elapsed_ads,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AdKind, ProviderData};

    const LOOKBACK: i64 = 2_000;
    const THRESHOLD: i64 = 3_000;

    fn ad(start: i64, stop: i64) -> Advertisement {
        Advertisement::new(start, stop, AdKind::Vast, "https://ads.example.com/v").unwrap()
    }

    fn program_with_ads(start: i64, end: i64, ads: Vec<Advertisement>) -> Program {
        let mut data = ProviderData::new();
        for a in ads {
            data = data.with_ad(a);
        }
        Program::new("Movie", start, end)
            .unwrap()
            .with_provider_data(data)
    }

    // ── effective_time ───────────────────────────────────────────────────

    #[test]
    fn live_sentinel_uses_wall_clock() {
        assert_eq!(effective_time(10_000, LIVE, THRESHOLD), (10_000, true));
    }

    #[test]
    fn position_beyond_threshold_is_shifted() {
        assert_eq!(effective_time(10_000, 5_000, THRESHOLD), (5_000, false));
    }

    #[test]
    fn position_within_threshold_snaps_to_live() {
        // 2500ms behind live is inside the 3000ms hysteresis band.
        assert_eq!(effective_time(10_000, 7_500, THRESHOLD), (10_000, true));
        // Exactly at the threshold still counts as live.
        assert_eq!(effective_time(10_000, 7_000, THRESHOLD), (10_000, true));
    }

    // ── elapsed_ad_ms / next_ad ──────────────────────────────────────────

    #[test]
    fn ad_just_finished_counts_as_elapsed() {
        // Stop 1500ms ago is inside the 2000ms look-back buffer... and so is
        // a stop 2000ms in the future.
        let ads = vec![ad(0, 8_500)];
        assert_eq!(elapsed_ad_ms(&ads, 10_000, LOOKBACK), 8_500);
        let ads = vec![ad(0, 12_000)];
        assert_eq!(elapsed_ad_ms(&ads, 10_000, LOOKBACK), 12_000);
    }

    #[test]
    fn running_ad_is_not_elapsed_and_is_next() {
        // An ad spanning [now-5000, now+5000) with the 2000ms look-back is
        // still "now playing".
        let now = 100_000;
        let ads = vec![ad(now - 5_000, now + 5_000)];
        assert_eq!(elapsed_ad_ms(&ads, now, LOOKBACK), 0);
        let next = next_ad(&ads, now, LOOKBACK).expect("mid-ad tune must yield the ad");
        assert_eq!(next.start_utc_ms(), now - 5_000);
    }

    #[test]
    fn next_ad_skips_elapsed_entries() {
        let ads = vec![ad(0, 1_000), ad(50_000, 60_000)];
        let next = next_ad(&ads, 10_000, LOOKBACK).unwrap();
        assert_eq!(next.start_utc_ms(), 50_000);
    }

    #[test]
    fn no_next_ad_when_all_elapsed() {
        let ads = vec![ad(0, 1_000)];
        assert!(next_ad(&ads, 10_000, LOOKBACK).is_none());
    }

    // ── elapsed_program_ms ───────────────────────────────────────────────

    #[test]
    fn ad_time_is_subtracted_from_program_time() {
        let program = program_with_ads(0, 900_000, vec![ad(100_000, 130_000)]);
        // At t=200000 the 30s ad has elapsed: 200000 - 30000 = 170000.
        assert_eq!(elapsed_program_ms(&program, 200_000, LOOKBACK), 170_000);
    }

    #[test]
    fn elapsed_program_never_negative() {
        let program = program_with_ads(0, 900_000, vec![ad(0, 50_000)]);
        assert_eq!(elapsed_program_ms(&program, 10_000, LOOKBACK), 10_000);
        // t=49000: ad counts as elapsed (stop 50000 <= 49000+2000) but only
        // 49000ms of wall time passed — clamp instead of going negative.
        assert_eq!(elapsed_program_ms(&program, 49_000, LOOKBACK), 0);
    }

    // ── from_player_position ─────────────────────────────────────────────

    #[test]
    fn player_position_before_any_ad() {
        let program = program_with_ads(1_000_000, 1_900_000, vec![ad(1_300_000, 1_330_000)]);
        let (ads_ms, virtual_t) = from_player_position(&program, 100_000, LOOKBACK);
        assert_eq!(ads_ms, 0);
        assert_eq!(virtual_t, 1_100_000);
    }

    #[test]
    fn player_position_past_an_ad_accumulates_it() {
        let program = program_with_ads(1_000_000, 1_900_000, vec![ad(1_300_000, 1_330_000)]);
        // 400000ms of content: virtual time passes the ad slot, so the ad
        // counts and virtual time includes its duration.
        let (ads_ms, virtual_t) = from_player_position(&program, 400_000, LOOKBACK);
        assert_eq!(ads_ms, 30_000);
        assert_eq!(virtual_t, 1_430_000);
    }

    #[test]
    fn consecutive_ads_accumulate_in_order() {
        let program = program_with_ads(
            0,
            900_000,
            vec![ad(100_000, 130_000), ad(130_000, 160_000)],
        );
        let (ads_ms, virtual_t) = from_player_position(&program, 200_000, LOOKBACK);
        assert_eq!(ads_ms, 60_000);
        assert_eq!(virtual_t, 260_000);
    }
}
