//! Program expansion: turn a channel's canonical program list into the
//! concrete instances covering a requested window.
//!
//! Repeatable channels treat their list as one cycle anchored at epoch 0,
//! so any two expansions of the same window from the same schedule produce
//! identical instances — the reconciliation engine's exact-match fast path
//! depends on this determinism.

use tracing::debug;

use crate::error::ExpandError;
use crate::model::{Program, StoredChannel};

/// Mathematical modulus: result is always in `[0, m)` for positive `m`,
/// unlike `%` which truncates toward zero for negative operands.
fn floor_mod(a: i64, m: i64) -> i64 {
    ((a % m) + m) % m
}

/// Compute the concrete program instances for `channel` covering
/// `[window_start, window_end)`.
///
/// Non-repeatable channels pass through every program overlapping the
/// window (half-open). Repeatable channels synthesize instances by walking
/// the cycle from its epoch-anchored start, shifting each emitted program
/// (and its embedded ads) to the instance's slot.
///
/// Output is chronological by construction. Every instance is stamped with
/// the channel's row id if the source program did not carry one.
///
/// # Errors
///
/// `InvalidWindow` when `window_start > window_end`; `DegenerateCycle` when
/// a repeatable schedule sums to a non-positive duration.
pub fn expand(
    channel: &StoredChannel,
    programs: &[Program],
    window_start: i64,
    window_end: i64,
) -> Result<Vec<Program>, ExpandError> {
    if window_start > window_end {
        return Err(ExpandError::InvalidWindow {
            start: window_start,
            end: window_end,
        });
    }

    if !channel.channel.provider_data().is_repeatable() {
        return Ok(programs
            .iter()
            .filter(|p| p.overlaps_window(window_start, window_end))
            .map(|p| stamp(p.clone(), channel.id))
            .collect());
    }

    let cycle_ms: i64 = programs.iter().map(Program::duration_ms).sum();
    if cycle_ms <= 0 {
        return Err(ExpandError::DegenerateCycle(cycle_ms));
    }

    // The cycle iteration containing window_start begins here. floor_mod
    // keeps the anchor correct for windows before the epoch.
    let cycle_start = window_start - floor_mod(window_start, cycle_ms);
    debug!(
        "Expanding repeatable channel {} over [{}, {}): cycle {} ms anchored at {}",
        channel.id, window_start, window_end, cycle_ms, cycle_start
    );

    let mut out = Vec::new();
    let mut cursor = cycle_start;
    let mut index = 0usize;
    while cursor < window_end {
        let source = &programs[index % programs.len()];
        let duration = source.duration_ms();
        // Iterations ending before the window still advance the cursor.
        if cursor + duration > window_start {
            out.push(stamp(source.shifted_to(cursor), channel.id));
        }
        cursor += duration;
        index += 1;
    }
    Ok(out)
}

fn stamp(program: Program, channel_id: i64) -> Program {
    if program.channel_id().is_some() {
        program
    } else {
        program.with_channel(channel_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AdKind, Advertisement, Channel, ProviderData};

    fn channel(repeatable: bool) -> StoredChannel {
        StoredChannel::new(
            42,
            Channel::new(1, "1-1", "Demo")
                .with_provider_data(ProviderData::new().with_repeatable(repeatable)),
        )
    }

    fn program(title: &str, start: i64, end: i64) -> Program {
        Program::new(title, start, end).unwrap()
    }

    #[test]
    fn floor_mod_never_negative() {
        assert_eq!(floor_mod(2_000_000, 900_000), 200_000);
        assert_eq!(floor_mod(-100, 900_000), 899_900);
        assert_eq!(floor_mod(0, 900_000), 0);
        assert_eq!(floor_mod(-1_800_000, 900_000), 0);
    }

    #[test]
    fn inverted_window_is_invalid() {
        let result = expand(&channel(false), &[], 100, 50);
        assert_eq!(
            result,
            Err(ExpandError::InvalidWindow { start: 100, end: 50 })
        );
    }

    #[test]
    fn degenerate_repeatable_schedule_is_invalid() {
        let result = expand(&channel(true), &[], 0, 1_000);
        assert_eq!(result, Err(ExpandError::DegenerateCycle(0)));
    }

    #[test]
    fn non_repeatable_passes_overlapping_programs_through() {
        // Boundary case from the half-open overlap rule: the second program
        // starts at 900000, inside the window [500000, 1000000).
        let programs = vec![program("A", 0, 900_000), program("B", 900_000, 1_800_000)];
        let out = expand(&channel(false), &programs, 500_000, 1_000_000).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title(), "A");
        assert_eq!(out[1].title(), "B");
        assert_eq!(out[0].channel_id(), Some(42));
    }

    #[test]
    fn non_repeatable_excludes_programs_outside_window() {
        let programs = vec![program("A", 0, 900_000), program("B", 900_000, 1_800_000)];
        let out = expand(&channel(false), &programs, 1_800_000, 2_000_000).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn repeatable_anchors_cycle_at_epoch() {
        // Single 15-minute program, window [2000000, 2900000):
        // cycle anchor = 2000000 - (2000000 mod 900000) = 1800000.
        let programs = vec![program("Loop", 0, 900_000)];
        let out = expand(&channel(true), &programs, 2_000_000, 2_900_000).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].start_utc_ms(), 1_800_000);
        assert_eq!(out[0].end_utc_ms(), 2_700_000);
        assert_eq!(out[1].start_utc_ms(), 2_700_000);
        assert_eq!(out[1].end_utc_ms(), 3_600_000);
    }

    #[test]
    fn repeatable_skips_iterations_before_window() {
        // Two programs per cycle (total 900000). Window starts mid-cycle so
        // the first iteration of the anchored cycle ends before the window.
        let programs = vec![program("A", 0, 300_000), program("B", 300_000, 900_000)];
        let out = expand(&channel(true), &programs, 400_000, 900_000).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title(), "B");
        assert_eq!(out[0].start_utc_ms(), 300_000);
        assert_eq!(out[0].end_utc_ms(), 900_000);
    }

    #[test]
    fn expansion_is_deterministic() {
        let programs = vec![
            program("A", 0, 600_000),
            program("B", 600_000, 900_000),
        ];
        let first = expand(&channel(true), &programs, 5_000_000, 7_000_000).unwrap();
        let second = expand(&channel(true), &programs, 5_000_000, 7_000_000).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn instances_are_gapless_within_the_window() {
        let programs = vec![
            program("A", 0, 600_000),
            program("B", 600_000, 900_000),
        ];
        let out = expand(&channel(true), &programs, 5_000_000, 7_000_000).unwrap();
        assert!(!out.is_empty());
        for pair in out.windows(2) {
            assert_eq!(pair[0].end_utc_ms(), pair[1].start_utc_ms());
        }
        for p in &out {
            assert!(p.overlaps_window(5_000_000, 7_000_000));
        }
    }

    #[test]
    fn ads_shift_with_their_program_instance() {
        let ad = Advertisement::new(300_000, 330_000, AdKind::Vast, "https://ads.example.com/v")
            .unwrap();
        let programs = vec![program("Loop", 0, 900_000)
            .with_provider_data(ProviderData::new().with_ad(ad))];

        let out = expand(&channel(true), &programs, 1_800_000, 2_700_000).unwrap();
        assert_eq!(out.len(), 1);
        let delta = out[0].start_utc_ms(); // source started at 0
        let shifted = &out[0].provider_data().ads()[0];
        assert_eq!(shifted.start_utc_ms(), 300_000 + delta);
        assert_eq!(shifted.stop_utc_ms(), 330_000 + delta);
    }

    #[test]
    fn window_before_epoch_still_anchors_cleanly() {
        let programs = vec![program("Loop", 0, 900_000)];
        let out = expand(&channel(true), &programs, -1_000_000, -100_000).unwrap();
        assert!(!out.is_empty());
        // Anchor never drifts: every instance boundary is a multiple of the
        // cycle length.
        assert_eq!(floor_mod(out[0].start_utc_ms(), 900_000), 0);
    }
}
