//! Program reconciliation: diff a freshly expanded program list against the
//! rows already persisted for a channel.
//!
//! The engine distinguishes three outcomes per pair: exact match (no op),
//! metadata update (same slot, new details), and replace (delete + insert).
//! The distinction matters: an `Update` preserves the old row's identity,
//! which keeps row-attached associations such as an in-progress recording
//! alive across re-syncs. A delete/insert pair does not.

use crate::error::ReconcileError;
use crate::model::{Program, StoredProgram};

/// A single write against the program table. Operations must be applied in
/// the emitted order.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgramOp {
    Insert(Program),
    Update { id: i64, program: Program },
    Delete { id: i64 },
}

/// Default metadata-update predicate: same title and the closed intervals
/// overlap. Deliberately loose — hosts with richer identity (episode ids,
/// feed guids) should supply their own policy to [`reconcile_with`].
pub fn default_update_policy(old: &Program, new: &Program) -> bool {
    old.title() == new.title()
        && old.start_utc_ms() <= new.end_utc_ms()
        && new.start_utc_ms() <= old.end_utc_ms()
}

/// Reconcile with the default update policy.
pub fn reconcile(
    old: &[StoredProgram],
    new: &[Program],
    now_ms: i64,
) -> Result<Vec<ProgramOp>, ReconcileError> {
    reconcile_with(old, new, now_ms, default_update_policy)
}

/// Diff `old` (persisted rows, sorted by start) against `new` (freshly
/// expanded, sorted by start) and emit the ordered operation list.
///
/// Old rows that ended before `now_ms`, or before the first new program
/// starts, are skipped entirely — the store auto-purges those.
///
/// # Errors
///
/// `NoPrograms` when `new` is empty, signalling a likely upstream feed
/// failure instead of silently emitting nothing.
pub fn reconcile_with(
    old: &[StoredProgram],
    new: &[Program],
    now_ms: i64,
    should_update: impl Fn(&Program, &Program) -> bool,
) -> Result<Vec<ProgramOp>, ReconcileError> {
    if new.is_empty() {
        return Err(ReconcileError::NoPrograms);
    }
    let first_new_start = new[0].start_utc_ms();

    let mut ops = Vec::new();
    let mut old_idx = 0;
    let mut new_idx = 0;

    // Skip rows already in the past or entirely before the new window.
    while old_idx < old.len() {
        let end = old[old_idx].program.end_utc_ms();
        if end < now_ms || end < first_new_start {
            old_idx += 1;
        } else {
            break;
        }
    }

    while old_idx < old.len() && new_idx < new.len() {
        let old_row = &old[old_idx];
        let new_program = &new[new_idx];

        if old_row.program == *new_program {
            old_idx += 1;
            new_idx += 1;
        } else if should_update(&old_row.program, new_program) {
            ops.push(ProgramOp::Update {
                id: old_row.id,
                program: new_program.clone(),
            });
            old_idx += 1;
            new_idx += 1;
        } else if old_row.program.end_utc_ms() < new_program.end_utc_ms() {
            // Stale old row — drop it and give the next old row a chance.
            ops.push(ProgramOp::Delete { id: old_row.id });
            old_idx += 1;
        } else {
            ops.push(ProgramOp::Insert(new_program.clone()));
            new_idx += 1;
        }
    }

    while new_idx < new.len() {
        ops.push(ProgramOp::Insert(new[new_idx].clone()));
        new_idx += 1;
    }

    Ok(ops)
}
