//! Interval arithmetic and the raw-log merge

use chrono::{DateTime, Utc};
use tracing::debug;

use super::ledger::LedgerEntry;
use crate::invariants::assert_ledger_invariants;

fn millis_between(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    (to - from).num_milliseconds().max(0) as u64
}

/// Length of the entry's current interval in milliseconds.
///
/// Measured from the last rejoin if there was one. Open entries have no
/// duration yet.
pub fn get_duration(entry: &LedgerEntry) -> u64 {
    match entry.leave_time {
        Some(leave) => millis_between(entry.last_join_time.unwrap_or(entry.join_time), leave),
        None => 0,
    }
}

/// Wall-clock time covered by both intervals, in milliseconds
pub fn get_overlap(a: &LedgerEntry, b: &LedgerEntry) -> u64 {
    let (Some(a_leave), Some(b_leave)) = (a.leave_time, b.leave_time) else {
        return 0;
    };
    let end = a_leave.min(b_leave);
    let start = a.join_time.max(b.join_time);
    millis_between(start, end)
}

/// Reduce raw intervals to one reconciled entry per `stats_id`.
///
/// Records are folded in list order:
///
/// | existing | incoming | result                                         |
/// |----------|----------|------------------------------------------------|
/// | none     | any      | appended                                       |
/// | closed   | closed   | duration += incoming - overlap, leave = latest |
/// | closed   | open     | resumed: `last_join_time` = incoming join      |
/// | open     | open     | appended as a separate entry                   |
/// | open     | closed   | incoming dropped                               |
///
/// Records without a `stats_id` are never merged. The input is not modified.
pub fn merge(raw: &[LedgerEntry]) -> Vec<LedgerEntry> {
    let mut merged: Vec<LedgerEntry> = Vec::with_capacity(raw.len());

    for record in raw {
        let mut item = record.clone();
        item.children.clear();
        item.duration_ms = get_duration(&item);

        let Some(stats_id) = item.stats_id.as_ref() else {
            merged.push(item);
            continue;
        };

        let Some(index) = merged
            .iter()
            .position(|e| e.stats_id.as_ref() == Some(stats_id))
        else {
            merged.push(item);
            continue;
        };

        match (merged[index].leave_time, item.leave_time) {
            (Some(found_leave), Some(item_leave)) => {
                let found = &mut merged[index];
                let overlap = get_overlap(found, &item);
                remember_first_interval(found);
                found.duration_ms += item.duration_ms.saturating_sub(overlap);
                found.leave_time = Some(found_leave.max(item_leave));
                adopt(found, &item);
                found.children.push(item);
            }
            (Some(_), None) => {
                let found = &mut merged[index];
                remember_first_interval(found);
                found.last_join_time = Some(item.join_time);
                found.leave_time = None;
                adopt(found, &item);
                found.children.push(item);
            }
            (None, None) => merged.push(item),
            (None, Some(_)) => {
                debug!(stats_id = %stats_id, "Dropping stale closed interval");
            }
        }
    }

    assert_ledger_invariants(&merged);
    merged
}

fn remember_first_interval(entry: &mut LedgerEntry) {
    if entry.children.is_empty() {
        let first = entry.clone();
        entry.children.push(first);
    }
}

fn adopt(found: &mut LedgerEntry, item: &LedgerEntry) {
    found.participant_id = item.participant_id.clone();
    found.display_name = item.display_name.clone();
    found.audio_muted = item.audio_muted;
    found.video_muted = item.video_muted;
}
