//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use crate::follow_me::{FollowMeState, FollowerMode};
use crate::models::Roster;
use crate::speaker_stats::LedgerEntry;

/// Validate a merged ledger
pub fn assert_ledger_invariants(entries: &[LedgerEntry]) {
    for entry in entries {
        if let Some(leave) = entry.leave_time {
            debug_assert!(
                leave >= entry.join_time,
                "Ledger entry {} left at {} before joining at {}",
                entry.participant_id,
                leave,
                entry.join_time
            );
        }

        // children are raw intervals; the merged duration can only be their
        // sum minus overlap
        let children_total: u64 = entry.children.iter().map(|c| c.duration_ms).sum();
        debug_assert!(
            entry.children.is_empty() || entry.duration_ms <= children_total,
            "Ledger entry {} has duration {} above its intervals' total {}",
            entry.participant_id,
            entry.duration_ms,
            children_total
        );
    }
}

/// Validate that follower mode and the exposed state agree
pub fn assert_follow_me_invariants(mode: &FollowerMode, state: &FollowMeState) {
    match mode {
        FollowerMode::Idle => debug_assert!(
            state.moderator_id.is_none(),
            "Idle follower still names moderator {:?}",
            state.moderator_id
        ),
        FollowerMode::Following(id) => debug_assert!(
            state.moderator_id.as_ref() == Some(id),
            "Following {} but state names {:?}",
            id,
            state.moderator_id
        ),
    }
}

/// Validate that a roster is consistent
pub fn assert_roster_invariants(roster: &Roster) {
    let local_count = roster.participants().iter().filter(|p| p.local).count();
    debug_assert!(
        local_count <= 1,
        "Roster has {} local participants, expected 0 or 1",
        local_count
    );

    if let Some(pinned) = roster.pinned() {
        debug_assert!(
            roster.contains(pinned),
            "Pinned participant {} is not in the roster",
            pinned
        );
    }
}
