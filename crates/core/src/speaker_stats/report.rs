//! Speaker stats report rows

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ledger::LedgerEntry;
use crate::models::{ParticipantId, Roster, StatsId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeakerStatsRow {
    pub participant_id: ParticipantId,
    pub stats_id: Option<StatsId>,
    pub display_name: String,
    pub join_time: DateTime<Utc>,
    pub leave_time: Option<DateTime<Utc>>,
    pub has_left: bool,
    pub duration_ms: u64,
    /// Includes the running interval for participants still present
    pub elapsed_ms: u64,
    pub audio_muted: bool,
    pub video_muted: bool,
    pub local: bool,
    pub sessions: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpeakerStatsReport {
    pub rows: Vec<SpeakerStatsRow>,
}

impl SpeakerStatsReport {
    /// Build rows from merged entries, taking live mute state from the
    /// roster when the participant is still present
    pub fn build(entries: &[LedgerEntry], roster: &Roster, now: DateTime<Utc>) -> Self {
        let rows = entries
            .iter()
            .map(|entry| {
                let live = entry
                    .stats_id
                    .as_ref()
                    .and_then(|stats_id| roster.find_by_stats_id(stats_id));

                SpeakerStatsRow {
                    participant_id: entry.participant_id.clone(),
                    stats_id: entry.stats_id.clone(),
                    display_name: entry.display_name.clone(),
                    join_time: entry.join_time,
                    leave_time: entry.leave_time,
                    has_left: !entry.is_open(),
                    duration_ms: entry.duration_ms,
                    elapsed_ms: entry.elapsed_ms(now),
                    audio_muted: live.map_or(entry.audio_muted, |p| p.audio_muted),
                    video_muted: live.map_or(entry.video_muted, |p| p.video_muted),
                    local: entry.local,
                    sessions: entry.children.len().max(1),
                }
            })
            .collect();

        Self { rows }
    }

    /// Rows whose display name contains `query`, case-insensitively.
    /// An empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<&SpeakerStatsRow> {
        let query = query.to_lowercase();
        self.rows
            .iter()
            .filter(|row| query.is_empty() || row.display_name.to_lowercase().contains(&query))
            .collect()
    }
}

/// Format milliseconds as `HH:MM:SS`
pub fn format_elapsed(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Participant, Role};
    use chrono::{Duration, TimeZone};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(secs)
    }

    fn entry(id: &str, stats: &str, name: &str, leave: Option<i64>) -> LedgerEntry {
        let mut e = LedgerEntry::new(id.into(), Some(stats.into()), name, at(0));
        e.leave_time = leave.map(at);
        e.duration_ms = leave.map_or(0, |l| l as u64 * 1000);
        e
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "00:00:00");
        assert_eq!(format_elapsed(59_999), "00:00:59");
        assert_eq!(format_elapsed(3_661_000), "01:01:01");
        assert_eq!(format_elapsed(36_000_000), "10:00:00");
    }

    #[test]
    fn test_live_mute_state_overlays_snapshot() {
        let mut roster = Roster::new();
        let mut p = Participant::new("p1", "alice", Role::Participant).with_stats_id("s1");
        p.audio_muted = true;
        roster.add(p);

        let entries = vec![entry("p1", "s1", "alice", None), entry("p2", "s2", "bob", Some(30))];
        let report = SpeakerStatsReport::build(&entries, &roster, at(45));

        assert!(report.rows[0].audio_muted);
        assert!(!report.rows[0].has_left);
        assert_eq!(report.rows[0].elapsed_ms, 45_000);
        assert!(report.rows[1].has_left);
        assert_eq!(report.rows[1].elapsed_ms, 30_000);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let entries = vec![
            entry("p1", "s1", "Alice", None),
            entry("p2", "s2", "Bob", None),
            entry("p3", "s3", "alicia", None),
        ];
        let report = SpeakerStatsReport::build(&entries, &Roster::new(), at(0));

        assert_eq!(report.search("ALI").len(), 2);
        assert_eq!(report.search("").len(), 3);
        assert!(report.search("carol").is_empty());
    }
}
