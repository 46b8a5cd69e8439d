//! Raw attendance log and its merged view

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::merge::{get_duration, merge};
use crate::models::{Participant, ParticipantId, StatsId};

/// One attendance interval, raw or merged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Ephemeral id of the connection that produced this interval
    pub participant_id: ParticipantId,
    pub stats_id: Option<StatsId>,
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub local: bool,
    pub join_time: DateTime<Utc>,
    /// Set when a closed interval resumes
    #[serde(default)]
    pub last_join_time: Option<DateTime<Utc>>,
    /// `None` while still connected
    #[serde(default)]
    pub leave_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub audio_muted: bool,
    #[serde(default)]
    pub video_muted: bool,
    /// Raw intervals folded into this entry by a merge
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LedgerEntry>,
}

impl LedgerEntry {
    pub fn new(
        participant_id: ParticipantId,
        stats_id: Option<StatsId>,
        display_name: impl Into<String>,
        join_time: DateTime<Utc>,
    ) -> Self {
        Self {
            participant_id,
            stats_id,
            display_name: display_name.into(),
            email: None,
            local: false,
            join_time,
            last_join_time: None,
            leave_time: None,
            duration_ms: 0,
            audio_muted: false,
            video_muted: false,
            children: Vec::new(),
        }
    }

    /// Open interval for a participant joining now
    pub fn joined(participant: &Participant, now: DateTime<Utc>) -> Self {
        Self {
            email: participant.email.clone(),
            local: participant.local,
            audio_muted: participant.audio_muted,
            video_muted: participant.video_muted,
            ..Self::new(
                participant.id.clone(),
                participant.stats_id.clone(),
                participant.display_name.clone(),
                now,
            )
        }
    }

    pub fn is_open(&self) -> bool {
        self.leave_time.is_none()
    }

    /// Start of the interval that is currently running or last closed
    fn interval_start(&self) -> DateTime<Utc> {
        self.last_join_time.unwrap_or(self.join_time)
    }

    /// Pull a leave time that precedes the join up to the join
    fn clamp_leave(&mut self) {
        let start = self.interval_start();
        if let Some(leave) = self.leave_time.filter(|leave| *leave < start) {
            warn!(
                participant_id = %self.participant_id,
                %leave,
                join = %start,
                "Leave time before join, clamping"
            );
            self.leave_time = Some(start);
        }
    }

    /// Stored duration plus, for open entries, time since the last join
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        if !self.is_open() {
            return self.duration_ms;
        }
        let since = self.interval_start();
        self.duration_ms + (now - since).num_milliseconds().max(0) as u64
    }
}

/// Field updates for the most recent raw interval of a participant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPatch {
    pub display_name: Option<String>,
    pub leave_time: Option<DateTime<Utc>>,
    pub audio_muted: Option<bool>,
    pub video_muted: Option<bool>,
}

/// Speaker-activity ledger, one per conference session.
///
/// Every mutation republishes the merged view wholesale.
#[derive(Debug, Clone, Default)]
pub struct SpeakerLedger {
    raw: Vec<LedgerEntry>,
    merged: Vec<LedgerEntry>,
}

impl SpeakerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merged entries for the report
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.merged
    }

    /// Raw intervals in arrival order
    pub fn raw(&self) -> &[LedgerEntry] {
        &self.raw
    }

    /// Replace the raw log, e.g. with a previously stored one
    pub fn load(&mut self, mut raw: Vec<LedgerEntry>) -> &[LedgerEntry] {
        raw.iter_mut().for_each(LedgerEntry::clamp_leave);
        self.raw = raw;
        self.publish()
    }

    pub fn record_join(&mut self, participant: &Participant, now: DateTime<Utc>) -> &[LedgerEntry] {
        debug!(participant_id = %participant.id, "Recording join");
        self.raw.push(LedgerEntry::joined(participant, now));
        self.publish()
    }

    /// Close the participant's interval. Returns false if it was never recorded.
    pub fn record_leave(&mut self, id: &ParticipantId, now: DateTime<Utc>) -> bool {
        self.update(
            id,
            EntryPatch {
                leave_time: Some(now),
                ..Default::default()
            },
        )
    }

    /// Assign fields to the participant's most recent raw interval
    pub fn update(&mut self, id: &ParticipantId, patch: EntryPatch) -> bool {
        let Some(entry) = self.raw.iter_mut().rev().find(|e| &e.participant_id == id) else {
            debug!(participant_id = %id, "No ledger entry to update");
            return false;
        };

        if let Some(name) = patch.display_name {
            entry.display_name = name;
        }
        if let Some(audio_muted) = patch.audio_muted {
            entry.audio_muted = audio_muted;
        }
        if let Some(video_muted) = patch.video_muted {
            entry.video_muted = video_muted;
        }
        if let Some(leave) = patch.leave_time.filter(|_| entry.is_open()) {
            entry.leave_time = Some(leave);
            entry.clamp_leave();
            let duration = get_duration(entry);
            entry.duration_ms += duration;
        }

        self.publish();
        true
    }

    fn publish(&mut self) -> &[LedgerEntry] {
        self.merged = merge(&self.raw);
        &self.merged
    }
}
