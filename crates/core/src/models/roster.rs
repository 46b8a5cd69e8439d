//! Ordered participant list as held by one client

use serde::{Deserialize, Serialize};

use super::participant::{Participant, ParticipantId, Role, StatsId};

/// The locally known participants, in display order, plus the pinned one
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    participants: Vec<Participant>,
    pinned: Option<ParticipantId>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a participant, replacing any existing entry with the same id
    pub fn add(&mut self, participant: Participant) {
        match self.participants.iter_mut().find(|p| p.id == participant.id) {
            Some(existing) => *existing = participant,
            None => self.participants.push(participant),
        }
    }

    /// Remove a participant; unpins them if they were pinned
    pub fn remove(&mut self, id: &ParticipantId) -> Option<Participant> {
        let index = self.participants.iter().position(|p| &p.id == id)?;
        if self.pinned.as_ref() == Some(id) {
            self.pinned = None;
        }
        Some(self.participants.remove(index))
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == id)
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.get(id).is_some()
    }

    pub fn find_by_stats_id(&self, stats_id: &StatsId) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| p.stats_id.as_ref() == Some(stats_id))
    }

    pub fn local(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.local)
    }

    pub fn is_local_moderator(&self) -> bool {
        self.local().is_some_and(Participant::is_moderator)
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn ids(&self) -> Vec<ParticipantId> {
        self.participants.iter().map(|p| p.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn set_role(&mut self, id: &ParticipantId, role: Role) -> bool {
        match self.participants.iter_mut().find(|p| &p.id == id) {
            Some(p) => {
                p.role = role;
                true
            }
            None => false,
        }
    }

    pub fn set_media_state(&mut self, id: &ParticipantId, audio_muted: bool, video_muted: bool) {
        if let Some(p) = self.participants.iter_mut().find(|p| &p.id == id) {
            p.audio_muted = audio_muted;
            p.video_muted = video_muted;
        }
    }

    pub fn pinned(&self) -> Option<&ParticipantId> {
        self.pinned.as_ref()
    }

    /// Pin a known participant, or unpin with `None`.
    ///
    /// Returns false when the target is not in the roster.
    pub fn pin(&mut self, id: Option<ParticipantId>) -> bool {
        match id {
            Some(id) if !self.contains(&id) => false,
            other => {
                self.pinned = other;
                true
            }
        }
    }

    /// Place the listed ids first, in the given order, followed by every
    /// unlisted participant in its current relative order. Ids that are not
    /// in the roster are skipped.
    pub fn reorder_by(&mut self, order: &[ParticipantId]) {
        let (mut listed, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.participants)
            .into_iter()
            .partition(|p| order.contains(&p.id));

        let mut ordered = Vec::with_capacity(listed.len() + rest.len());
        for id in order {
            if let Some(pos) = listed.iter().position(|p| &p.id == id) {
                ordered.push(listed.swap_remove(pos));
            }
        }
        ordered.extend(rest);
        self.participants = ordered;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(ids: &[&str]) -> Roster {
        let mut roster = Roster::new();
        for id in ids {
            roster.add(Participant::new(*id, *id, Role::Participant));
        }
        roster
    }

    fn order(roster: &Roster) -> Vec<String> {
        roster.ids().iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_reorder_listed_first_rest_in_original_order() {
        let mut r = roster(&["a", "b", "c", "d", "e"]);
        r.reorder_by(&["d".into(), "b".into()]);
        assert_eq!(order(&r), vec!["d", "b", "a", "c", "e"]);
    }

    #[test]
    fn test_reorder_skips_unknown_ids() {
        let mut r = roster(&["a", "b", "c"]);
        r.reorder_by(&["zz".into(), "c".into(), "a".into()]);
        assert_eq!(order(&r), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_pin_requires_known_participant() {
        let mut r = roster(&["a"]);
        assert!(!r.pin(Some("ghost".into())));
        assert!(r.pinned().is_none());
        assert!(r.pin(Some("a".into())));
        assert_eq!(r.pinned(), Some(&ParticipantId::from("a")));
    }

    #[test]
    fn test_remove_unpins() {
        let mut r = roster(&["a", "b"]);
        r.pin(Some("a".into()));
        r.remove(&"a".into());
        assert!(r.pinned().is_none());
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn test_add_replaces_same_id() {
        let mut r = roster(&["a"]);
        r.add(Participant::new("a", "renamed", Role::Moderator));
        assert_eq!(r.len(), 1);
        assert!(r.get(&"a".into()).unwrap().is_moderator());
    }
}
