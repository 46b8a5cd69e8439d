//! Participant and role models

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ephemeral in-session participant id, assigned per connection
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Stable statistics id for a logical participant.
///
/// Unlike [`ParticipantId`] this survives reconnects, so the speaker ledger
/// keys merged entries by it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatsId(String);

impl StatsId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StatsId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Conference roles in priority order (highest to lowest)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Role {
    /// Can drive follow-me and grant moderator to others
    Moderator = 3,
    /// Regular attendee
    #[default]
    Participant = 2,
    /// Unauthenticated attendee; may be restricted to chat
    Guest = 1,
}

impl Role {
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Moderator => "Moderator",
            Role::Participant => "Participant",
            Role::Guest => "Guest",
        }
    }

    pub fn is_moderator(&self) -> bool {
        *self == Role::Moderator
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A conference member as seen by the local client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub stats_id: Option<StatsId>,
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: Role,
    /// True for the participant running this client
    #[serde(default)]
    pub local: bool,
    #[serde(default)]
    pub audio_muted: bool,
    #[serde(default)]
    pub video_muted: bool,
}

impl Participant {
    pub fn new(id: impl Into<ParticipantId>, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            stats_id: None,
            display_name: display_name.into(),
            email: None,
            role,
            local: false,
            audio_muted: false,
            video_muted: false,
        }
    }

    pub fn with_stats_id(mut self, stats_id: impl Into<StatsId>) -> Self {
        self.stats_id = Some(stats_id.into());
        self
    }

    pub fn local(mut self) -> Self {
        self.local = true;
        self
    }

    pub fn is_moderator(&self) -> bool {
        self.role.is_moderator()
    }
}

impl From<String> for ParticipantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<String> for StatsId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ordering() {
        assert!(Role::Moderator > Role::Participant);
        assert!(Role::Participant > Role::Guest);
        assert!(Role::Moderator.is_moderator());
        assert!(!Role::Guest.is_moderator());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Moderator).unwrap();
        assert_eq!(json, "\"moderator\"");
    }

    #[test]
    fn test_ids_are_transparent() {
        let p = Participant::new("p1", "alice", Role::Participant).with_stats_id("s1");
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["id"], "p1");
        assert_eq!(json["stats_id"], "s1");
    }
}
