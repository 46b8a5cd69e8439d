//! Relay protocol message types
//!
//! All messages are JSON-serialized and length-prefixed on the wire.

use serde::{Deserialize, Serialize};
use vmeet_core::follow_me::CommandAttributes;
use vmeet_core::{Participant, ParticipantId, Role, StatsId};

/// A participant as announced by the relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub participant_id: ParticipantId,
    pub stats_id: Option<StatsId>,
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub audio_muted: bool,
    #[serde(default)]
    pub video_muted: bool,
}

impl PeerInfo {
    /// Convert to a roster participant; `local` marks the receiving client
    pub fn into_participant(self, local: bool) -> Participant {
        Participant {
            id: self.participant_id,
            stats_id: self.stats_id,
            display_name: self.display_name,
            email: self.email,
            role: self.role,
            local,
            audio_muted: self.audio_muted,
            video_muted: self.video_muted,
        }
    }
}

/// Relay protocol messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// Client asks to join the conference
    JoinRequest {
        display_name: String,
        email: Option<String>,
        stats_id: Option<StatsId>,
        role: Role,
        token: String,
    },

    /// Relay accepts the join and assigns an id
    JoinAccepted {
        participant_id: ParticipantId,
        participants: Vec<PeerInfo>,
    },

    /// Relay rejects the join
    JoinRejected { reason: String },

    /// Someone joined
    ParticipantJoined(PeerInfo),

    /// Someone left
    ParticipantLeft { participant_id: ParticipantId },

    /// A participant's role changed
    RoleChanged {
        participant_id: ParticipantId,
        role: Role,
    },

    /// Client reports its own mute state
    SetMediaState { audio_muted: bool, video_muted: bool },

    /// A participant's mute state changed
    MediaStateChanged {
        participant_id: ParticipantId,
        audio_muted: bool,
        video_muted: bool,
    },

    /// A moderator grants moderator to someone else
    GrantModerator { participant_id: ParticipantId },

    /// Client sends a command to everyone.
    ///
    /// Unless `once` is set the relay also replays the latest command per
    /// sender and name to participants who join later.
    SendCommand {
        name: String,
        attributes: CommandAttributes,
        value: Option<String>,
        once: bool,
    },

    /// Command delivered to every participant, sender included
    Command {
        name: String,
        sender: ParticipantId,
        attributes: CommandAttributes,
        value: Option<String>,
    },

    /// Relay is shutting down
    ServerShutdown,
}
