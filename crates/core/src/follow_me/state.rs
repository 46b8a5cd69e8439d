//! Follower-side state and the effects a follow-me command produces

use serde::{Deserialize, Serialize};

use crate::models::ParticipantId;
use crate::pagination::SortKey;

/// Receiver state machine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FollowerMode {
    /// Not following anyone
    #[default]
    Idle,
    /// Mirroring this moderator's layout
    Following(ParticipantId),
}

/// Read-only follow-me slice exposed to the UI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowMeState {
    pub moderator_id: Option<ParticipantId>,
    pub filmstrip_visible: bool,
    pub tile_view_enabled: bool,
    pub next_on_stage: Option<ParticipantId>,
    pub shared_document_visible: bool,
    pub pagination_order: Vec<SortKey>,
    pub participant_order: Vec<ParticipantId>,
}

impl FollowMeState {
    pub fn is_active(&self) -> bool {
        self.moderator_id.is_some()
    }
}

/// A local UI change requested by an applied follow-me command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowMeEffect {
    SetFilmstripVisible(bool),
    SetTileView(bool),
    SetSharedDocumentVisible(bool),
    /// Pin a participant, or unpin with `None`
    Pin(Option<ParticipantId>),
    ReorderParticipants(Vec<ParticipantId>),
    /// Adopt the moderator's sort keys; page size and position stay local
    SetPaginationOrder(Vec<SortKey>),
}
