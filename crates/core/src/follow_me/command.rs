//! Follow-me command wire format
//!
//! The command bus only carries a flat string map of attributes plus one
//! free-form string `value`. Booleans travel as `"true"` / `"false"` and the
//! ordering payload travels as JSON inside `value`. Both are decoded into
//! typed records here and nowhere else.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::ParticipantId;
use crate::pagination::{PaginationSettings, SortKey};

/// Command name used on the bus
pub const FOLLOW_ME_COMMAND: &str = "follow-me";

/// Flat attribute map as carried by the command bus
pub type CommandAttributes = BTreeMap<String, String>;

const ATTR_OFF: &str = "off";
const ATTR_FILMSTRIP_VISIBLE: &str = "filmstripVisible";
const ATTR_NEXT_ON_STAGE: &str = "nextOnStage";
const ATTR_SHARED_DOCUMENT_VISIBLE: &str = "sharedDocumentVisible";
const ATTR_TILE_VIEW_ENABLED: &str = "tileViewEnabled";
const ATTR_SEND_TO_RECORDER: &str = "sendToRecorder";

/// Scalar follow-me attributes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FollowMeAttributes {
    /// The moderator turned follow-me off
    pub off: bool,
    pub filmstrip_visible: Option<bool>,
    pub next_on_stage: Option<ParticipantId>,
    pub shared_document_visible: Option<bool>,
    pub tile_view_enabled: Option<bool>,
    /// Sent while follow-me is disabled but a recording is running
    pub send_to_recorder: bool,
}

impl FollowMeAttributes {
    pub fn off() -> Self {
        Self {
            off: true,
            ..Default::default()
        }
    }

    /// Encode into the flat wire map. Absent options are omitted.
    pub fn to_attributes(&self) -> CommandAttributes {
        let mut attrs = CommandAttributes::new();
        if self.off {
            attrs.insert(ATTR_OFF.into(), "true".into());
            return attrs;
        }
        if let Some(v) = self.filmstrip_visible {
            attrs.insert(ATTR_FILMSTRIP_VISIBLE.into(), v.to_string());
        }
        if let Some(id) = &self.next_on_stage {
            attrs.insert(ATTR_NEXT_ON_STAGE.into(), id.to_string());
        }
        if let Some(v) = self.shared_document_visible {
            attrs.insert(ATTR_SHARED_DOCUMENT_VISIBLE.into(), v.to_string());
        }
        if let Some(v) = self.tile_view_enabled {
            attrs.insert(ATTR_TILE_VIEW_ENABLED.into(), v.to_string());
        }
        if self.send_to_recorder {
            attrs.insert(ATTR_SEND_TO_RECORDER.into(), "true".into());
        }
        attrs
    }

    /// Decode from the flat wire map.
    ///
    /// Any flag value other than `"true"` reads as false. Unknown keys are
    /// ignored.
    pub fn from_attributes(attrs: &CommandAttributes) -> Self {
        let mut decoded = Self::default();
        for (key, value) in attrs {
            match key.as_str() {
                ATTR_OFF => decoded.off = is_true(value),
                ATTR_FILMSTRIP_VISIBLE => decoded.filmstrip_visible = Some(is_true(value)),
                ATTR_NEXT_ON_STAGE if !value.is_empty() => {
                    decoded.next_on_stage = Some(ParticipantId::new(value.as_str()))
                }
                ATTR_NEXT_ON_STAGE => {}
                ATTR_SHARED_DOCUMENT_VISIBLE => {
                    decoded.shared_document_visible = Some(is_true(value))
                }
                ATTR_TILE_VIEW_ENABLED => decoded.tile_view_enabled = Some(is_true(value)),
                ATTR_SEND_TO_RECORDER => decoded.send_to_recorder = is_true(value),
                other => debug!(key = other, "Ignoring unknown follow-me attribute"),
            }
        }
        decoded
    }
}

fn is_true(value: &str) -> bool {
    value == "true"
}

/// Structured follow-me payload carried in the command `value`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FollowMePayload {
    /// Explicit participant ordering; `None` when the sender did not impose one
    pub participant_order: Option<Vec<ParticipantId>>,
    /// Sort keys for the participant pages; `None` when the sender did not impose one
    pub pagination_order: Option<Vec<SortKey>>,
    /// The sender's own page position. Followers page for their own
    /// viewport, so these are carried but never applied.
    pub current: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

#[derive(Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WirePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Vec<ParticipantId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order: Option<Vec<SortKey>>,
    current: usize,
    page_size: usize,
    total_pages: usize,
}

impl FollowMePayload {
    /// Payload describing the sender's participant order and pagination
    pub fn new(participant_order: Vec<ParticipantId>, pagination: &PaginationSettings) -> Self {
        Self {
            participant_order: Some(participant_order),
            pagination_order: Some(pagination.order.clone()),
            current: pagination.current,
            page_size: pagination.page_size,
            total_pages: pagination.total_pages,
        }
    }

    pub fn encode(&self) -> Result<String> {
        let wire = WirePayload {
            data: self.participant_order.clone(),
            order: self.pagination_order.clone(),
            current: self.current,
            page_size: self.page_size,
            total_pages: self.total_pages,
        };
        Ok(serde_json::to_string(&wire)?)
    }

    /// Decode a `value` field, reversing the transport's `&quot;` escaping
    pub fn decode(value: &str) -> Result<Self> {
        let unescaped = value.replace("&quot;", "\"");
        let wire: WirePayload = serde_json::from_str(&unescaped)
            .map_err(|e| Error::InvalidPayload(format!("follow-me value: {}", e)))?;

        Ok(Self {
            participant_order: wire.data,
            pagination_order: wire.order,
            current: wire.current,
            page_size: wire.page_size,
            total_pages: wire.total_pages,
        })
    }
}

/// A command as delivered by the bus to a listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingCommand {
    pub attributes: CommandAttributes,
    pub value: Option<String>,
    /// `None` when the bus could not attribute the command
    pub sender: Option<ParticipantId>,
}

/// A command the local participant wants on the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingCommand {
    /// Full state; replayed to late joiners
    Update {
        attributes: FollowMeAttributes,
        payload: FollowMePayload,
    },
    /// Follow-me was switched off; delivered once
    Off,
}

impl OutgoingCommand {
    pub fn attributes(&self) -> CommandAttributes {
        match self {
            OutgoingCommand::Update { attributes, .. } => attributes.to_attributes(),
            OutgoingCommand::Off => FollowMeAttributes::off().to_attributes(),
        }
    }

    pub fn value(&self) -> Result<Option<String>> {
        match self {
            OutgoingCommand::Update { payload, .. } => payload.encode().map(Some),
            OutgoingCommand::Off => Ok(None),
        }
    }

    /// Whether the command must be sent with send-once semantics
    pub fn is_once(&self) -> bool {
        matches!(self, OutgoingCommand::Off)
    }
}
