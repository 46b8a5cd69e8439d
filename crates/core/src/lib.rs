//! Vmeet Core Library
//!
//! Participants, pagination, follow-me replication and the speaker-activity
//! ledger. Everything in here is synchronous; timers are expressed as
//! deadlines that the caller drives.

pub mod config;
pub mod error;
pub mod follow_me;
pub mod invariants;
pub mod models;
pub mod pagination;
pub mod speaker_stats;

pub use config::Config;
pub use error::{Error, Result};
pub use follow_me::{
    FollowMeAttributes, FollowMeBroadcaster, FollowMeEffect, FollowMePayload, FollowMeReceiver,
    FollowMeSnapshot, FollowMeState, FollowerMode, IncomingCommand, OutgoingCommand,
    SenderContext, FOLLOW_ME_COMMAND,
};
pub use models::*;
pub use pagination::{PageInfo, PaginationSettings, SortKey};
pub use speaker_stats::{LedgerEntry, SpeakerLedger, SpeakerStatsReport, SpeakerStatsRow};
