//! Follow-me: one moderator's layout mirrored onto every other participant
//!
//! - [`FollowMeBroadcaster`]: moderator side, debounced snapshot sender
//! - [`FollowMeReceiver`]: follower side, validates and applies commands
//! - [`command`]: the flat attribute map and JSON `value` wire format

pub mod command;
mod receiver;
mod sender;
mod state;

pub use command::{
    CommandAttributes, FollowMeAttributes, FollowMePayload, IncomingCommand, OutgoingCommand,
    FOLLOW_ME_COMMAND,
};
pub use receiver::{FollowMeReceiver, PinRetryPolicy};
pub use sender::{FollowMeBroadcaster, FollowMeSnapshot, SenderContext};
pub use state::{FollowMeEffect, FollowMeState, FollowerMode};
