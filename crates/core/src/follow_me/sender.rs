//! Moderator side of follow-me
//!
//! Watches a snapshot of the local layout and coalesces changes into one
//! outgoing command per quiet window.

use std::time::{Duration, Instant};

use tracing::debug;

use super::command::{FollowMeAttributes, FollowMePayload, OutgoingCommand};
use crate::models::ParticipantId;
use crate::pagination::PaginationSettings;

/// Local layout state that followers mirror
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FollowMeSnapshot {
    pub filmstrip_visible: bool,
    pub next_on_stage: Option<ParticipantId>,
    pub shared_document_visible: bool,
    pub tile_view_enabled: bool,
    pub participant_order: Vec<ParticipantId>,
    pub pagination: PaginationSettings,
}

/// Facts about the local participant that gate sending
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderContext {
    pub local_is_moderator: bool,
    pub local_is_guest: bool,
    pub follow_me_enabled: bool,
    /// Recording or live streaming forces state out even with follow-me off
    pub recording_or_streaming: bool,
    pub chat_only_guest_enabled: bool,
}

/// Debounced follow-me sender, one per conference session
#[derive(Debug)]
pub struct FollowMeBroadcaster {
    window: Duration,
    late_joiner_delay: Duration,
    last_enabled: Option<bool>,
    latest: Option<FollowMeSnapshot>,
    /// End of the current quiet window
    deadline: Option<Instant>,
    /// Catch-up send for a participant who joined
    resend_at: Option<Instant>,
}

impl FollowMeBroadcaster {
    pub fn new(window: Duration, late_joiner_delay: Duration) -> Self {
        Self {
            window,
            late_joiner_delay,
            last_enabled: None,
            latest: None,
            deadline: None,
            resend_at: None,
        }
    }

    /// When [`poll`](Self::poll) next needs to run
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.deadline, self.resend_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Record the current local state.
    ///
    /// Any change restarts the quiet window. Turning follow-me off returns
    /// the off command right away instead.
    pub fn observe(
        &mut self,
        ctx: &SenderContext,
        snapshot: FollowMeSnapshot,
        now: Instant,
    ) -> Option<OutgoingCommand> {
        let was_enabled = self.last_enabled.replace(ctx.follow_me_enabled);
        let enabled_changed = was_enabled != Some(ctx.follow_me_enabled);
        let snapshot_changed = self.latest.as_ref() != Some(&snapshot);
        self.latest = Some(snapshot);

        if was_enabled == Some(true) && !ctx.follow_me_enabled {
            self.deadline = None;
            self.resend_at = None;
            if ctx.local_is_moderator {
                debug!("Follow-me disabled, notifying followers");
                return Some(OutgoingCommand::Off);
            }
            return None;
        }

        if enabled_changed || snapshot_changed {
            self.deadline = Some(now + self.window);
        }
        None
    }

    /// Schedule a resend so a participant who just joined catches up.
    ///
    /// Kept apart from the quiet window, so the roster change that comes
    /// with the join does not swallow it. Later joins push it back.
    pub fn on_remote_joined(&mut self, ctx: &SenderContext, now: Instant) {
        if !ctx.local_is_moderator || !ctx.follow_me_enabled {
            return;
        }
        self.resend_at = Some(now + self.late_joiner_delay);
    }

    /// Emit the current state once the quiet window or the resend delay
    /// has elapsed. Only the slots that are due are cleared.
    pub fn poll(&mut self, ctx: &SenderContext, now: Instant) -> Option<OutgoingCommand> {
        let window_due = self.deadline.is_some_and(|d| now >= d);
        let resend_due = self.resend_at.is_some_and(|d| now >= d);
        if !window_due && !resend_due {
            return None;
        }
        if window_due {
            self.deadline = None;
        }
        if resend_due {
            self.resend_at = None;
        }
        self.build(ctx)
    }

    fn build(&self, ctx: &SenderContext) -> Option<OutgoingCommand> {
        if !ctx.local_is_moderator {
            return None;
        }
        let forced = ctx.recording_or_streaming;
        if !forced && !ctx.follow_me_enabled {
            return None;
        }
        if ctx.chat_only_guest_enabled && ctx.local_is_guest {
            debug!("Chat-only guest, not sending follow-me");
            return None;
        }

        let snapshot = self.latest.as_ref()?;
        let attributes = FollowMeAttributes {
            off: false,
            filmstrip_visible: Some(snapshot.filmstrip_visible),
            next_on_stage: snapshot.next_on_stage.clone(),
            shared_document_visible: Some(snapshot.shared_document_visible),
            tile_view_enabled: Some(snapshot.tile_view_enabled),
            send_to_recorder: forced && !ctx.follow_me_enabled,
        };
        let payload =
            FollowMePayload::new(snapshot.participant_order.clone(), &snapshot.pagination);

        Some(OutgoingCommand::Update {
            attributes,
            payload,
        })
    }
}

impl Default for FollowMeBroadcaster {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_secs(3))
    }
}
