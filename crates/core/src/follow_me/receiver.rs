//! Follower side of follow-me
//!
//! Validates incoming commands, tracks which moderator is being followed,
//! and turns each command into the minimal list of UI effects. Pinning a
//! participant who is not known yet is retried on a fixed interval.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::command::{FollowMeAttributes, FollowMePayload, IncomingCommand};
use super::state::{FollowMeEffect, FollowMeState, FollowerMode};
use crate::models::{ParticipantId, Roster};

/// Retry schedule for pinning a participant that has not joined locally yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinRetryPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PinRetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 30,
        }
    }
}

#[derive(Debug, Clone)]
struct PendingPin {
    target: ParticipantId,
    attempts: u32,
    next_attempt: Instant,
}

/// Receiver state machine, one per conference session
#[derive(Debug)]
pub struct FollowMeReceiver {
    policy: PinRetryPolicy,
    /// Recorders keep their own participant order
    recorder: bool,
    mode: FollowerMode,
    state: FollowMeState,
    last_attributes: Option<FollowMeAttributes>,
    last_value: Option<String>,
    pending_pin: Option<PendingPin>,
}

impl FollowMeReceiver {
    pub fn new(policy: PinRetryPolicy, recorder: bool) -> Self {
        Self {
            policy,
            recorder,
            mode: FollowerMode::Idle,
            state: FollowMeState::default(),
            last_attributes: None,
            last_value: None,
            pending_pin: None,
        }
    }

    pub fn mode(&self) -> &FollowerMode {
        &self.mode
    }

    pub fn state(&self) -> &FollowMeState {
        &self.state
    }

    /// Participant currently waiting to be pinned, if any
    pub fn pending_pin(&self) -> Option<&ParticipantId> {
        self.pending_pin.as_ref().map(|p| &p.target)
    }

    /// When [`on_tick`](Self::on_tick) next needs to run
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending_pin.as_ref().map(|p| p.next_attempt)
    }

    /// Apply a command received from the bus
    pub fn handle_command(
        &mut self,
        command: &IncomingCommand,
        roster: &Roster,
        now: Instant,
    ) -> Vec<FollowMeEffect> {
        let Some(sender) = command.sender.as_ref() else {
            debug!("Dropping follow-me command without sender");
            return Vec::new();
        };

        if roster.local().is_some_and(|p| &p.id == sender) {
            debug!("Dropping our own follow-me command");
            return Vec::new();
        }

        if !roster.get(sender).is_some_and(|p| p.is_moderator()) {
            warn!(sender = %sender, "Received follow-me command not from moderator");
            return Vec::new();
        }

        let attributes = FollowMeAttributes::from_attributes(&command.attributes);

        if attributes.off {
            info!(moderator = %sender, "Follow-me turned off");
            self.stop_following();
            return Vec::new();
        }

        if self.mode == FollowerMode::Idle {
            info!(moderator = %sender, "Following moderator");
            self.mode = FollowerMode::Following(sender.clone());
            self.state.moderator_id = Some(sender.clone());
        }

        let previous = self.last_attributes.replace(attributes.clone()).unwrap_or_default();
        let mut effects = Vec::new();

        if previous.filmstrip_visible != attributes.filmstrip_visible {
            let visible = attributes.filmstrip_visible.unwrap_or(false);
            self.state.filmstrip_visible = visible;
            effects.push(FollowMeEffect::SetFilmstripVisible(visible));
        }

        if previous.tile_view_enabled != attributes.tile_view_enabled {
            let enabled = attributes.tile_view_enabled.unwrap_or(false);
            self.state.tile_view_enabled = enabled;
            effects.push(FollowMeEffect::SetTileView(enabled));
        }

        if previous.shared_document_visible != attributes.shared_document_visible {
            let visible = attributes.shared_document_visible.unwrap_or(false);
            self.state.shared_document_visible = visible;
            effects.push(FollowMeEffect::SetSharedDocumentVisible(visible));
        }

        effects.extend(self.apply_next_on_stage(&previous, &attributes, roster, now));

        if let Some(value) = command.value.as_deref() {
            if self.last_value.as_deref() != Some(value) {
                self.last_value = Some(value.to_string());
                effects.extend(self.apply_payload(value));
            }
        }

        effects
    }

    fn apply_next_on_stage(
        &mut self,
        previous: &FollowMeAttributes,
        attributes: &FollowMeAttributes,
        roster: &Roster,
        now: Instant,
    ) -> Vec<FollowMeEffect> {
        let next = attributes.next_on_stage.as_ref();
        self.state.next_on_stage = next.cloned();

        // a newer nextOnStage supersedes whatever we were waiting for
        if self
            .pending_pin
            .as_ref()
            .is_some_and(|p| Some(&p.target) != next)
        {
            debug!("Pending pin superseded");
            self.pending_pin = None;
        }

        match next {
            Some(target)
                if roster.pinned() != Some(target)
                    && previous.next_on_stage.as_ref() != Some(target) =>
            {
                self.pin_by_id(target, roster, now)
            }
            None if roster.pinned().is_some() => vec![FollowMeEffect::Pin(None)],
            _ => Vec::new(),
        }
    }

    fn apply_payload(&mut self, value: &str) -> Vec<FollowMeEffect> {
        let payload = match FollowMePayload::decode(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Skipping follow-me reorder");
                return Vec::new();
            }
        };

        let mut effects = Vec::new();
        if let Some(order) = payload.participant_order {
            if !self.recorder {
                effects.push(FollowMeEffect::ReorderParticipants(order.clone()));
            }
            self.state.participant_order = order;
        }
        if let Some(order) = payload.pagination_order {
            self.state.pagination_order = order.clone();
            effects.push(FollowMeEffect::SetPaginationOrder(order));
        }
        effects
    }

    fn pin_by_id(
        &mut self,
        target: &ParticipantId,
        roster: &Roster,
        now: Instant,
    ) -> Vec<FollowMeEffect> {
        if roster.contains(target) {
            self.pending_pin = None;
            return vec![FollowMeEffect::Pin(Some(target.clone()))];
        }

        debug!(target = %target, "Pin target not known yet, retrying");
        self.pending_pin = Some(PendingPin {
            target: target.clone(),
            attempts: 0,
            next_attempt: now + self.policy.interval,
        });
        Vec::new()
    }

    /// Drive the pin retry. Call at or after [`next_deadline`](Self::next_deadline).
    pub fn on_tick(&mut self, roster: &Roster, now: Instant) -> Vec<FollowMeEffect> {
        let Some(pending) = self.pending_pin.as_mut() else {
            return Vec::new();
        };
        if now < pending.next_attempt {
            return Vec::new();
        }

        if roster.contains(&pending.target) {
            let target = pending.target.clone();
            self.pending_pin = None;
            return vec![FollowMeEffect::Pin(Some(target))];
        }

        pending.attempts += 1;
        if pending.attempts >= self.policy.max_attempts {
            debug!(target = %pending.target, attempts = pending.attempts, "Giving up on pin");
            self.pending_pin = None;
            return Vec::new();
        }

        pending.next_attempt = now + self.policy.interval;
        Vec::new()
    }

    /// A participant became known locally
    pub fn on_participant_joined(&mut self, id: &ParticipantId) -> Vec<FollowMeEffect> {
        if self.pending_pin.as_ref().is_some_and(|p| &p.target == id) {
            self.pending_pin = None;
            return vec![FollowMeEffect::Pin(Some(id.clone()))];
        }
        Vec::new()
    }

    /// A participant left; stop following them if they were our moderator
    pub fn on_participant_left(&mut self, id: &ParticipantId) {
        if self.mode == FollowerMode::Following(id.clone()) {
            info!(moderator = %id, "Followed moderator left");
            self.mode = FollowerMode::Idle;
            self.state.moderator_id = None;
        }
    }

    fn stop_following(&mut self) {
        self.mode = FollowerMode::Idle;
        self.state.moderator_id = None;
        self.last_attributes = None;
        self.last_value = None;
        self.pending_pin = None;
    }
}

impl Default for FollowMeReceiver {
    fn default() -> Self {
        Self::new(PinRetryPolicy::default(), false)
    }
}
