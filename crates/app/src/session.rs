//! Conference session for the app
//!
//! One tokio task owns the relay client and every core state machine. It
//! processes relay events, local UI actions and timer deadlines serially,
//! then republishes the read-only slices in [`ConferenceState`].

use std::net::SocketAddr;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vmeet_core::invariants::{assert_follow_me_invariants, assert_roster_invariants};
use vmeet_core::speaker_stats::EntryPatch;
use vmeet_core::{
    Config, FollowMeBroadcaster, FollowMeEffect, FollowMeReceiver, FollowMeSnapshot,
    IncomingCommand, OutgoingCommand, PaginationSettings, ParticipantId, Role, Roster,
    SenderContext, SpeakerLedger, StatsId, FOLLOW_ME_COMMAND,
};
use vmeet_net::{Client, ClientEvent, JoinParams, PeerInfo};

use crate::error::{Error, Result};
use crate::state::{ConferenceState, LayoutState, LocalSettings};

/// Something the local user did in the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalAction {
    SetFilmstripVisible(bool),
    SetTileView(bool),
    SetSharedDocumentVisible(bool),
    /// Pin a participant, or unpin with `None`
    Pin(Option<ParticipantId>),
    SetPagination(PaginationSettings),
    ReorderParticipants(Vec<ParticipantId>),
    SetFollowMeEnabled(bool),
    /// Recording or live streaming started/stopped
    SetRecording(bool),
    GrantModerator(ParticipantId),
    SetMediaState { audio_muted: bool, video_muted: bool },
    Leave,
}

/// Monotonic "now" on tokio's clock, so paused-time tests drive deadlines
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Session handle
pub struct Session {
    local_id: ParticipantId,
    state: ConferenceState,
    action_tx: mpsc::Sender<LocalAction>,
    task: JoinHandle<()>,
}

impl Session {
    /// Join the conference behind `addr` and start the session loop
    pub async fn join(addr: SocketAddr, config: &Config) -> Result<Self> {
        let params = JoinParams {
            display_name: config.participant.display_name.clone(),
            email: config.participant.email.clone(),
            stats_id: Some(StatsId::new(config.participant.stats_id_or_generate())),
            role: config.participant.role,
            token: config.relay.token.clone(),
        };

        let mut client = Client::connect(addr, params).await?;

        let (local_id, participants) = match client.next_event().await {
            Some(ClientEvent::Joined {
                participant_id,
                participants,
            }) => (participant_id, participants),
            Some(ClientEvent::JoinRejected { reason }) => return Err(Error::Rejected(reason)),
            _ => return Err(Error::JoinInterrupted),
        };

        let state = ConferenceState::new();
        let mut core = SessionCore::new(local_id.clone(), config, state.clone());
        core.start(participants, now(), Utc::now());
        core.publish().await;

        info!(participant_id = %local_id, "Session started");

        let (action_tx, action_rx) = mpsc::channel(64);
        let task = tokio::spawn(session_task(core, client, action_rx));

        Ok(Self {
            local_id,
            state,
            action_tx,
            task,
        })
    }

    pub fn local_id(&self) -> &ParticipantId {
        &self.local_id
    }

    /// Read-only state slices
    pub fn state(&self) -> &ConferenceState {
        &self.state
    }

    /// Queue a local UI action for the session loop
    pub async fn act(&self, action: LocalAction) -> Result<()> {
        self.action_tx
            .send(action)
            .await
            .map_err(|_| Error::SessionEnded)
    }

    /// Whether the session loop has stopped
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Leave the conference and wait for the loop to wind down
    pub async fn leave(self) {
        let _ = self.action_tx.send(LocalAction::Leave).await;
        if let Err(e) = self.task.await {
            warn!(error = %e, "Session task failed");
        }
    }
}

/// Sleep until `deadline`, or forever when there is none
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

/// Main session task
async fn session_task(
    mut core: SessionCore,
    mut client: Client,
    mut action_rx: mpsc::Receiver<LocalAction>,
) {
    loop {
        let deadline = core.next_deadline();

        tokio::select! {
            event = client.next_event() => {
                match event {
                    Some(event) => {
                        if !core.handle_event(event, now(), Utc::now()) {
                            break;
                        }
                    }
                    None => {
                        debug!("Relay event channel closed");
                        break;
                    }
                }
            }

            action = action_rx.recv() => {
                match action {
                    Some(LocalAction::GrantModerator(id)) => {
                        if let Err(e) = client.grant_moderator(id).await {
                            warn!(error = %e, "Failed to grant moderator");
                        }
                    }
                    Some(LocalAction::SetMediaState { audio_muted, video_muted }) => {
                        if let Err(e) = client.set_media_state(audio_muted, video_muted).await {
                            warn!(error = %e, "Failed to send media state");
                        }
                    }
                    Some(LocalAction::Leave) | None => {
                        debug!("Leave requested");
                        client.disconnect().await;
                        break;
                    }
                    Some(action) => core.handle_action(action, now()),
                }
            }

            _ = sleep_until(deadline) => {
                core.on_deadline(now());
            }
        }

        send_outbox(&mut core, &client).await;
        core.publish().await;
    }

    core.finish(Utc::now());
    core.publish().await;
    info!(participant_id = %core.local_id, "Session ended");
}

/// Put queued follow-me commands on the bus
async fn send_outbox(core: &mut SessionCore, client: &Client) {
    for command in core.outbox.drain(..) {
        let value = match command.value() {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Failed to encode follow-me command");
                continue;
            }
        };
        let attributes = command.attributes();

        let result = if command.is_once() {
            client
                .send_command_once(FOLLOW_ME_COMMAND, attributes, value)
                .await
        } else {
            client.send_command(FOLLOW_ME_COMMAND, attributes, value).await
        };

        match result {
            Ok(()) => debug!(once = command.is_once(), "Sent follow-me command"),
            Err(e) => warn!(error = %e, "Failed to send follow-me command"),
        }
    }
}

/// Everything the session loop owns, driven synchronously
struct SessionCore {
    local_id: ParticipantId,
    roster: Roster,
    layout: LayoutState,
    settings: LocalSettings,
    chat_only_guest_enabled: bool,
    receiver: FollowMeReceiver,
    broadcaster: FollowMeBroadcaster,
    ledger: SpeakerLedger,
    outbox: Vec<OutgoingCommand>,
    shared: ConferenceState,
}

impl SessionCore {
    fn new(local_id: ParticipantId, config: &Config, shared: ConferenceState) -> Self {
        let follow_me = &config.follow_me;
        Self {
            local_id,
            roster: Roster::new(),
            layout: LayoutState::default(),
            settings: LocalSettings {
                follow_me_enabled: follow_me.enabled,
                recording: false,
            },
            chat_only_guest_enabled: follow_me.chat_only_guest_enabled,
            receiver: FollowMeReceiver::new(follow_me.pin_retry_policy(), config.participant.recorder),
            broadcaster: FollowMeBroadcaster::new(follow_me.debounce(), follow_me.late_joiner_resend()),
            ledger: SpeakerLedger::new(),
            outbox: Vec::new(),
            shared,
        }
    }

    /// Seed the roster and ledger from the join response
    fn start(&mut self, participants: Vec<PeerInfo>, now: Instant, wall: DateTime<Utc>) {
        for info in participants {
            let local = info.participant_id == self.local_id;
            let participant = info.into_participant(local);
            self.ledger.record_join(&participant, wall);
            self.roster.add(participant);
        }
        self.layout.repaginate(&self.roster);
        self.observe(now);
    }

    fn context(&self) -> SenderContext {
        SenderContext {
            local_is_moderator: self.roster.is_local_moderator(),
            local_is_guest: self.roster.local().is_some_and(|p| p.role == Role::Guest),
            follow_me_enabled: self.settings.follow_me_enabled,
            recording_or_streaming: self.settings.recording,
            chat_only_guest_enabled: self.chat_only_guest_enabled,
        }
    }

    fn snapshot(&self) -> FollowMeSnapshot {
        FollowMeSnapshot {
            filmstrip_visible: self.layout.filmstrip_visible,
            next_on_stage: self.roster.pinned().cloned(),
            shared_document_visible: self.layout.shared_document_visible,
            tile_view_enabled: self.layout.tile_view_enabled,
            participant_order: self.roster.ids(),
            pagination: self.layout.pagination.clone(),
        }
    }

    fn observe(&mut self, now: Instant) {
        let ctx = self.context();
        let snapshot = self.snapshot();
        if let Some(command) = self.broadcaster.observe(&ctx, snapshot, now) {
            self.outbox.push(command);
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        match (self.receiver.next_deadline(), self.broadcaster.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Apply a relay event. Returns false once the session is over.
    fn handle_event(&mut self, event: ClientEvent, now: Instant, wall: DateTime<Utc>) -> bool {
        match event {
            ClientEvent::ParticipantJoined(info) => {
                let participant = info.into_participant(false);
                let id = participant.id.clone();
                info!(participant_id = %id, display_name = %participant.display_name, "Participant joined");

                self.ledger.record_join(&participant, wall);
                self.roster.add(participant);

                let effects = self.receiver.on_participant_joined(&id);
                self.apply_effects(effects);

                let ctx = self.context();
                self.broadcaster.on_remote_joined(&ctx, now);
            }
            ClientEvent::ParticipantLeft { participant_id } => {
                info!(participant_id = %participant_id, "Participant left");
                self.roster.remove(&participant_id);
                self.ledger.record_leave(&participant_id, wall);
                self.receiver.on_participant_left(&participant_id);
                self.layout.repaginate(&self.roster);
            }
            ClientEvent::RoleChanged {
                participant_id,
                role,
            } => {
                debug!(participant_id = %participant_id, role = ?role, "Role changed");
                self.roster.set_role(&participant_id, role);
            }
            ClientEvent::MediaStateChanged {
                participant_id,
                audio_muted,
                video_muted,
            } => {
                self.roster
                    .set_media_state(&participant_id, audio_muted, video_muted);
                self.ledger.update(
                    &participant_id,
                    EntryPatch {
                        audio_muted: Some(audio_muted),
                        video_muted: Some(video_muted),
                        ..Default::default()
                    },
                );
                self.layout.repaginate(&self.roster);
            }
            ClientEvent::Command {
                name,
                sender,
                attributes,
                value,
            } => {
                if name != FOLLOW_ME_COMMAND {
                    debug!(name = %name, "Ignoring unknown command");
                    return true;
                }
                let command = IncomingCommand {
                    attributes,
                    value,
                    sender: Some(sender),
                };
                let effects = self.receiver.handle_command(&command, &self.roster, now);
                self.apply_effects(effects);
            }
            ClientEvent::Joined { .. } => {
                debug!("Ignoring repeated join acknowledgement");
            }
            ClientEvent::JoinRejected { reason } => {
                warn!(reason = %reason, "Join rejected mid-session");
                return false;
            }
            ClientEvent::ServerShutdown => {
                info!("Relay shutting down");
                return false;
            }
            ClientEvent::Disconnected => {
                info!("Disconnected from relay");
                return false;
            }
        }

        self.observe(now);
        true
    }

    fn handle_action(&mut self, action: LocalAction, now: Instant) {
        match action {
            LocalAction::SetFilmstripVisible(visible) => self.layout.filmstrip_visible = visible,
            LocalAction::SetTileView(enabled) => self.layout.tile_view_enabled = enabled,
            LocalAction::SetSharedDocumentVisible(visible) => {
                self.layout.shared_document_visible = visible
            }
            LocalAction::Pin(id) => {
                if !self.roster.pin(id.clone()) {
                    debug!(participant_id = ?id, "Cannot pin unknown participant");
                }
            }
            LocalAction::SetPagination(settings) => {
                self.layout.pagination = settings;
                self.layout.repaginate(&self.roster);
            }
            LocalAction::ReorderParticipants(order) => {
                self.roster.reorder_by(&order);
                self.layout.repaginate(&self.roster);
            }
            LocalAction::SetFollowMeEnabled(enabled) => {
                info!(enabled, "Follow-me toggled");
                self.settings.follow_me_enabled = enabled;
            }
            LocalAction::SetRecording(recording) => self.settings.recording = recording,
            other => {
                debug!(action = ?other, "Action handled by the session task");
                return;
            }
        }
        self.observe(now);
    }

    fn on_deadline(&mut self, now: Instant) {
        let effects = self.receiver.on_tick(&self.roster, now);
        if !effects.is_empty() {
            self.apply_effects(effects);
            self.observe(now);
        }

        let ctx = self.context();
        if let Some(command) = self.broadcaster.poll(&ctx, now) {
            self.outbox.push(command);
        }
    }

    fn apply_effects(&mut self, effects: Vec<FollowMeEffect>) {
        if effects.is_empty() {
            return;
        }
        for effect in effects {
            debug!(effect = ?effect, "Applying follow-me effect");
            match effect {
                FollowMeEffect::SetFilmstripVisible(visible) => self.layout.filmstrip_visible = visible,
                FollowMeEffect::SetTileView(enabled) => self.layout.tile_view_enabled = enabled,
                FollowMeEffect::SetSharedDocumentVisible(visible) => {
                    self.layout.shared_document_visible = visible
                }
                FollowMeEffect::Pin(id) => {
                    self.roster.pin(id);
                }
                FollowMeEffect::ReorderParticipants(order) => self.roster.reorder_by(&order),
                FollowMeEffect::SetPaginationOrder(order) => self.layout.pagination.order = order,
            }
        }
        self.layout.repaginate(&self.roster);
    }

    /// Close every open interval when the session ends
    fn finish(&mut self, wall: DateTime<Utc>) {
        for id in self.roster.ids() {
            self.ledger.record_leave(&id, wall);
        }
    }

    async fn publish(&self) {
        assert_roster_invariants(&self.roster);
        assert_follow_me_invariants(self.receiver.mode(), self.receiver.state());

        *self.shared.roster.write().await = self.roster.clone();
        *self.shared.layout.write().await = self.layout.clone();
        *self.shared.follow_me.write().await = self.receiver.state().clone();
        *self.shared.settings.write().await = self.settings;
        *self.shared.speaker_stats.write().await = self.ledger.entries().to_vec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vmeet_core::FollowerMode;
    use vmeet_net::Server;

    fn peer(id: &str, role: Role) -> PeerInfo {
        PeerInfo {
            participant_id: id.into(),
            stats_id: Some(format!("{}-stats", id).into()),
            display_name: id.to_string(),
            email: None,
            role,
            audio_muted: false,
            video_muted: false,
        }
    }

    fn moderator_config(enabled: bool) -> Config {
        let mut config = Config::default();
        config.participant.role = Role::Moderator;
        config.follow_me.enabled = enabled;
        config
    }

    fn session_core(local: &str, config: &Config, peers: Vec<PeerInfo>) -> SessionCore {
        let mut core = SessionCore::new(local.into(), config, ConferenceState::new());
        core.start(peers, now(), Utc::now());
        core
    }

    #[tokio::test(start_paused = true)]
    async fn test_moderator_changes_coalesce_into_one_command() {
        let config = moderator_config(true);
        let mut core = session_core(
            "me",
            &config,
            vec![peer("me", Role::Moderator), peer("a", Role::Participant)],
        );

        core.handle_action(LocalAction::SetTileView(true), now());
        tokio::time::advance(Duration::from_millis(50)).await;
        core.handle_action(LocalAction::SetFilmstripVisible(false), now());
        tokio::time::advance(Duration::from_millis(50)).await;
        core.on_deadline(now());
        assert!(core.outbox.is_empty(), "window restarts on every change");

        tokio::time::advance(Duration::from_millis(60)).await;
        core.on_deadline(now());
        assert_eq!(core.outbox.len(), 1);
        let attributes = core.outbox[0].attributes();
        assert_eq!(attributes["tileViewEnabled"], "true");
        assert_eq!(attributes["filmstripVisible"], "false");
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabling_sends_off_once() {
        let config = moderator_config(true);
        let mut core = session_core("me", &config, vec![peer("me", Role::Moderator)]);

        core.handle_action(LocalAction::SetFollowMeEnabled(false), now());
        assert_eq!(core.outbox, vec![OutgoingCommand::Off]);
        assert!(core.outbox[0].is_once());
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_moderator_never_sends() {
        let config = Config::default();
        let mut core = session_core("me", &config, vec![peer("me", Role::Participant)]);

        core.handle_action(LocalAction::SetFollowMeEnabled(true), now());
        core.handle_action(LocalAction::SetTileView(true), now());
        tokio::time::advance(Duration::from_secs(1)).await;
        core.on_deadline(now());
        assert!(core.outbox.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_joiner_gets_update_and_delayed_resend() {
        let config = moderator_config(true);
        let mut core = session_core("me", &config, vec![peer("me", Role::Moderator)]);
        tokio::time::advance(Duration::from_millis(100)).await;
        core.on_deadline(now());
        core.outbox.clear();

        let joined = now();
        core.handle_event(ClientEvent::ParticipantJoined(peer("late", Role::Participant)), joined, Utc::now());

        let mut sent_at = Vec::new();
        for _ in 0..40 {
            tokio::time::advance(Duration::from_millis(100)).await;
            core.on_deadline(now());
            if !core.outbox.is_empty() {
                sent_at.push((now() - joined).as_millis());
                core.outbox.clear();
            }
        }

        assert_eq!(sent_at, vec![100, 3000]);
        assert!(core.next_deadline().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_follower_keeps_its_own_page_size() {
        let config = Config::default();
        let mut peers = vec![peer("me", Role::Participant), peer("mod", Role::Moderator)];
        peers.extend((0..20).map(|i| peer(&format!("p{:02}", i), Role::Participant)));
        let mut core = session_core("me", &config, peers);
        assert_eq!(core.layout.pagination.page_size, 9);
        assert_eq!(core.layout.page.total_pages, 3);

        let event = ClientEvent::Command {
            name: FOLLOW_ME_COMMAND.to_string(),
            sender: "mod".into(),
            attributes: vmeet_core::follow_me::CommandAttributes::new(),
            value: Some(r#"{"order":["displayName"],"current":4,"pageSize":2,"totalPages":11}"#.into()),
        };
        assert!(core.handle_event(event, now(), Utc::now()));

        assert_eq!(core.layout.pagination.order, vec![vmeet_core::SortKey::DisplayName]);
        assert_eq!(core.layout.pagination.page_size, 9);
        assert_eq!(core.layout.pagination.current, 1);
        assert_eq!(core.layout.page.total_pages, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_follower_applies_and_pins_on_join() {
        let config = Config::default();
        let mut core = session_core(
            "me",
            &config,
            vec![peer("me", Role::Participant), peer("mod", Role::Moderator)],
        );

        let mut attributes = vmeet_core::follow_me::CommandAttributes::new();
        attributes.insert("tileViewEnabled".into(), "true".into());
        attributes.insert("nextOnStage".into(), "later".into());
        let event = ClientEvent::Command {
            name: FOLLOW_ME_COMMAND.to_string(),
            sender: "mod".into(),
            attributes,
            value: None,
        };
        assert!(core.handle_event(event, now(), Utc::now()));

        assert!(core.layout.tile_view_enabled);
        assert_eq!(core.receiver.mode(), &FollowerMode::Following("mod".into()));
        assert_eq!(core.roster.pinned(), None);
        assert!(core.next_deadline().is_some());

        core.handle_event(ClientEvent::ParticipantJoined(peer("later", Role::Participant)), now(), Utc::now());
        assert_eq!(core.roster.pinned(), Some(&ParticipantId::from("later")));
        assert_eq!(core.receiver.pending_pin(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_leave_closes_ledger_entry() {
        let config = Config::default();
        let mut core = session_core(
            "me",
            &config,
            vec![peer("me", Role::Participant), peer("a", Role::Participant)],
        );

        core.handle_event(
            ClientEvent::ParticipantLeft {
                participant_id: "a".into(),
            },
            now(),
            Utc::now(),
        );
        let entry = core
            .ledger
            .entries()
            .iter()
            .find(|e| e.participant_id.as_str() == "a")
            .unwrap();
        assert!(!entry.is_open());
        assert!(!core.roster.contains(&"a".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_ends_session() {
        let config = Config::default();
        let mut core = session_core("me", &config, vec![peer("me", Role::Participant)]);
        assert!(!core.handle_event(ClientEvent::Disconnected, now(), Utc::now()));
    }

    async fn wait_for<F>(state: &ConferenceState, mut done: F)
    where
        F: FnMut(&LayoutState, &Roster) -> bool,
    {
        for _ in 0..200 {
            let layout = state.layout().await;
            let roster = state.roster().await;
            if done(&layout, &roster) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_end_to_end_follow_me() {
        let server = Server::start(SocketAddr::from(([127, 0, 0, 1], 0)), String::new(), 8)
            .await
            .unwrap();

        let mut moderator_config = moderator_config(true);
        moderator_config.participant.display_name = "mod".into();
        let moderator = Session::join(server.addr(), &moderator_config).await.unwrap();

        let mut follower_config = Config::default();
        follower_config.participant.display_name = "follower".into();
        let follower = Session::join(server.addr(), &follower_config).await.unwrap();

        let mut other_config = Config::default();
        other_config.participant.display_name = "other".into();
        let other = Session::join(server.addr(), &other_config).await.unwrap();
        let other_id = other.local_id().clone();

        wait_for(moderator.state(), |_, roster| roster.len() == 3).await;

        moderator.act(LocalAction::SetTileView(true)).await.unwrap();
        moderator
            .act(LocalAction::Pin(Some(other_id.clone())))
            .await
            .unwrap();

        wait_for(follower.state(), |layout, roster| {
            layout.tile_view_enabled && roster.pinned() == Some(&other_id)
        })
        .await;
        assert_eq!(
            follower.state().follow_me().await.moderator_id.as_ref(),
            Some(moderator.local_id())
        );

        // the moderator never follows itself
        assert!(moderator.state().follow_me().await.moderator_id.is_none());

        moderator
            .act(LocalAction::SetFollowMeEnabled(false))
            .await
            .unwrap();
        let follower_state = follower.state().clone();
        for _ in 0..200 {
            if follower_state.follow_me().await.moderator_id.is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(follower_state.follow_me().await.moderator_id.is_none());
        // off does not undo what was applied
        assert!(follower_state.layout().await.tile_view_enabled);

        other.leave().await;
        follower.leave().await;
        moderator.leave().await;
        server.shutdown();
    }

    #[tokio::test]
    async fn test_late_joiner_receives_sticky_state() {
        let server = Server::start(SocketAddr::from(([127, 0, 0, 1], 0)), String::new(), 8)
            .await
            .unwrap();

        let moderator = Session::join(server.addr(), &moderator_config(true)).await.unwrap();
        moderator
            .act(LocalAction::SetFilmstripVisible(false))
            .await
            .unwrap();
        // let the debounce window pass so the command reaches the relay
        tokio::time::sleep(Duration::from_millis(300)).await;

        let late = Session::join(server.addr(), &Config::default()).await.unwrap();
        wait_for(late.state(), |layout, _| !layout.filmstrip_visible).await;

        late.leave().await;
        moderator.leave().await;
        server.shutdown();
    }

    #[tokio::test]
    async fn test_join_rejected_with_wrong_token() {
        let server = Server::start(SocketAddr::from(([127, 0, 0, 1], 0)), "secret".into(), 8)
            .await
            .unwrap();

        let result = Session::join(server.addr(), &Config::default()).await;
        assert!(matches!(result, Err(Error::Rejected(_))));
        server.shutdown();
    }
}
