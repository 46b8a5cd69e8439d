//! TCP client for joining a conference through the relay

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info, warn};
use vmeet_core::follow_me::CommandAttributes;
use vmeet_core::{ParticipantId, Role, StatsId};

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::{Message, PeerInfo};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Who is joining and with which credentials
#[derive(Debug, Clone)]
pub struct JoinParams {
    pub display_name: String,
    pub email: Option<String>,
    pub stats_id: Option<StatsId>,
    pub role: Role,
    pub token: String,
}

/// Event received from the relay
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Successfully joined; `participants` includes the local one
    Joined {
        participant_id: ParticipantId,
        participants: Vec<PeerInfo>,
    },
    /// Join was rejected
    JoinRejected { reason: String },
    ParticipantJoined(PeerInfo),
    ParticipantLeft { participant_id: ParticipantId },
    RoleChanged {
        participant_id: ParticipantId,
        role: Role,
    },
    MediaStateChanged {
        participant_id: ParticipantId,
        audio_muted: bool,
        video_muted: bool,
    },
    /// A command from some participant, possibly ourselves
    Command {
        name: String,
        sender: ParticipantId,
        attributes: CommandAttributes,
        value: Option<String>,
    },
    /// Connection lost
    Disconnected,
    /// Relay is shutting down
    ServerShutdown,
}

/// Client handle for network operations
pub struct Client {
    state: Arc<RwLock<ClientState>>,
    event_rx: mpsc::Receiver<ClientEvent>,
    cmd_tx: mpsc::Sender<ClientCommand>,
}

struct ClientState {
    connection: ConnectionState,
    local_id: Option<ParticipantId>,
}

enum ClientCommand {
    Send(Message),
    Disconnect,
}

impl Client {
    /// Connect to a relay and send the join request.
    ///
    /// The outcome arrives as the first event: `Joined` or `JoinRejected`.
    pub async fn connect(addr: SocketAddr, params: JoinParams) -> Result<Self> {
        info!(addr = %addr, display_name = %params.display_name, "Connecting to relay");

        let stream = TcpStream::connect(addr).await?;
        let (reader, mut writer) = tokio::io::split(stream);

        let join_msg = Message::JoinRequest {
            display_name: params.display_name,
            email: params.email,
            stats_id: params.stats_id,
            role: params.role,
            token: params.token,
        };
        write_frame(&mut writer, &join_msg).await?;

        let state = Arc::new(RwLock::new(ClientState {
            connection: ConnectionState::Connecting,
            local_id: None,
        }));

        let (event_tx, event_rx) = mpsc::channel(64);
        let (cmd_tx, cmd_rx) = mpsc::channel(64);

        let state_clone = state.clone();
        tokio::spawn(connection_task(
            reader,
            writer,
            state_clone,
            event_tx,
            cmd_rx,
        ));

        Ok(Client {
            state,
            event_rx,
            cmd_tx,
        })
    }

    /// Get the next relay event
    pub async fn next_event(&mut self) -> Option<ClientEvent> {
        self.event_rx.recv().await
    }

    async fn send(&self, msg: Message) -> Result<()> {
        self.cmd_tx
            .send(ClientCommand::Send(msg))
            .await
            .map_err(|_| Error::NotConnected)
    }

    /// Send a command that late joiners will also receive
    pub async fn send_command(
        &self,
        name: &str,
        attributes: CommandAttributes,
        value: Option<String>,
    ) -> Result<()> {
        self.send(Message::SendCommand {
            name: name.to_string(),
            attributes,
            value,
            once: false,
        })
        .await
    }

    /// Send a command to current participants only.
    ///
    /// Also withdraws any earlier replayable command with the same name.
    pub async fn send_command_once(
        &self,
        name: &str,
        attributes: CommandAttributes,
        value: Option<String>,
    ) -> Result<()> {
        self.send(Message::SendCommand {
            name: name.to_string(),
            attributes,
            value,
            once: true,
        })
        .await
    }

    pub async fn grant_moderator(&self, participant_id: ParticipantId) -> Result<()> {
        self.send(Message::GrantModerator { participant_id }).await
    }

    pub async fn set_media_state(&self, audio_muted: bool, video_muted: bool) -> Result<()> {
        self.send(Message::SetMediaState {
            audio_muted,
            video_muted,
        })
        .await
    }

    /// Disconnect from the relay
    pub async fn disconnect(&self) {
        let _ = self.cmd_tx.send(ClientCommand::Disconnect).await;
    }

    /// Get current connection state
    pub async fn connection_state(&self) -> ConnectionState {
        self.state.read().await.connection
    }

    /// Id assigned by the relay, once joined
    pub async fn local_id(&self) -> Option<ParticipantId> {
        self.state.read().await.local_id.clone()
    }
}

/// Main connection task
async fn connection_task(
    mut reader: ReadHalf<TcpStream>,
    mut writer: WriteHalf<TcpStream>,
    state: Arc<RwLock<ClientState>>,
    event_tx: mpsc::Sender<ClientEvent>,
    mut cmd_rx: mpsc::Receiver<ClientCommand>,
) {
    match read_frame::<_, Message>(&mut reader).await {
        Ok(Message::JoinAccepted {
            participant_id,
            participants,
        }) => {
            {
                let mut s = state.write().await;
                s.connection = ConnectionState::Connected;
                s.local_id = Some(participant_id.clone());
            }
            info!(participant_id = %participant_id, count = participants.len(), "Joined conference");
            let _ = event_tx
                .send(ClientEvent::Joined {
                    participant_id,
                    participants,
                })
                .await;
        }
        Ok(Message::JoinRejected { reason }) => {
            {
                let mut s = state.write().await;
                s.connection = ConnectionState::Disconnected;
            }
            warn!(reason = %reason, "Join rejected");
            let _ = event_tx.send(ClientEvent::JoinRejected { reason }).await;
            return;
        }
        Ok(_) => {
            warn!("Unexpected first message");
            let mut s = state.write().await;
            s.connection = ConnectionState::Disconnected;
            return;
        }
        Err(e) => {
            error!(error = %e, "Failed to read join response");
            let mut s = state.write().await;
            s.connection = ConnectionState::Disconnected;
            return;
        }
    }

    loop {
        tokio::select! {
            result = read_frame::<_, Message>(&mut reader) => {
                match result {
                    Ok(msg) => {
                        handle_relay_message(msg, &event_tx).await;
                    }
                    Err(Error::ConnectionClosed) => {
                        debug!("Relay closed connection");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "Read error");
                        break;
                    }
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ClientCommand::Send(msg)) => {
                        if let Err(e) = write_frame(&mut writer, &msg).await {
                            warn!(error = %e, "Write error");
                            break;
                        }
                    }
                    Some(ClientCommand::Disconnect) | None => {
                        debug!("Disconnect requested");
                        break;
                    }
                }
            }
        }
    }

    {
        let mut s = state.write().await;
        s.connection = ConnectionState::Disconnected;
    }
    let _ = event_tx.send(ClientEvent::Disconnected).await;
    info!("Disconnected from relay");
}

/// Translate a relay message into a client event
async fn handle_relay_message(msg: Message, event_tx: &mpsc::Sender<ClientEvent>) {
    let event = match msg {
        Message::ParticipantJoined(info) => ClientEvent::ParticipantJoined(info),
        Message::ParticipantLeft { participant_id } => {
            ClientEvent::ParticipantLeft { participant_id }
        }
        Message::RoleChanged {
            participant_id,
            role,
        } => ClientEvent::RoleChanged {
            participant_id,
            role,
        },
        Message::MediaStateChanged {
            participant_id,
            audio_muted,
            video_muted,
        } => ClientEvent::MediaStateChanged {
            participant_id,
            audio_muted,
            video_muted,
        },
        Message::Command {
            name,
            sender,
            attributes,
            value,
        } => ClientEvent::Command {
            name,
            sender,
            attributes,
            value,
        },
        Message::ServerShutdown => ClientEvent::ServerShutdown,
        _ => {
            debug!("Ignoring unexpected message");
            return;
        }
    };
    let _ = event_tx.send(event).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::Server;

    fn params(name: &str, role: Role, token: &str) -> JoinParams {
        JoinParams {
            display_name: name.to_string(),
            email: None,
            stats_id: Some(StatsId::new(format!("{}-stats", name))),
            role,
            token: token.to_string(),
        }
    }

    async fn start_server(token: &str) -> Server {
        Server::start(
            SocketAddr::from(([127, 0, 0, 1], 0)),
            token.to_string(),
            8,
        )
        .await
        .unwrap()
    }

    async fn joined(client: &mut Client) -> (ParticipantId, Vec<PeerInfo>) {
        match client.next_event().await {
            Some(ClientEvent::Joined {
                participant_id,
                participants,
            }) => (participant_id, participants),
            other => panic!("Expected Joined event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_client_connect() {
        let server = start_server("test-token").await;

        let mut client = Client::connect(server.addr(), params("alice", Role::Moderator, "test-token"))
            .await
            .unwrap();

        let (id, participants) = joined(&mut client).await;
        assert_eq!(participants.len(), 1);
        assert_eq!(participants[0].participant_id, id);
        assert_eq!(client.local_id().await, Some(id));
        assert_eq!(client.connection_state().await, ConnectionState::Connected);

        client.disconnect().await;
        assert!(matches!(client.next_event().await, Some(ClientEvent::Disconnected)));
        server.shutdown();
    }

    #[tokio::test]
    async fn test_join_rejected_event() {
        let server = start_server("right").await;

        let mut client = Client::connect(server.addr(), params("eve", Role::Participant, "wrong"))
            .await
            .unwrap();

        assert!(matches!(
            client.next_event().await,
            Some(ClientEvent::JoinRejected { .. })
        ));
        assert_eq!(client.connection_state().await, ConnectionState::Disconnected);
        server.shutdown();
    }

    #[tokio::test]
    async fn test_command_reaches_everyone() {
        let server = start_server("").await;

        let mut moderator = Client::connect(server.addr(), params("mod", Role::Moderator, ""))
            .await
            .unwrap();
        let (moderator_id, _) = joined(&mut moderator).await;

        let mut guest = Client::connect(server.addr(), params("guest", Role::Participant, ""))
            .await
            .unwrap();
        joined(&mut guest).await;
        assert!(matches!(
            moderator.next_event().await,
            Some(ClientEvent::ParticipantJoined(_))
        ));

        let mut attributes = CommandAttributes::new();
        attributes.insert("filmstripVisible".into(), "false".into());
        moderator
            .send_command("follow-me", attributes, None)
            .await
            .unwrap();

        for client in [&mut moderator, &mut guest] {
            match client.next_event().await {
                Some(ClientEvent::Command { name, sender, attributes, .. }) => {
                    assert_eq!(name, "follow-me");
                    assert_eq!(sender, moderator_id);
                    assert_eq!(attributes["filmstripVisible"], "false");
                }
                other => panic!("Expected command, got {:?}", other),
            }
        }

        server.shutdown();
    }

    #[tokio::test]
    async fn test_only_moderators_grant() {
        let server = start_server("").await;

        let mut moderator = Client::connect(server.addr(), params("mod", Role::Moderator, ""))
            .await
            .unwrap();
        joined(&mut moderator).await;

        let mut other = Client::connect(server.addr(), params("other", Role::Participant, ""))
            .await
            .unwrap();
        let (other_id, _) = joined(&mut other).await;
        moderator.next_event().await;

        // ignored: sender is not a moderator
        other.grant_moderator(other_id.clone()).await.unwrap();
        moderator.grant_moderator(other_id.clone()).await.unwrap();

        match other.next_event().await {
            Some(ClientEvent::RoleChanged { participant_id, role }) => {
                assert_eq!(participant_id, other_id);
                assert_eq!(role, Role::Moderator);
            }
            e => panic!("Expected role change, got {:?}", e),
        }

        server.shutdown();
    }

    #[tokio::test]
    async fn test_leave_is_announced() {
        let server = start_server("").await;

        let mut stays = Client::connect(server.addr(), params("stays", Role::Participant, ""))
            .await
            .unwrap();
        joined(&mut stays).await;

        let mut leaves = Client::connect(server.addr(), params("leaves", Role::Participant, ""))
            .await
            .unwrap();
        let (leaves_id, _) = joined(&mut leaves).await;
        stays.next_event().await;

        leaves.disconnect().await;

        match stays.next_event().await {
            Some(ClientEvent::ParticipantLeft { participant_id }) => {
                assert_eq!(participant_id, leaves_id)
            }
            e => panic!("Expected leave, got {:?}", e),
        }

        server.shutdown();
    }
}
