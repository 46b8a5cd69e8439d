//! TCP relay standing in for the conferencing engine's command bus
//!
//! Tracks who is in the conference and with which role, fans commands out
//! to every participant (sender included), and replays each sender's latest
//! sticky command to participants who join later.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use rand::Rng;
use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, error, info, warn};
use vmeet_core::{ParticipantId, Role};

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::{Message, PeerInfo};

/// Per-peer outbound queue depth
const PEER_QUEUE: usize = 64;

/// Connected participant state
struct Peer {
    info: PeerInfo,
    tx: mpsc::Sender<Message>,
}

/// Relay state shared across tasks
struct ServerState {
    token: String,
    max_participants: usize,
    peers: HashMap<ParticipantId, Peer>,
    /// Latest replayable command per (sender, command name)
    sticky: HashMap<(ParticipantId, String), Message>,
}

impl ServerState {
    fn participant_list(&self) -> Vec<PeerInfo> {
        self.peers.values().map(|p| p.info.clone()).collect()
    }

    fn role_of(&self, id: &ParticipantId) -> Option<Role> {
        self.peers.get(id).map(|p| p.info.role)
    }
}

/// Relay handle
pub struct Server {
    addr: SocketAddr,
    state: Arc<RwLock<ServerState>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Start a relay on `addr`; port 0 picks a free port.
    ///
    /// An empty `token` accepts any join.
    pub async fn start(addr: SocketAddr, token: String, max_participants: usize) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let bound_addr = listener.local_addr()?;

        info!(addr = %bound_addr, "Relay started");

        let (shutdown_tx, _) = broadcast::channel(1);

        let state = Arc::new(RwLock::new(ServerState {
            token,
            max_participants,
            peers: HashMap::new(),
            sticky: HashMap::new(),
        }));

        let state_clone = state.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(accept_loop(listener, state_clone, shutdown_rx));

        Ok(Server {
            addr: bound_addr,
            state,
            shutdown_tx,
        })
    }

    /// Get the relay's bound address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get current participant list
    pub async fn participants(&self) -> Vec<PeerInfo> {
        self.state.read().await.participant_list()
    }

    /// Stop accepting connections and tell everyone the relay is going away
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        info!("Relay shutdown initiated");
    }
}

/// Short random id, unique within this relay
fn generate_participant_id(taken: &HashMap<ParticipantId, Peer>) -> ParticipantId {
    let mut rng = rand::thread_rng();
    loop {
        let id = ParticipantId::new(format!("{:08x}", rng.gen::<u32>()));
        if !taken.contains_key(&id) {
            return id;
        }
    }
}

/// Accept incoming connections
async fn accept_loop(
    listener: TcpListener,
    state: Arc<RwLock<ServerState>>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        debug!(addr = %addr, "New connection");
                        let state = state.clone();
                        tokio::spawn(handle_connection(stream, addr, state));
                    }
                    Err(e) => {
                        error!(error = %e, "Accept failed");
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                broadcast_to_peers(&state, Message::ServerShutdown, None).await;
                info!("Accept loop shutting down");
                break;
            }
        }
    }
}

/// Handle a single participant connection
async fn handle_connection(stream: TcpStream, addr: SocketAddr, state: Arc<RwLock<ServerState>>) {
    let (mut reader, writer) = tokio::io::split(stream);

    let (msg_tx, msg_rx) = mpsc::channel(PEER_QUEUE);
    let writer_handle = tokio::spawn(writer_task(writer, msg_rx));

    let info = match handle_join(&mut reader, &state, msg_tx.clone()).await {
        Ok(info) => info,
        Err(e) => {
            warn!(addr = %addr, error = %e, "Join failed");
            let reason = match e {
                Error::Rejected(reason) => reason,
                other => other.to_string(),
            };
            let _ = msg_tx.send(Message::JoinRejected { reason }).await;
            // writer drains the rejection, then stops with the last sender
            drop(msg_tx);
            let _ = writer_handle.await;
            return;
        }
    };
    drop(msg_tx);
    let participant_id = info.participant_id.clone();

    info!(addr = %addr, participant_id = %participant_id, "Participant joined");

    broadcast_to_peers(&state, Message::ParticipantJoined(info), Some(&participant_id)).await;

    loop {
        match read_frame::<_, Message>(&mut reader).await {
            Ok(msg) => {
                handle_message(msg, &participant_id, &state).await;
            }
            Err(Error::ConnectionClosed) => {
                debug!(participant_id = %participant_id, "Connection closed");
                break;
            }
            Err(e) => {
                warn!(participant_id = %participant_id, error = %e, "Read error");
                break;
            }
        }
    }

    writer_handle.abort();
    remove_peer(&state, &participant_id).await;

    info!(participant_id = %participant_id, "Participant disconnected");
}

/// Validate the join request, register the peer and queue its welcome.
///
/// The welcome and sticky replays are queued under the write lock, so no
/// broadcast can reach the new peer ahead of `JoinAccepted`. The writer task
/// is already draining the queue, so a long replay cannot stall here.
async fn handle_join(
    reader: &mut ReadHalf<TcpStream>,
    state: &Arc<RwLock<ServerState>>,
    tx: mpsc::Sender<Message>,
) -> Result<PeerInfo> {
    let msg = read_frame::<_, Message>(reader).await?;

    let Message::JoinRequest {
        display_name,
        email,
        stats_id,
        role,
        token,
    } = msg
    else {
        return Err(Error::Protocol("Expected JoinRequest".into()));
    };

    let mut s = state.write().await;

    if !s.token.is_empty() && token != s.token {
        return Err(Error::Rejected("Invalid token".into()));
    }

    if s.peers.len() >= s.max_participants {
        return Err(Error::ServerFull);
    }

    let participant_id = generate_participant_id(&s.peers);
    let info = PeerInfo {
        participant_id: participant_id.clone(),
        stats_id,
        display_name,
        email,
        role,
        audio_muted: false,
        video_muted: false,
    };

    s.peers.insert(
        participant_id.clone(),
        Peer {
            info: info.clone(),
            tx: tx.clone(),
        },
    );

    let welcome = Message::JoinAccepted {
        participant_id,
        participants: s.participant_list(),
    };
    tx.send(welcome).await.map_err(|_| Error::ConnectionClosed)?;

    for replay in s.sticky.values() {
        tx.send(replay.clone())
            .await
            .map_err(|_| Error::ConnectionClosed)?;
    }

    Ok(info)
}

/// Writer task - sends messages to the participant
async fn writer_task(mut writer: WriteHalf<TcpStream>, mut rx: mpsc::Receiver<Message>) {
    while let Some(msg) = rx.recv().await {
        if let Err(e) = write_frame(&mut writer, &msg).await {
            debug!(error = %e, "Write failed");
            break;
        }
    }
}

/// Handle an incoming message
async fn handle_message(msg: Message, sender_id: &ParticipantId, state: &Arc<RwLock<ServerState>>) {
    match msg {
        Message::SendCommand {
            name,
            attributes,
            value,
            once,
        } => {
            let command = Message::Command {
                name: name.clone(),
                sender: sender_id.clone(),
                attributes,
                value,
            };

            {
                let mut s = state.write().await;
                let key = (sender_id.clone(), name);
                if once {
                    s.sticky.remove(&key);
                } else {
                    s.sticky.insert(key, command.clone());
                }
            }

            broadcast_to_peers(state, command, None).await;
        }
        Message::GrantModerator { participant_id } => {
            let granted = {
                let mut s = state.write().await;
                if s.role_of(sender_id) != Some(Role::Moderator) {
                    warn!(sender_id = %sender_id, "Grant moderator from non-moderator");
                    false
                } else if let Some(peer) = s.peers.get_mut(&participant_id) {
                    peer.info.role = Role::Moderator;
                    true
                } else {
                    debug!(participant_id = %participant_id, "Grant moderator for unknown participant");
                    false
                }
            };

            if granted {
                broadcast_to_peers(
                    state,
                    Message::RoleChanged {
                        participant_id,
                        role: Role::Moderator,
                    },
                    None,
                )
                .await;
            }
        }
        Message::SetMediaState {
            audio_muted,
            video_muted,
        } => {
            {
                let mut s = state.write().await;
                if let Some(peer) = s.peers.get_mut(sender_id) {
                    peer.info.audio_muted = audio_muted;
                    peer.info.video_muted = video_muted;
                }
            }

            broadcast_to_peers(
                state,
                Message::MediaStateChanged {
                    participant_id: sender_id.clone(),
                    audio_muted,
                    video_muted,
                },
                None,
            )
            .await;
        }
        _ => {
            debug!(sender_id = %sender_id, "Ignoring unexpected message type");
        }
    }
}

/// Remove a participant, forget its sticky commands and tell everyone
async fn remove_peer(state: &Arc<RwLock<ServerState>>, participant_id: &ParticipantId) {
    {
        let mut s = state.write().await;
        s.peers.remove(participant_id);
        s.sticky.retain(|(sender, _), _| sender != participant_id);
    }

    broadcast_to_peers(
        state,
        Message::ParticipantLeft {
            participant_id: participant_id.clone(),
        },
        None,
    )
    .await;
}

/// Broadcast to all peers, optionally excluding one
async fn broadcast_to_peers(
    state: &Arc<RwLock<ServerState>>,
    msg: Message,
    except: Option<&ParticipantId>,
) {
    let s = state.read().await;
    for (id, peer) in &s.peers {
        if except != Some(id) && peer.tx.send(msg.clone()).await.is_err() {
            debug!(participant_id = %id, "Failed to queue message for participant");
        }
    }
}
