//! Vmeet command-bus relay
//!
//! Stands in for the conferencing engine's generic command channel.
//!
//! # Architecture
//!
//! - **Server**: relay that tracks participants and fans commands out
//! - **Client**: one participant's connection to the relay
//! - **Protocol**: length-prefixed JSON messages
//!
//! # Usage
//!
//! ```ignore
//! let server = Server::start("127.0.0.1:0".parse()?, "token".into(), 64).await?;
//!
//! let mut client = Client::connect(server.addr(), JoinParams { .. }).await?;
//! while let Some(event) = client.next_event().await {
//!     match event {
//!         ClientEvent::Command { name, .. } => { /* dispatch */ }
//!         _ => {}
//!     }
//! }
//! ```

pub mod client;
pub mod error;
mod frame;
pub mod protocol;
pub mod server;

pub use client::{Client, ClientEvent, ConnectionState, JoinParams};
pub use error::{Error, Result};
pub use protocol::{Message, PeerInfo};
pub use server::Server;
pub use vmeet_core::config::DEFAULT_PORT;
