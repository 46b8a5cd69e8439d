//! Session error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Relay error: {0}")]
    Net(#[from] vmeet_net::Error),

    #[error("Join rejected: {0}")]
    Rejected(String),

    #[error("Relay closed the connection before the join completed")]
    JoinInterrupted,

    #[error("Session has ended")]
    SessionEnded,

    #[error("Invalid relay address: {0}")]
    InvalidAddress(String),
}

pub type Result<T> = std::result::Result<T, Error>;
