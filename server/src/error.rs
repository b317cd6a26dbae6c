use shared::ClientId;
use thiserror::Error;

/// Rejections from `Game` bookkeeping.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("connection {0} is already registered")]
    DuplicateConnection(ClientId),
}

/// Failures handing a packet to a client's transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("outgoing queue is closed")]
    QueueClosed,
    #[error("failed to encode packet: {0}")]
    Encode(#[from] bincode::Error),
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid bind address: {0}")]
    AddrParse(#[from] std::net::AddrParseError),
}
