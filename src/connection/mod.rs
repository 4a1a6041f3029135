pub mod websocket;

#[cfg(test)]
pub(crate) mod test_server;

use std::io;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Close code recorded when the peer closes without a status code.
pub const CLOSE_NO_STATUS: u16 = 1005;
/// Close code recorded when the peer drops the connection without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// A data frame received from the peer.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    /// WebSocket opcode of the frame.
    pub fn opcode(&self) -> i64 {
        match self {
            Frame::Text(_) => 1,
            Frame::Binary(_) => 2,
        }
    }
}

/// Failure of a single transport operation, already sorted by cause.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("i/o timeout")]
    Timeout,
    #[error("connection closed by peer with code {code}: {reason}")]
    Closed { code: u16, reason: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("{0}")]
    Other(String),
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => TransportError::Timeout,
            io::ErrorKind::UnexpectedEof => TransportError::Closed {
                code: CLOSE_ABNORMAL,
                reason: err.to_string(),
            },
            _ => TransportError::Network(err.to_string()),
        }
    }
}

/// How a single read or write attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Timeout,
    PeerClosed(u16),
    NetworkError,
    OtherError,
}

/// Sorts the result of a transport operation into an [`Outcome`].
pub fn classify<T>(result: &Result<T, TransportError>) -> Outcome {
    match result {
        Ok(_) => Outcome::Success,
        Err(TransportError::Timeout) => Outcome::Timeout,
        Err(TransportError::Closed { code, .. }) => Outcome::PeerClosed(*code),
        Err(TransportError::Network(_)) => Outcome::NetworkError,
        Err(TransportError::Other(_)) => Outcome::OtherError,
    }
}

/// A connected full-duplex message channel.
///
/// Reads and writes block until they complete or the last deadline set for
/// their direction passes. Dropping the channel releases the connection.
pub trait Channel {
    fn set_read_deadline(&mut self, deadline: Instant) -> io::Result<()>;
    fn set_write_deadline(&mut self, deadline: Instant) -> io::Result<()>;

    /// Waits for the next data frame. A close frame from the peer is
    /// reported as [`TransportError::Closed`].
    fn read_frame(&mut self) -> Result<Frame, TransportError>;
    fn write_text(&mut self, text: &str) -> Result<(), TransportError>;

    /// Sends a normal closure control frame.
    fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens channels.
pub trait Dialer {
    type Channel: Channel;

    fn dial(&self, url: &str, handshake_timeout: Duration)
        -> Result<Self::Channel, TransportError>;
}
