use std::io;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum HeaderError {
    #[error("Buffer too small: expected {expected} bytes, found {found} bytes")]
    BufferTooSmall { expected: usize, found: usize },

    #[error("Invalid data offset: {0} words")]
    InvalidDataOffset(u8),

    #[error("Options too long: room for {max} bytes, found {found} bytes")]
    OptionsTooLong { max: usize, found: usize },

    #[error("Bad checksum: expected {expected:#06x}, found {found:#06x}")]
    BadChecksum { expected: u16, found: u16 },
}

#[derive(Error, Debug)]
pub enum TcpError {
    #[error("Send failure: {0}")]
    SendFailure(#[source] io::Error),

    #[error("Receive failure: {0}")]
    ReceiveFailure(#[source] io::Error),

    #[error("Handshake timeout after {attempts} receive attempts ({elapsed:?})")]
    HandshakeTimeout { attempts: u32, elapsed: Duration },

    #[error("Malformed segment: {0}")]
    MalformedSegment(#[from] HeaderError),

    #[error("Session unavailable: {0}")]
    SessionUnavailable(#[source] io::Error),

    #[error("Connection timeout")]
    ConnectionTimeout, // ETIMEDOUT

    #[error("Connection reset")]
    ConnectionReset, // ECONNRESET
}
