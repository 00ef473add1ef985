//! Transport error taxonomy.  None of these are fatal: the core logs them and
//! carries on, and the transport's reconnect loop owns recovery.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    /// A send was attempted while no link to the companion is open.
    #[error("peer link is not open")]
    NotReady,

    /// The writer side of an open link has gone away.
    #[error("peer link closed")]
    Closed,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not encode request: {0}")]
    Encode(String),

    #[error("undecodable frame: {0}")]
    Decode(String),

    /// The length header announced more than we are willing to buffer.
    #[error("frame of {0} bytes exceeds limit")]
    FrameTooLarge(usize),
}
