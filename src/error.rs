//! Unified error types for the framelink client.
//!
//! Every fallible operation surfaces one [`Error`] synchronously to the
//! caller that triggered it. Nothing is retried inside the crate.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Errors returned by link operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No device matching the selector was discovered within the timeout.
    #[error("no matching device found")]
    NoDeviceFound,

    /// The transport failed to establish the connection.
    #[error("error connecting: {0}")]
    ConnectFailed(String),

    /// The inbound notification stream could not be established.
    #[error("error subscribing for notifications: {0}")]
    SubscriptionFailed(String),

    /// The operation needs a live session and there is none.
    #[error("not connected")]
    NotConnected,

    /// A chunk or unsplit payload exceeds the current capacity.
    #[error("payload length {len} is too large (max {max})")]
    PayloadTooLarge {
        /// Offending length in bytes.
        len: usize,
        /// Capacity that was exceeded.
        max: usize,
    },

    /// Chunk size or configuration parameters are inconsistent.
    #[error("configuration: {0}")]
    Configuration(&'static str),

    /// An inbound chunk sequence could not be reassembled.
    #[error("malformed frame: {0}")]
    MalformedFrame(FrameError),

    /// An armed wait exceeded its deadline.
    #[error("device didn't respond")]
    DeviceTimeout,

    /// The session dropped while an operation was in flight.
    #[error("disconnected")]
    Disconnected,

    /// A reply is already awaited on this channel.
    #[error("a reply is already pending on the {0} channel")]
    ReplyPending(ChannelKind),

    /// A transport write failed; the send was aborted.
    #[error("transport: {0}")]
    Transport(String),

    /// Local I/O failure (reading a file for upload).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True when reassembly merely has not received every byte yet.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Self::MalformedFrame(FrameError::Incomplete { .. }))
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        Self::MalformedFrame(e)
    }
}

// ---------------------------------------------------------------------------
// Frame errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// The first chunk of a message is shorter than its 3-byte header.
    HeaderTooShort,
    /// A continuation chunk carries no tag byte.
    EmptyChunk,
    /// A continuation chunk carries a different tag than the message.
    TagMismatch { expected: u8, found: u8 },
    /// More payload bytes arrived than the header declared.
    Overrun { declared: usize, received: usize },
    /// The chunk sequence ended before the declared length was reached.
    Incomplete { declared: usize, received: usize },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HeaderTooShort => write!(f, "first chunk shorter than 3-byte header"),
            Self::EmptyChunk => write!(f, "continuation chunk has no tag"),
            Self::TagMismatch { expected, found } => {
                write!(f, "tag mismatch (expected {expected}, found {found})")
            }
            Self::Overrun { declared, received } => {
                write!(f, "received {received} bytes, header declared {declared}")
            }
            Self::Incomplete { declared, received } => {
                write!(f, "incomplete: {received} of {declared} bytes")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Channel identity
// ---------------------------------------------------------------------------

/// One of the two logical streams multiplexed over the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Script text channel (print replies).
    Script,
    /// Binary data channel.
    Data,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Script => write!(f, "script"),
            Self::Data => write!(f, "data"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
