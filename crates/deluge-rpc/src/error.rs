//! Error definitions for the RPC client.
//!
//! Two families live here: local failures (transport, compression, codec)
//! that end the session, and remote/protocol outcomes (a daemon-side
//! exception, an event frame, an unknown kind) that consume their frame and
//! leave the connection usable.

use std::fmt;
use std::io;

#[derive(Debug)]
pub enum Error {
    /// Socket-level failure. Fatal for the connection.
    Transport(io::Error),
    /// TLS setup or handshake failure.
    Tls(rustls::Error),
    /// Malformed rencode payload, or corrupt zlib input surfacing through
    /// the decode path. Framing is lost, so the connection is done.
    Codec(rencode::Error),
    /// The daemon raised an exception while handling the call.
    Remote { exception: String, message: String },
    /// The daemon pushed an event frame; this client has no subscriber API.
    EventNotSupported,
    /// The response discriminator was none of result/error/event.
    UnknownMessageType(i64),
    /// The response envelope did not have the expected shape.
    Protocol(&'static str),
    /// The response echoed a sequence number we did not send.
    SeqMismatch { expected: u64, got: u64 },
    /// The dial address could not be used as a TLS server name.
    InvalidAddress(String),
}

impl Error {
    /// Whether the session may keep using the connection after this error.
    /// Only a daemon-side exception or an unsupported message leaves the
    /// frame boundary intact.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Remote { .. } | Error::EventNotSupported | Error::UnknownMessageType(_),
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport(err) => write!(f, "transport error: {}", err),
            Error::Tls(err) => write!(f, "tls error: {}", err),
            Error::Codec(err) => write!(f, "codec error: {}", err),
            Error::Remote { exception, message } => write!(f, "{}: {}", exception, message),
            Error::EventNotSupported => write!(f, "event is not supported"),
            Error::UnknownMessageType(_) => write!(f, "unknown message type"),
            Error::Protocol(msg) => write!(f, "{}", msg),
            Error::SeqMismatch { expected, got } => {
                write!(f, "response out of sequence: expected {}, got {}", expected, got)
            }
            Error::InvalidAddress(address) => write!(f, "invalid server address: {}", address),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Transport(err)
    }
}

impl From<rencode::Error> for Error {
    fn from(err: rencode::Error) -> Self {
        Error::Codec(err)
    }
}

impl From<rustls::Error> for Error {
    fn from(err: rustls::Error) -> Self {
        Error::Tls(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
