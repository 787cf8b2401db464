use std::fmt;
use std::io;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

use crate::BoxError;

/// The stage or operation a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The target host and port could not be resolved to an address.
    Resolution,

    /// No resolved address accepted a TCP connection.
    TransportConnect,

    /// The local TLS setup was rejected, e.g. the host is not a valid server name.
    TlsConfiguration,

    /// The TLS handshake with the remote peer failed.
    TlsHandshake,

    /// The WebSocket upgrade was refused or broken.
    ProtocolHandshake,

    /// Sending a data or ping frame failed.
    Write,

    /// Receiving a frame failed, or the peer closed the connection.
    Read,

    /// The closing handshake failed.
    Close,

    /// An operation was attempted on a connection which is not open.
    Precondition,

    /// The reactor did not drive the operation to completion.
    Scheduling,

    /// A connection was requested for an unsupported scheme.
    Configuration,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Resolution => "resolution failure",
            ErrorKind::TransportConnect => "transport connect failure",
            ErrorKind::TlsConfiguration => "tls configuration failure",
            ErrorKind::TlsHandshake => "tls handshake failure",
            ErrorKind::ProtocolHandshake => "protocol handshake failure",
            ErrorKind::Write => "write failure",
            ErrorKind::Read => "read failure",
            ErrorKind::Close => "close failure",
            ErrorKind::Precondition => "precondition failure",
            ErrorKind::Scheduling => "scheduling failure",
            ErrorKind::Configuration => "configuration error",
        };
        f.write_str(name)
    }
}

/// Error recorded by a connection operation.
///
/// The message names the operation and the target; the source, when present, is the
/// underlying transport, TLS or protocol error.
#[derive(Debug, Error)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl Error {
    /// Create an error without an underlying cause.
    pub(crate) fn new<S>(kind: ErrorKind, message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Adapter for `map_err` which attaches the mapped error as the source.
    pub(crate) fn msg<S, E>(kind: ErrorKind, message: S) -> impl FnOnce(E) -> Self
    where
        S: Into<String>,
        E: Into<BoxError>,
    {
        move |error| Self {
            kind,
            message: message.into(),
            source: Some(error.into()),
        }
    }

    pub(crate) fn precondition<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Precondition, message)
    }

    pub(crate) fn scheduling<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Scheduling, message)
    }

    /// The stage that failed.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The operation-level description, without the underlying cause.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The I/O error kind at the bottom of the source chain, if the failure came from I/O.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        let mut source = self
            .source
            .as_deref()
            .map(|err| err as &(dyn std::error::Error + 'static));
        while let Some(err) = source {
            if let Some(io) = err.downcast_ref::<io::Error>() {
                return Some(io.kind());
            }
            if let Some(tungstenite::Error::Io(io)) = err.downcast_ref::<tungstenite::Error>() {
                return Some(io.kind());
            }
            source = err.source();
        }
        None
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref source) = self.source {
            write!(f, "{}: {}", self.message, source)
        } else {
            write!(f, "{}", self.message)
        }
    }
}
