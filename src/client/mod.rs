//! Blocking WebSocket client connections.
//!
//! Every connection implements [`Socket`], the operation set shared by the plain and secure
//! variants. A connection is created idle, becomes open after a successful handshake
//! sequence (resolve, TCP connect, optional TLS handshake, WebSocket upgrade), and can be
//! reused for any number of reads, writes and pings until it is closed.
//!
//! Operations report success as a `bool` (or an `Option` for [`Socket::read`]) and record
//! the details of a failure in the connection's error slot, which can be inspected with
//! [`Socket::peek_error`], [`Socket::consume_error`] and [`Socket::error_code`].

mod base;
mod config;
pub mod conn;
mod error;

pub use self::base::{ConnectionState, PlainWebSocket, SecureWebSocket, WebSocketBase};
pub use self::config::ConnectionConfig;
pub use self::conn::transport::{default_tls_config, Plain, Secure, Transport};
pub use self::error::{Error, ErrorKind};

use crate::info::ConnectionInfo;
use crate::uri::Target;

/// The operations every WebSocket connection supports.
pub trait Socket {
    /// Parse `uri`, remember it as the target and run the handshake sequence.
    ///
    /// A non-empty `port` overrides the port in `uri`.
    fn connect(&mut self, uri: &str, port: &str) -> bool;

    /// Run the handshake sequence against the remembered target, closing any existing
    /// transport first.
    fn reconnect(&mut self) -> bool;

    /// Send a normal-closure frame and tear down the transport.
    ///
    /// Succeeds trivially when there is no transport, so calling it repeatedly is harmless.
    fn close(&mut self) -> bool;

    /// Send `data` as one text frame.
    fn write(&mut self, data: &str) -> bool;

    /// Send a ping control frame carrying `data`.
    fn ping(&mut self, data: &str) -> bool;

    /// Block until one data frame arrives and return its payload.
    fn read(&mut self) -> Option<String>;

    /// Whether the connection is open.
    ///
    /// This is only authoritative immediately after an operation: a peer which has gone away
    /// is noticed by the next read or write, not before.
    fn is_open(&self) -> bool;

    /// Bytes ready to read from the socket without blocking.
    ///
    /// The count saturates at 64 MiB. A failure to measure is logged and reported as zero.
    fn available_bytes(&self) -> usize;

    /// The message of the most recent failure, or `""`.
    fn peek_error(&self) -> &str;

    /// Take the message of the most recent failure, leaving `""` behind.
    fn consume_error(&mut self) -> String;

    /// The kind of the most recent failure.
    fn error_code(&self) -> Option<ErrorKind>;

    /// The most recent failure, with its source chain.
    fn last_error(&self) -> Option<&Error>;
}

/// Either a plain or a secure connection, chosen by scheme.
#[derive(Debug)]
pub enum WebSocket {
    /// A `ws://` connection.
    Plain(PlainWebSocket),

    /// A `wss://` connection.
    Secure(SecureWebSocket),
}

macro_rules! delegate {
    ($self:ident, $socket:ident => $body:expr) => {
        match $self {
            WebSocket::Plain($socket) => $body,
            WebSocket::Secure($socket) => $body,
        }
    };
}

impl WebSocket {
    /// The current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        delegate!(self, socket => socket.state())
    }

    /// The remembered target, if any.
    pub fn target(&self) -> Option<&Target> {
        delegate!(self, socket => socket.target())
    }

    /// Addresses (and TLS details) of the most recently established transport.
    pub fn info(&self) -> Option<&ConnectionInfo> {
        delegate!(self, socket => socket.info())
    }

    /// Bytes currently held in the receive buffer.
    pub fn buffered_bytes(&self) -> usize {
        delegate!(self, socket => socket.buffered_bytes())
    }

    /// Returns `true` for a TLS-secured connection.
    pub fn is_secure(&self) -> bool {
        matches!(self, WebSocket::Secure(_))
    }
}

impl From<PlainWebSocket> for WebSocket {
    fn from(socket: PlainWebSocket) -> Self {
        WebSocket::Plain(socket)
    }
}

impl From<SecureWebSocket> for WebSocket {
    fn from(socket: SecureWebSocket) -> Self {
        WebSocket::Secure(socket)
    }
}

impl Socket for WebSocket {
    fn connect(&mut self, uri: &str, port: &str) -> bool {
        delegate!(self, socket => socket.connect(uri, port))
    }

    fn reconnect(&mut self) -> bool {
        delegate!(self, socket => socket.reconnect())
    }

    fn close(&mut self) -> bool {
        delegate!(self, socket => socket.close())
    }

    fn write(&mut self, data: &str) -> bool {
        delegate!(self, socket => socket.write(data))
    }

    fn ping(&mut self, data: &str) -> bool {
        delegate!(self, socket => socket.ping(data))
    }

    fn read(&mut self) -> Option<String> {
        delegate!(self, socket => socket.read())
    }

    fn is_open(&self) -> bool {
        delegate!(self, socket => socket.is_open())
    }

    fn available_bytes(&self) -> usize {
        delegate!(self, socket => socket.available_bytes())
    }

    fn peek_error(&self) -> &str {
        delegate!(self, socket => socket.peek_error())
    }

    fn consume_error(&mut self) -> String {
        delegate!(self, socket => socket.consume_error())
    }

    fn error_code(&self) -> Option<ErrorKind> {
        delegate!(self, socket => socket.error_code())
    }

    fn last_error(&self) -> Option<&Error> {
        delegate!(self, socket => socket.last_error())
    }
}
