//! Byte-stream transports underneath a WebSocket connection.
//!
//! A transport turns a connected [`TcpStream`] into the stream the WebSocket protocol runs
//! over. The set of transports is closed: [`Plain`] passes the TCP stream through, and
//! [`Secure`] wraps it in TLS.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::client::Error;
use crate::info::TlsConnectionInfo;
use crate::uri::{Scheme, Target};

pub mod plain;
pub mod tls;

pub use self::plain::Plain;
pub use self::tls::{default_tls_config, Secure};

pub(crate) type BoxFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// The stream-specific stages of the connect sequence.
pub trait Transport: fmt::Debug + Send + crate::private::Sealed {
    /// The stream the WebSocket protocol runs over.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Per-connect state computed before any network I/O happens.
    type Session: Send + 'static;

    /// The scheme used for the handshake request.
    const SCHEME: Scheme;

    /// Prefix for log origins, e.g. `WebSocketS`.
    const ORIGIN: &'static str;

    /// Validate local configuration for `target`. Runs before resolution.
    fn prepare(&self, target: &Target) -> Result<Self::Session, Error>;

    /// Wrap a freshly connected TCP stream, performing any handshake this transport needs.
    fn establish<'a>(
        &'a self,
        session: Self::Session,
        tcp: TcpStream,
        target: &'a Target,
    ) -> BoxFuture<'a, Self::Stream, Error>;

    /// The TCP stream at the bottom of `stream`.
    fn tcp(stream: &Self::Stream) -> &TcpStream;

    /// TLS details of `stream`, if it is encrypted.
    fn tls_info(stream: &Self::Stream, target: &Target) -> Option<TlsConnectionInfo>;

    /// Whether `establish` performs a TLS handshake.
    fn is_secure() -> bool {
        Self::SCHEME == Scheme::Secure
    }
}
