//! The connection state machine shared by plain and secure connections.

use std::fmt;
use std::future::Future;
use std::io;

use bytes::BytesMut;
use futures_util::{SinkExt as _, StreamExt as _};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::client::IntoClientRequest as _;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, trace, Instrument as _};

use super::conn::dns::GaiResolver;
use super::conn::tcp;
use super::conn::transport::{Plain, Secure, Transport};
use super::{ConnectionConfig, Error, ErrorKind, Socket};
use crate::info::ConnectionInfo;
use crate::logger::SharedLogger;
use crate::reactor::Reactor;
use crate::uri::Target;

/// Largest payload a ping control frame can carry.
const MAX_PING_PAYLOAD: usize = 125;

/// Where a connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No transport; ready for `connect` or `reconnect`.
    Idle,

    /// Looking up the target host.
    Resolving,

    /// Opening the TCP connection.
    Connecting,

    /// Performing the TLS handshake (secure connections only).
    TlsHandshaking,

    /// Performing the WebSocket upgrade.
    ProtocolHandshaking,

    /// Ready for reads, writes and pings.
    Open,

    /// The connection was closed, locally or by the peer.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Resolving => "resolving",
            ConnectionState::Connecting => "connecting",
            ConnectionState::TlsHandshaking => "tls-handshaking",
            ConnectionState::ProtocolHandshaking => "protocol-handshaking",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// A WebSocket connection over a transport `T`, driven synchronously.
///
/// Each operation blocks the calling thread on the connection's [`Reactor`] until that
/// operation's I/O has completed or failed. Operations take `&mut self`, so only one can be
/// in flight at a time.
///
/// Dropping an open connection closes it.
pub struct WebSocketBase<T: Transport> {
    transport: T,
    logger: SharedLogger,
    config: ConnectionConfig,
    resolver: GaiResolver,
    target: Option<Target>,
    state: ConnectionState,
    ws: Option<WebSocketStream<T::Stream>>,
    info: Option<ConnectionInfo>,
    buffer: BytesMut,
    error: Option<Error>,
    message: String,
    // Dropped after the stream it drives.
    reactor: Reactor,
}

/// A plain-text `ws://` connection.
pub type PlainWebSocket = WebSocketBase<Plain>;

/// A TLS-secured `wss://` connection.
pub type SecureWebSocket = WebSocketBase<Secure>;

impl<T: Transport> fmt::Debug for WebSocketBase<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketBase")
            .field("transport", &self.transport)
            .field("target", &self.target)
            .field("state", &self.state)
            .field("info", &self.info)
            .finish()
    }
}

impl<T: Transport> WebSocketBase<T> {
    /// Create an idle connection with no target.
    pub fn new(
        transport: T,
        reactor: Reactor,
        logger: SharedLogger,
        config: ConnectionConfig,
    ) -> Self {
        Self {
            transport,
            reactor,
            logger,
            config,
            resolver: GaiResolver::new(),
            target: None,
            state: ConnectionState::Idle,
            ws: None,
            info: None,
            buffer: BytesMut::new(),
            error: None,
            message: String::new(),
        }
    }

    /// Remember `target` for a later [`Socket::reconnect`], without connecting.
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    /// The current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The target of the last `connect`, if any.
    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    /// Addresses (and TLS details) of the most recently established transport.
    pub fn info(&self) -> Option<&ConnectionInfo> {
        self.info.as_ref()
    }

    /// Bytes currently held in the receive buffer. Zero between reads.
    pub fn buffered_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// The transport variant.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The connection configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// The logger this connection reports to.
    pub fn logger(&self) -> &SharedLogger {
        &self.logger
    }

    fn origin(op: &str) -> String {
        format!("{}.{}", T::ORIGIN, op)
    }

    fn url(&self) -> String {
        self.target.as_ref().map(Target::url).unwrap_or_default()
    }

    fn transition(&mut self, state: ConnectionState) {
        trace!(from = %self.state, to = %state, "state transition");
        self.state = state;
    }

    fn clear_error(&mut self) {
        self.error = None;
        self.message.clear();
    }

    /// Log `error`, store it in the error slot and report failure.
    fn fail(&mut self, op: &str, error: Error) -> bool {
        let message = error.to_string();
        self.logger.error(&Self::origin(op), &message);
        self.message = message;
        self.error = Some(error);
        false
    }

    /// Drop the transport after the peer or the network ended the connection.
    fn lost(&mut self) {
        self.ws = None;
        self.buffer.clear();
        self.transition(ConnectionState::Closed);
    }

    async fn establish(&mut self, target: &Target) -> Result<(), Error> {
        let session = self.transport.prepare(target)?;
        let deadline = self
            .config
            .handshake_timeout
            .map(|timeout| Instant::now() + timeout);

        self.transition(ConnectionState::Resolving);
        let message = format!("Error while resolving domain name {}", target.host());
        let addrs = bounded(deadline, self.resolver.resolve(target.host(), target.port()))
            .await
            .map_err(Error::msg(ErrorKind::Resolution, message.clone()))?
            .map_err(Error::msg(ErrorKind::Resolution, message))?;

        self.transition(ConnectionState::Connecting);
        let message = format!("Error while connecting to {}", target.url());
        let stream = bounded(deadline, tcp::connect(&addrs, &self.config))
            .await
            .map_err(Error::msg(ErrorKind::TransportConnect, message.clone()))?
            .map_err(Error::msg(ErrorKind::TransportConnect, message))?;

        let mut info = ConnectionInfo::from_tcp(&stream).ok();
        if let Some(ref info) = info {
            self.logger.log_message(
                &Self::origin("connect"),
                &format!(
                    "Connected to: {}, from: {}",
                    info.remote_addr, info.local_addr
                ),
                true,
            );
        }

        if T::is_secure() {
            self.transition(ConnectionState::TlsHandshaking);
        }
        let (kind, message) = establish_failure::<T>(target);
        let stream = bounded(deadline, self.transport.establish(session, stream, target))
            .await
            .map_err(Error::msg(kind, message))??;
        if let Some(ref mut info) = info {
            info.tls = T::tls_info(&stream, target);
        }

        self.transition(ConnectionState::ProtocolHandshaking);
        let message = format!(
            "Error while performing websocket handshake with {}",
            target.url()
        );
        let request = handshake_request::<T>(target)
            .map_err(Error::msg(ErrorKind::ProtocolHandshake, message.clone()))?;
        let (ws, response) = bounded(
            deadline,
            tokio_tungstenite::client_async_with_config(
                request,
                stream,
                Some(self.config.websocket()),
            ),
        )
        .await
        .map_err(Error::msg(ErrorKind::ProtocolHandshake, message.clone()))?
        .map_err(Error::msg(ErrorKind::ProtocolHandshake, message))?;
        debug!(status = %response.status(), "websocket handshake complete");

        self.ws = Some(ws);
        self.info = info;
        Ok(())
    }

    async fn send(&mut self, message: Message) -> Result<(), Error> {
        let url = self.url();
        let ws = self
            .ws
            .as_mut()
            .ok_or_else(|| Error::precondition("Trying to write message while not connected"))?;

        match ws.send(message).await {
            Ok(()) => Ok(()),
            Err(error) => {
                if is_fatal(&error) {
                    self.lost();
                }
                Err(Error::msg(
                    ErrorKind::Write,
                    format!("Error while writing to {url}"),
                )(error))
            }
        }
    }

    async fn receive(&mut self) -> Result<String, Error> {
        let url = self.url();
        let ws = self
            .ws
            .as_mut()
            .ok_or_else(|| Error::precondition("Trying to read message while not connected"))?;

        let outcome = loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    self.buffer.extend_from_slice(text.as_str().as_bytes());
                    break Ok(());
                }
                Some(Ok(Message::Binary(data))) => {
                    self.buffer.extend_from_slice(&data);
                    break Ok(());
                }
                Some(Ok(Message::Close(frame))) => {
                    // Push out the close reply queued by the protocol layer.
                    if let Err(error) = ws.flush().await {
                        trace!(%error, "close reply not delivered");
                    }
                    let reason = frame
                        .map(|frame| {
                            format!("{} {}", u16::from(frame.code), frame.reason.as_str())
                        })
                        .unwrap_or_else(|| "no close frame".to_string());
                    break Err(Error::new(
                        ErrorKind::Read,
                        format!("Error while reading from {url}: connection closed by peer ({reason})"),
                    ));
                }
                Some(Ok(message)) => {
                    trace!(len = message.len(), "skipping control frame");
                }
                Some(Err(error)) => {
                    break Err(Error::msg(
                        ErrorKind::Read,
                        format!("Error while reading from {url}"),
                    )(error));
                }
                None => {
                    break Err(Error::new(
                        ErrorKind::Read,
                        format!("Error while reading from {url}: connection closed"),
                    ));
                }
            }
        };

        match outcome {
            Ok(()) => {
                let frame = self.buffer.split().freeze();
                Ok(String::from_utf8_lossy(&frame).into_owned())
            }
            Err(error) => {
                self.lost();
                Err(error)
            }
        }
    }

    /// Run one operation on the reactor.
    fn run<F, R>(reactor: &Reactor, future: F) -> Result<R, Error>
    where
        F: Future<Output = Result<R, Error>>,
    {
        reactor.block_on(future).and_then(|result| result)
    }
}

impl<T: Transport> Socket for WebSocketBase<T> {
    fn connect(&mut self, uri: &str, port: &str) -> bool {
        self.target = Some(Target::parse(uri).with_port(port));
        self.reconnect()
    }

    fn reconnect(&mut self) -> bool {
        if self.ws.is_some() {
            self.close();
        }
        self.clear_error();

        let Some(target) = self.target.clone() else {
            return self.fail(
                "reconnect",
                Error::precondition("Trying to reconnect without a previous connect"),
            );
        };

        let reactor = self.reactor.clone();
        let span = tracing::debug_span!("websocket", url = %target.url());
        let result = Self::run(&reactor, self.establish(&target).instrument(span));

        match result {
            Ok(()) => {
                self.transition(ConnectionState::Open);
                self.logger.message(
                    &Self::origin("connect"),
                    &format!("Successfully connected to {}", target.url()),
                );
                true
            }
            Err(error) => {
                self.ws = None;
                self.transition(ConnectionState::Idle);
                let op = match error.kind() {
                    ErrorKind::Resolution => "resolve",
                    ErrorKind::TlsHandshake => "tls_handshake",
                    ErrorKind::ProtocolHandshake => "handshake",
                    _ => "connect",
                };
                self.fail(op, error)
            }
        }
    }

    fn close(&mut self) -> bool {
        self.clear_error();
        let Some(ws) = self.ws.take() else {
            return true;
        };

        let url = self.url();
        let deadline = self
            .config
            .handshake_timeout
            .map(|timeout| Instant::now() + timeout);
        let reactor = self.reactor.clone();
        let result = Self::run(&reactor, shutdown(ws, deadline)).map_err(|error| {
            if error.kind() == ErrorKind::Scheduling {
                error
            } else {
                Error::msg(
                    ErrorKind::Close,
                    format!("Error while trying to disconnect from {url}"),
                )(error)
            }
        });

        self.buffer.clear();
        self.transition(ConnectionState::Closed);

        match result {
            Ok(()) => {
                self.logger.message(
                    &Self::origin("close"),
                    &format!("Successfully closed connection to {url}"),
                );
                true
            }
            Err(error) => self.fail("close", error),
        }
    }

    fn write(&mut self, data: &str) -> bool {
        self.clear_error();
        if !self.is_open() {
            return self.fail(
                "write",
                Error::precondition("Trying to write message while not connected"),
            );
        }

        let reactor = self.reactor.clone();
        match Self::run(&reactor, self.send(Message::Text(data.to_owned().into()))) {
            Ok(()) => true,
            Err(error) => self.fail("write", error),
        }
    }

    fn ping(&mut self, data: &str) -> bool {
        self.clear_error();
        if !self.is_open() {
            return self.fail(
                "ping",
                Error::precondition("Trying to write message while not connected"),
            );
        }

        if data.len() > MAX_PING_PAYLOAD {
            return self.fail(
                "ping",
                Error::new(
                    ErrorKind::Write,
                    format!(
                        "Error while writing to {}: ping payload of {} bytes exceeds {MAX_PING_PAYLOAD}",
                        self.url(),
                        data.len()
                    ),
                ),
            );
        }

        let payload = bytes::Bytes::copy_from_slice(data.as_bytes());
        let reactor = self.reactor.clone();
        match Self::run(&reactor, self.send(Message::Ping(payload))) {
            Ok(()) => true,
            Err(error) => self.fail("ping", error),
        }
    }

    fn read(&mut self) -> Option<String> {
        self.clear_error();
        if !self.is_open() {
            self.fail(
                "read",
                Error::precondition("Trying to read message while not connected"),
            );
            return None;
        }

        let reactor = self.reactor.clone();
        match Self::run(&reactor, self.receive()) {
            Ok(frame) => Some(frame),
            Err(error) => {
                self.fail("read", error);
                None
            }
        }
    }

    fn is_open(&self) -> bool {
        self.state == ConnectionState::Open && self.ws.is_some()
    }

    fn available_bytes(&self) -> usize {
        let Some(ws) = self.ws.as_ref() else {
            self.logger.error(
                &Self::origin("available_bytes"),
                "Can't count available bytes: not connected",
            );
            return 0;
        };

        match tcp::available(T::tcp(ws.get_ref())) {
            Ok(count) => count,
            Err(error) => {
                self.logger.error(
                    &Self::origin("available_bytes"),
                    &format!("Can't count available bytes: {error}"),
                );
                0
            }
        }
    }

    fn peek_error(&self) -> &str {
        &self.message
    }

    fn consume_error(&mut self) -> String {
        std::mem::take(&mut self.message)
    }

    fn error_code(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(Error::kind)
    }

    fn last_error(&self) -> Option<&Error> {
        self.error.as_ref()
    }
}

impl<T: Transport> Drop for WebSocketBase<T> {
    fn drop(&mut self) {
        if self.is_open() {
            self.close();
        }
    }
}

/// Await `future`, failing with [`io::ErrorKind::TimedOut`] once `deadline` passes.
async fn bounded<F>(deadline: Option<Instant>, future: F) -> Result<F::Output, io::Error>
where
    F: Future,
{
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, future)
            .await
            .map_err(|elapsed| io::Error::new(io::ErrorKind::TimedOut, elapsed)),
        None => Ok(future.await),
    }
}

/// The stage a failure inside `Transport::establish` is attributed to.
fn establish_failure<T: Transport>(target: &Target) -> (ErrorKind, String) {
    if T::is_secure() {
        (
            ErrorKind::TlsHandshake,
            format!("Error while performing SSL handshake with {}", target.url()),
        )
    } else {
        (
            ErrorKind::TransportConnect,
            format!("Error while connecting to {}", target.url()),
        )
    }
}

fn handshake_request<T: Transport>(
    target: &Target,
) -> Result<tungstenite::handshake::client::Request, tungstenite::Error> {
    let authority = target.authority();
    let uri = http::Uri::builder()
        .scheme(T::SCHEME.as_str())
        .authority(authority.as_str())
        .path_and_query(target.path())
        .build()
        .map_err(tungstenite::Error::HttpFormat)?;
    uri.into_client_request()
}

/// Whether `error` leaves the stream unusable.
fn is_fatal(error: &tungstenite::Error) -> bool {
    !matches!(
        error,
        tungstenite::Error::Capacity(_) | tungstenite::Error::WriteBufferFull(_)
    )
}

/// Whether `error` only says the peer already finished (or abandoned) the closing handshake.
fn is_closed(error: &tungstenite::Error) -> bool {
    matches!(
        error,
        tungstenite::Error::ConnectionClosed
            | tungstenite::Error::AlreadyClosed
            | tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake)
    )
}

/// Send a normal-closure frame and wait for the peer to finish the closing handshake.
async fn shutdown<S>(
    mut ws: WebSocketStream<S>,
    deadline: Option<Instant>,
) -> Result<(), Error>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let frame = CloseFrame {
        code: CloseCode::Normal,
        reason: String::new().into(),
    };

    let closing = async {
        match ws.close(Some(frame)).await {
            Err(error) if !is_closed(&error) => return Err(error),
            _ => {}
        }

        while let Some(message) = ws.next().await {
            match message {
                Ok(message) => trace!(len = message.len(), "discarding frame while closing"),
                Err(error) if is_closed(&error) => break,
                Err(error) => return Err(error),
            }
        }
        Ok::<(), tungstenite::Error>(())
    };

    bounded(deadline, closing)
        .await
        .map_err(Error::msg(ErrorKind::Close, "closing handshake timed out"))?
        .map_err(Error::msg(ErrorKind::Close, "closing handshake failed"))
}
