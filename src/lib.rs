//! wsdriver
//!
//! Blocking WebSocket client connections over plain TCP and TLS.
//!
//! Connections are created by a [`WebSocketFactory`] and driven synchronously: every
//! operation blocks the calling thread on a [`Reactor`] until its I/O is done. Failures are
//! reported through a boolean (or `Option`) result and recorded in the connection's error
//! slot, so a caller can decide whether to retry without unwinding.
//!
//! ```no_run
//! use wsdriver::{Reactor, Socket, WebSocketFactory};
//!
//! # fn main() -> Result<(), wsdriver::BoxError> {
//! let reactor = Reactor::new()?;
//! let factory = WebSocketFactory::new();
//!
//! let Some(mut socket) = factory.create_for_uri(&reactor, "ws://127.0.0.1:9001/echo", "")? else {
//!     return Ok(());
//! };
//!
//! if socket.reconnect() && socket.write("hello") {
//!     println!("{:?}", socket.read());
//! } else {
//!     eprintln!("{}", socket.consume_error());
//! }
//! socket.close();
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod client;
pub mod factory;
pub mod info;
pub mod logger;
pub mod reactor;
pub mod uri;

pub use self::client::{
    ConnectionConfig, ConnectionState, Error, ErrorKind, PlainWebSocket, SecureWebSocket,
    Socket, WebSocket,
};
pub use self::factory::WebSocketFactory;
pub use self::logger::{Logger, NoopLogger, SharedLogger, TracingLogger};
pub use self::reactor::Reactor;
pub use self::uri::{Scheme, Target};

/// Boxed error type used for error sources.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub(crate) mod private {
    pub trait Sealed {}
}
