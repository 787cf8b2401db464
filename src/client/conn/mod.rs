//! Connection building blocks.
//!
//! The connect sequence is split across three layers:
//!
//! - [`dns`] turns a host and port into candidate socket addresses.
//! - `tcp` opens a TCP stream to the first reachable candidate and applies socket options.
//! - [`transport`] wraps the TCP stream in whatever the WebSocket protocol runs over: the
//!   stream itself for `ws://`, or a TLS session for `wss://`.

pub mod dns;
pub(crate) mod tcp;
pub mod transport;
