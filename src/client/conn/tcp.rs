//! TCP connection establishment.
//!
//! Resolved addresses are attempted one after another in resolver order. The first address
//! that accepts a connection wins; if none does, the error from the last attempt is returned.

use std::io;
use std::net::SocketAddr;

use socket2::{SockRef, TcpKeepalive};
use tokio::net::{TcpSocket, TcpStream};
use tracing::{trace, warn, Instrument};

use super::dns::SocketAddrs;
use crate::client::ConnectionConfig;

/// Connect to the first address in `addrs` which accepts a connection.
pub(crate) async fn connect(
    addrs: &SocketAddrs,
    config: &ConnectionConfig,
) -> Result<TcpStream, io::Error> {
    let mut last_error = None;

    for address in addrs.iter() {
        let span = tracing::trace_span!("connect", %address);
        match connect_one(address, config).instrument(span).await {
            Ok(stream) => {
                trace!(remote.addr = %address, "tcp connected");
                return Ok(stream);
            }
            Err(error) => {
                trace!(remote.addr = %address, %error, "tcp connect attempt failed");
                last_error = Some(error);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            "Exhausted connection candidates",
        )
    }))
}

async fn connect_one(address: &SocketAddr, config: &ConnectionConfig) -> io::Result<TcpStream> {
    let socket = match address {
        SocketAddr::V4(_) => TcpSocket::new_v4()?,
        SocketAddr::V6(_) => TcpSocket::new_v6()?,
    };
    trace!("tcp socket opened");

    if config.reuse_address {
        if let Err(e) = socket.set_reuseaddr(true) {
            warn!("tcp set_reuse_address error: {}", e);
        }
    }

    if let Some(size) = config.send_buffer_size {
        if let Err(e) = socket.set_send_buffer_size(size.try_into().unwrap_or(u32::MAX)) {
            warn!("tcp set_buffer_size error: {}", e);
        }
    }

    if let Some(size) = config.recv_buffer_size {
        if let Err(e) = socket.set_recv_buffer_size(size.try_into().unwrap_or(u32::MAX)) {
            warn!("tcp set_recv_buffer_size error: {}", e);
        }
    }

    let stream = socket.connect(*address).await?;

    if let Err(e) = stream.set_nodelay(config.nodelay) {
        warn!("tcp set_nodelay error: {}", e);
    }

    if let Some(dur) = config.keep_alive_timeout {
        let conf = TcpKeepalive::new().with_time(dur);
        if let Err(e) = SockRef::from(&stream).set_tcp_keepalive(&conf) {
            warn!("tcp set_keepalive error: {}", e);
        }
    }

    Ok(stream)
}

/// Count the bytes readable from `stream` without blocking and without consuming them.
///
/// The receive queue is peeked into a buffer which doubles until the queue fits, so the
/// count is exact up to [`PEEK_LIMIT`] bytes and saturates there.
pub(crate) fn available(stream: &TcpStream) -> io::Result<usize> {
    let socket = SockRef::from(stream);
    let mut buf = vec![std::mem::MaybeUninit::<u8>::uninit(); PEEK_START];

    loop {
        let n = match socket.peek(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(0),
            Err(e) => return Err(e),
        };

        if n < buf.len() || buf.len() >= PEEK_LIMIT {
            return Ok(n);
        }

        let len = (buf.len() * 2).min(PEEK_LIMIT);
        buf.resize(len, std::mem::MaybeUninit::uninit());
    }
}

const PEEK_START: usize = 4 * 1024;

/// Largest count [`available`] reports.
const PEEK_LIMIT: usize = 64 * 1024 * 1024;
