//! Connection Information

use std::net::SocketAddr;

use tokio::net::TcpStream;

pub mod tls;

pub use self::tls::TlsConnectionInfo;

/// Addresses and TLS details of an established connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// The local end of the TCP connection.
    pub local_addr: SocketAddr,

    /// The remote end of the TCP connection.
    pub remote_addr: SocketAddr,

    /// TLS session details, for secure connections.
    pub tls: Option<TlsConnectionInfo>,
}

impl ConnectionInfo {
    pub(crate) fn from_tcp(stream: &TcpStream) -> std::io::Result<Self> {
        Ok(Self {
            local_addr: stream.local_addr()?,
            remote_addr: stream.peer_addr()?,
            tls: None,
        })
    }

    /// The local socket address.
    pub fn local_addr(&self) -> &SocketAddr {
        &self.local_addr
    }

    /// The remote socket address.
    pub fn remote_addr(&self) -> &SocketAddr {
        &self.remote_addr
    }
}
