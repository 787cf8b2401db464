//! DNS resolution utilities.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};

/// The addresses a target resolved to, in resolver order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SocketAddrs(Vec<SocketAddr>);

impl SocketAddrs {
    /// Returns `true` if resolution produced no addresses.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of resolved addresses.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over the addresses in the order they should be attempted.
    pub fn iter(&self) -> std::slice::Iter<'_, SocketAddr> {
        self.0.iter()
    }
}

impl FromIterator<SocketAddr> for SocketAddrs {
    fn from_iter<T: IntoIterator<Item = SocketAddr>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for SocketAddrs {
    type Item = SocketAddr;
    type IntoIter = std::vec::IntoIter<SocketAddr>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// GetAddrInfo based resolver.
///
/// This resolver uses the `getaddrinfo` system call to resolve
/// hostnames to IP addresses via the operating system, on tokio's
/// blocking thread pool.
#[derive(Debug, Default, Clone)]
pub struct GaiResolver {
    _priv: (),
}

impl GaiResolver {
    /// Create a new `GaiResolver`.
    pub fn new() -> Self {
        Self { _priv: () }
    }

    /// Resolve `host` and the textual `port` to socket addresses.
    ///
    /// The port must be numeric. An empty address list is reported as an error so that
    /// callers never have to special-case it.
    pub async fn resolve(&self, host: &str, port: &str) -> Result<SocketAddrs, io::Error> {
        let port: u16 = port.parse().map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid port {port:?}"),
            )
        })?;

        let host = host.trim_start_matches('[').trim_end_matches(']').to_owned();
        let span = tracing::Span::current();
        let addrs = tokio::task::spawn_blocking(move || {
            tracing::trace_span!(parent: &span, "getaddrinfo").in_scope(|| {
                tracing::trace!("dns resolution starting");
                (host.as_str(), port)
                    .to_socket_addrs()
                    .map(SocketAddrs::from_iter)
            })
        })
        .await
        .map_err(|join_err| {
            if join_err.is_cancelled() {
                io::Error::new(io::ErrorKind::Interrupted, join_err)
            } else {
                io::Error::other(join_err)
            }
        })??;

        if addrs.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "no address found",
            ));
        }

        tracing::trace!(count = addrs.len(), "dns resolution finished");
        Ok(addrs)
    }
}
