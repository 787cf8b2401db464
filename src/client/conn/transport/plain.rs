//! Unencrypted transport.

use tokio::net::TcpStream;

use super::{BoxFuture, Transport};
use crate::client::Error;
use crate::info::TlsConnectionInfo;
use crate::uri::{Scheme, Target};

/// WebSocket directly over TCP.
#[derive(Debug, Default, Clone)]
pub struct Plain {
    _priv: (),
}

impl Plain {
    /// Create a plain transport.
    pub fn new() -> Self {
        Self { _priv: () }
    }
}

impl crate::private::Sealed for Plain {}

impl Transport for Plain {
    type Stream = TcpStream;
    type Session = ();

    const SCHEME: Scheme = Scheme::Plain;
    const ORIGIN: &'static str = "WebSocket";

    fn prepare(&self, _target: &Target) -> Result<Self::Session, Error> {
        Ok(())
    }

    fn establish<'a>(
        &'a self,
        _session: Self::Session,
        tcp: TcpStream,
        _target: &'a Target,
    ) -> BoxFuture<'a, Self::Stream, Error> {
        Box::pin(std::future::ready(Ok(tcp)))
    }

    fn tcp(stream: &Self::Stream) -> &TcpStream {
        stream
    }

    fn tls_info(_stream: &Self::Stream, _target: &Target) -> Option<TlsConnectionInfo> {
        None
    }
}
