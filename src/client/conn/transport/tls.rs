//! TLS transport.
//!
//! The server name indication is derived from the target host while preparing the connect
//! sequence, so a host that cannot be used as a TLS server name fails before any network I/O.

use std::fmt;
use std::sync::Arc;

use rustls::pki_types::ServerName;
use rustls::ClientConfig;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tracing::{trace, warn};

use super::{BoxFuture, Transport};
use crate::client::{Error, ErrorKind};
use crate::info::TlsConnectionInfo;
use crate::uri::{Scheme, Target};

/// Build a TLS client configuration trusting the platform's root certificates.
///
/// Certificates which fail to load or parse are skipped with a warning.
pub fn default_tls_config() -> ClientConfig {
    let mut roots = rustls::RootCertStore::empty();

    let native = rustls_native_certs::load_native_certs();
    for error in &native.errors {
        warn!("could not load platform certificate: {}", error);
    }

    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    trace!(added, ignored, "loaded platform root certificates");

    let mut cfg = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();

    cfg.alpn_protocols.push(b"http/1.1".to_vec());
    cfg
}

/// WebSocket over TLS over TCP.
///
/// Owns the TLS client configuration for as long as the connection object lives.
#[derive(Clone)]
pub struct Secure {
    config: Arc<ClientConfig>,
}

impl fmt::Debug for Secure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secure")
            .field("alpn", &self.config.alpn_protocols.len())
            .finish()
    }
}

impl Secure {
    /// Create a secure transport using `config` for every handshake.
    pub fn new(config: Arc<ClientConfig>) -> Self {
        Self { config }
    }

    /// The TLS configuration.
    pub fn config(&self) -> &Arc<ClientConfig> {
        &self.config
    }
}

impl Default for Secure {
    fn default() -> Self {
        Self::new(Arc::new(default_tls_config()))
    }
}

impl crate::private::Sealed for Secure {}

impl Transport for Secure {
    type Stream = TlsStream<TcpStream>;
    type Session = ServerName<'static>;

    const SCHEME: Scheme = Scheme::Secure;
    const ORIGIN: &'static str = "WebSocketS";

    fn prepare(&self, target: &Target) -> Result<Self::Session, Error> {
        let host = target.host().trim_start_matches('[').trim_end_matches(']');
        ServerName::try_from(host.to_owned()).map_err(Error::msg(
            ErrorKind::TlsConfiguration,
            format!(
                "Error while handling ssl connection to {}",
                target.host()
            ),
        ))
    }

    fn establish<'a>(
        &'a self,
        session: Self::Session,
        tcp: TcpStream,
        target: &'a Target,
    ) -> BoxFuture<'a, Self::Stream, Error> {
        let connector = TlsConnector::from(self.config.clone());
        Box::pin(async move {
            let stream = connector.connect(session, tcp).await.map_err(|error| {
                trace!("closing half-open transport after tls failure");
                Error::msg(
                    ErrorKind::TlsHandshake,
                    format!("Error while performing SSL handshake with {}", target.url()),
                )(error)
            })?;
            trace!("tls handshake complete");
            Ok(stream)
        })
    }

    fn tcp(stream: &Self::Stream) -> &TcpStream {
        stream.get_ref().0
    }

    fn tls_info(stream: &Self::Stream, target: &Target) -> Option<TlsConnectionInfo> {
        let (_, client) = stream.get_ref();
        Some(TlsConnectionInfo::client(target.host(), client))
    }
}
