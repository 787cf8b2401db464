//! Building connections from connection strings.
//!
//! A [`WebSocketFactory`] holds the configuration every connection it creates shares: the
//! logger injected into connections, the logger the factory reports its own failures to, the
//! [`ConnectionConfig`], and the TLS client configuration for secure connections. It is built
//! once at startup and then only read.

use std::sync::Arc;

use rustls::ClientConfig;

use crate::client::{
    ConnectionConfig, Error, ErrorKind, Plain, PlainWebSocket, Secure, SecureWebSocket, WebSocket,
};
use crate::logger::{NoopLogger, SharedLogger};
use crate::reactor::Reactor;
use crate::uri::{Scheme, Target};

const ORIGIN: &str = "WebSocketFactory.create_for_uri";

/// Creates plain and secure connections.
#[derive(Debug, Clone, Default)]
pub struct WebSocketFactory {
    default_logger: Option<SharedLogger>,
    own_logger: Option<SharedLogger>,
    config: ConnectionConfig,
    tls: Option<Arc<ClientConfig>>,
}

impl WebSocketFactory {
    /// A factory with no loggers, the default connection configuration and the platform
    /// trust store for secure connections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject `logger` into every connection created from now on.
    pub fn with_default_logger(mut self, logger: SharedLogger) -> Self {
        self.default_logger = Some(logger);
        self
    }

    /// Report the factory's own failures to `logger` instead of returning them.
    pub fn with_own_logger(mut self, logger: SharedLogger) -> Self {
        self.own_logger = Some(logger);
        self
    }

    /// Use `config` for every connection created from now on.
    pub fn with_config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `config` for the TLS handshake of secure connections.
    ///
    /// Without this, each secure connection loads the platform trust store when it is created.
    pub fn with_tls(mut self, config: Arc<ClientConfig>) -> Self {
        self.tls = Some(config);
        self
    }

    /// The connection configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// The default port for the scheme of `uri`, or `""` for an unsupported scheme.
    pub fn default_port(uri: &str) -> &'static str {
        Target::default_port(uri)
    }

    fn logger(&self) -> SharedLogger {
        self.default_logger
            .clone()
            .unwrap_or_else(NoopLogger::shared)
    }

    /// Create an idle secure connection.
    pub fn create_secure(&self, reactor: &Reactor) -> SecureWebSocket {
        let transport = match &self.tls {
            Some(config) => Secure::new(config.clone()),
            None => Secure::default(),
        };
        SecureWebSocket::new(
            transport,
            reactor.clone(),
            self.logger(),
            self.config.clone(),
        )
    }

    /// Create an idle plain connection.
    pub fn create_unsecure(&self, reactor: &Reactor) -> PlainWebSocket {
        PlainWebSocket::new(
            Plain::new(),
            reactor.clone(),
            self.logger(),
            self.config.clone(),
        )
    }

    /// Create an idle connection of the variant named by the scheme of `uri`.
    ///
    /// The parsed target, with a non-empty `port` applied, is remembered so that
    /// [`Socket::reconnect`](crate::Socket::reconnect) works straight away.
    ///
    /// An unsupported scheme yields no connection. With an own logger the failure is logged
    /// and `Ok(None)` is returned; otherwise it is returned as an [`ErrorKind::Configuration`]
    /// error.
    pub fn create_for_uri(
        &self,
        reactor: &Reactor,
        uri: &str,
        port: &str,
    ) -> Result<Option<WebSocket>, Error> {
        let target = Target::parse(uri).with_port(port);
        match target.scheme() {
            Scheme::Plain => Ok(Some(self.create_unsecure(reactor).with_target(target).into())),
            Scheme::Secure => Ok(Some(self.create_secure(reactor).with_target(target).into())),
            Scheme::Other(scheme) => {
                let error = Error::new(
                    ErrorKind::Configuration,
                    format!("Error while initializing websocket: unsupported web protocol \"{scheme}\""),
                );
                match &self.own_logger {
                    Some(logger) => {
                        logger.error(ORIGIN, &error.to_string());
                        Ok(None)
                    }
                    None => Err(error),
                }
            }
        }
    }
}
