//! Connection string parsing.
//!
//! A connection string has the shape `[scheme://]host[:port][/path]`. Parsing is purely
//! structural: nothing is validated here, so a malformed host or port is carried through
//! and surfaces later as a resolution failure.

use std::fmt;

/// The plain-text WebSocket scheme.
pub const PLAIN_SCHEME: &str = "ws";

/// The TLS-secured WebSocket scheme.
pub const SECURE_SCHEME: &str = "wss";

/// The scheme portion of a connection string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// `ws://`, WebSocket over plain TCP.
    Plain,

    /// `wss://`, WebSocket over TLS.
    Secure,

    /// Any other scheme. Connections cannot be created for these.
    Other(String),
}

impl Scheme {
    /// The port used when a connection string does not name one.
    ///
    /// Unrecognized schemes have no default and yield an empty string.
    pub fn default_port(&self) -> &'static str {
        match self {
            Scheme::Plain => "80",
            Scheme::Secure => "443",
            Scheme::Other(_) => "",
        }
    }

    /// Returns `true` for the schemes a connection can be built for.
    pub fn is_supported(&self) -> bool {
        !matches!(self, Scheme::Other(_))
    }

    /// The scheme as it is written in a connection string.
    pub fn as_str(&self) -> &str {
        match self {
            Scheme::Plain => PLAIN_SCHEME,
            Scheme::Secure => SECURE_SCHEME,
            Scheme::Other(other) => other,
        }
    }
}

impl From<&str> for Scheme {
    fn from(value: &str) -> Self {
        match value {
            PLAIN_SCHEME => Scheme::Plain,
            SECURE_SCHEME => Scheme::Secure,
            other => Scheme::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed connection endpoint.
///
/// Targets are immutable once parsed; use [`Target::with_port`] to derive one with
/// a different port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    scheme: Scheme,
    host: String,
    port: String,
    path: String,
}

impl Target {
    /// Split a connection string into its scheme, host, port and path.
    ///
    /// - A missing `scheme://` prefix means [`Scheme::Plain`].
    /// - The host runs up to the first `:` or `/` after the scheme.
    /// - The port runs from that `:` to the next `/`, and otherwise defaults per scheme.
    /// - The path is everything from the first `/` on, and defaults to `/`.
    pub fn parse(address: &str) -> Self {
        let (scheme, rest) = match address.find("://") {
            Some(idx) => (Scheme::from(&address[..idx]), &address[idx + 3..]),
            None => (Scheme::Plain, address),
        };

        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, "/"),
        };

        let (host, port) = match authority.find(':') {
            Some(idx) => (&authority[..idx], authority[idx + 1..].to_owned()),
            None => (authority, scheme.default_port().to_owned()),
        };

        Target {
            host: host.to_owned(),
            port,
            path: path.to_owned(),
            scheme,
        }
    }

    /// The default port for the scheme of `address`, without keeping the rest of the parse.
    pub fn default_port(address: &str) -> &'static str {
        Target::parse(address).scheme.default_port()
    }

    /// Replace the port. An empty `port` leaves the parsed (or default) port in place.
    pub fn with_port(mut self, port: &str) -> Self {
        if !port.is_empty() {
            self.port = port.to_owned();
        }
        self
    }

    /// The connection scheme.
    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    /// The host, exactly as written.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The port, exactly as written, or the scheme default.
    pub fn port(&self) -> &str {
        &self.port
    }

    /// The request path, starting with `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// `host:port`, used as the handshake authority.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `host:port/path`, the identifier used in log and error messages.
    pub fn url(&self) -> String {
        format!("{}:{}{}", self.host, self.port, self.path)
    }

    /// Consume into the `(scheme, host, port, path)` tuple.
    pub fn into_parts(self) -> (Scheme, String, String, String) {
        (self.scheme, self.host, self.port, self.path)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(address: &str) -> (Scheme, String, String, String) {
        Target::parse(address).into_parts()
    }

    #[test]
    fn full_address() {
        assert_eq!(
            parts("ws://example.com:9000/chat/room"),
            (
                Scheme::Plain,
                "example.com".into(),
                "9000".into(),
                "/chat/room".into()
            )
        );
    }

    #[test]
    fn bare_host() {
        assert_eq!(
            parts("example.com"),
            (Scheme::Plain, "example.com".into(), "80".into(), "/".into())
        );
    }

    #[test]
    fn secure_default_port() {
        assert_eq!(
            parts("wss://example.com/a/b"),
            (
                Scheme::Secure,
                "example.com".into(),
                "443".into(),
                "/a/b".into()
            )
        );
    }

    #[test]
    fn port_without_path() {
        let target = Target::parse("ws://example.com:9000");
        assert_eq!(target.port(), "9000");
        assert_eq!(target.path(), "/");
    }

    #[test]
    fn unrecognized_scheme() {
        let target = Target::parse("ftp://files.example.com/pub");
        assert_eq!(target.scheme(), &Scheme::Other("ftp".into()));
        assert!(!target.scheme().is_supported());
        assert_eq!(target.port(), "");
        assert_eq!(target.path(), "/pub");
    }

    #[test]
    fn malformed_is_passed_through() {
        let target = Target::parse("ws://:8080/x");
        assert_eq!(target.host(), "");
        assert_eq!(target.port(), "8080");

        let target = Target::parse("ws://host:notaport");
        assert_eq!(target.port(), "notaport");
    }

    #[test]
    fn parse_is_idempotent() {
        let address = "wss://example.com:8443/feed";
        let target = Target::parse(address);
        assert_eq!(Target::parse(&target.to_string()), target);
        assert_eq!(target.to_string(), address);
    }

    #[test]
    fn port_override() {
        let target = Target::parse("ws://127.0.0.1").with_port("8083");
        assert_eq!(target.authority(), "127.0.0.1:8083");
        assert_eq!(target.url(), "127.0.0.1:8083/");

        let target = Target::parse("wss://example.com").with_port("");
        assert_eq!(target.port(), "443");
    }

    #[test]
    fn default_port_for_address() {
        assert_eq!(Target::default_port("ws://example.com:1234"), "80");
        assert_eq!(Target::default_port("wss://example.com"), "443");
        assert_eq!(Target::default_port("example.com"), "80");
        assert_eq!(Target::default_port("http://example.com"), "");
    }
}
