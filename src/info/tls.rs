//! Information about a TLS connection.
//!
//! TLS information is only available once the handshake is complete.

/// Information about a TLS connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsConnectionInfo {
    /// The server name sent in the SNI extension.
    pub server_name: Option<String>,

    /// The negotiated protocol version, e.g. `TLSv1_3`.
    pub protocol_version: Option<String>,

    /// The application layer protocol negotiated for this connection.
    pub alpn: Option<String>,
}

impl TlsConnectionInfo {
    pub(crate) fn client(server_name: &str, client_info: &rustls::ClientConnection) -> Self {
        let alpn = client_info
            .alpn_protocol()
            .and_then(|s| std::str::from_utf8(s).ok())
            .map(String::from);

        let protocol_version = client_info
            .protocol_version()
            .map(|version| format!("{version:?}"));

        Self {
            server_name: Some(server_name.to_owned()).filter(|s| !s.is_empty()),
            protocol_version,
            alpn,
        }
    }
}
