use std::time::Duration;

use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

/// Configuration shared by plain and secure connections.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Upper bound for the whole connect sequence: resolve, TCP connect, TLS and the
    /// WebSocket upgrade. Also bounds the closing handshake. Reads and writes on an open
    /// connection are never timed out.
    pub handshake_timeout: Option<Duration>,

    /// The idle time before TCP keepalive probes are sent.
    pub keep_alive_timeout: Option<Duration>,

    /// Whether to disable Nagle's algorithm.
    pub nodelay: bool,

    /// Whether to reuse the local address.
    pub reuse_address: bool,

    /// The size of the send buffer.
    pub send_buffer_size: Option<usize>,

    /// The size of the receive buffer.
    pub recv_buffer_size: Option<usize>,

    /// The largest message accepted from the peer.
    pub max_message_size: Option<usize>,

    /// The largest single frame accepted from the peer.
    pub max_frame_size: Option<usize>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Some(Duration::from_secs(60)),
            keep_alive_timeout: Some(Duration::from_secs(90)),
            nodelay: true,
            reuse_address: true,
            send_buffer_size: None,
            recv_buffer_size: None,
            max_message_size: Some(1 << 26),
            max_frame_size: Some(16 << 20),
        }
    }
}

impl ConnectionConfig {
    pub(crate) fn websocket(&self) -> WebSocketConfig {
        let mut config = WebSocketConfig::default();
        config.max_message_size = self.max_message_size;
        config.max_frame_size = self.max_frame_size;
        config
    }
}
