#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::thread;

use futures_util::{SinkExt as _, StreamExt as _};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_rustls::TlsAcceptor;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use wsdriver::Logger;

/// Text frame which makes the echo server start the closing handshake.
pub const CLOSE_COMMAND: &str = "please close";

/// What the server does with a connection after the upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behavior {
    /// Send data frames back.
    Echo,

    /// Never read or write again, not even to answer a close frame.
    Silent,

    /// Reset the TCP connection.
    Reset,
}

/// A loopback WebSocket server which echoes data frames back, running on its own thread.
pub struct EchoServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl EchoServer {
    pub fn plain() -> Self {
        Self::spawn(None, Behavior::Echo)
    }

    pub fn tls(certificate: &Certificate) -> Self {
        Self::spawn(
            Some(TlsAcceptor::from(certificate.server_config())),
            Behavior::Echo,
        )
    }

    /// Completes the upgrade, then ignores the connection until the server is dropped.
    pub fn silent() -> Self {
        Self::spawn(None, Behavior::Silent)
    }

    /// Completes the upgrade, then resets the connection.
    pub fn resetting() -> Self {
        Self::spawn(None, Behavior::Reset)
    }

    fn spawn(acceptor: Option<TlsAcceptor>, behavior: Behavior) -> Self {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, mut rx) = oneshot::channel();

        let thread = thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async move {
                let listener = TcpListener::from_std(listener).unwrap();
                loop {
                    tokio::select! {
                        _ = &mut rx => break,
                        accepted = listener.accept() => {
                            let Ok((stream, _)) = accepted else { continue };
                            match acceptor.clone() {
                                Some(acceptor) => {
                                    tokio::spawn(async move {
                                        match acceptor.accept(stream).await {
                                            Ok(stream) => serve(stream, behavior).await,
                                            Err(error) => tracing::debug!("tls accept failed: {error}"),
                                        }
                                    });
                                }
                                None => {
                                    if behavior == Behavior::Reset {
                                        let linger = Some(std::time::Duration::ZERO);
                                        socket2::SockRef::from(&stream).set_linger(linger).unwrap();
                                    }
                                    tokio::spawn(serve(stream, behavior));
                                }
                            }
                        }
                    }
                }
            });
        });

        Self {
            addr,
            shutdown: Some(tx),
            thread: Some(thread),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> String {
        self.addr.port().to_string()
    }

    /// `ws://127.0.0.1:<port>/echo`
    pub fn url(&self) -> String {
        format!("ws://{}/echo", self.addr)
    }

    /// `wss://localhost:<port>/echo`
    pub fn secure_url(&self) -> String {
        format!("wss://localhost:{}/echo", self.addr.port())
    }
}

impl Drop for EchoServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

async fn serve<S>(stream: S, behavior: Behavior)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(error) => {
            tracing::debug!("websocket accept failed: {error}");
            return;
        }
    };

    match behavior {
        Behavior::Echo => {}
        Behavior::Silent => {
            std::future::pending::<()>().await;
            return;
        }
        Behavior::Reset => {
            // Let the client consume the upgrade response first. Linger was set to zero, so
            // dropping sends RST.
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            drop(ws);
            return;
        }
    }

    while let Some(message) = ws.next().await {
        let outcome = match message {
            Ok(Message::Text(text)) if text.as_str() == CLOSE_COMMAND => {
                ws.close(Some(CloseFrame {
                    code: CloseCode::Away,
                    reason: "going away".into(),
                }))
                .await
            }
            Ok(message @ (Message::Text(_) | Message::Binary(_))) => ws.send(message).await,
            Ok(_) => Ok(()),
            Err(_) => break,
        };

        if outcome.is_err() {
            break;
        }
    }
}

/// A self-signed certificate for `localhost` and `127.0.0.1`.
pub struct Certificate {
    cert: CertificateDer<'static>,
    key: Vec<u8>,
}

impl Certificate {
    pub fn generate() -> Self {
        let key_pair = rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256).unwrap();
        let mut params = rcgen::CertificateParams::default();
        params.subject_alt_names = vec![
            rcgen::SanType::DnsName("localhost".try_into().unwrap()),
            rcgen::SanType::IpAddress(std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST)),
        ];
        let cert = params.self_signed(&key_pair).unwrap();

        Self {
            cert: cert.der().clone(),
            key: key_pair.serialize_der(),
        }
    }

    pub fn server_config(&self) -> Arc<rustls::ServerConfig> {
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.key.clone()));
        let mut config = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(vec![self.cert.clone()], key)
            .unwrap();
        config.alpn_protocols.push(b"http/1.1".to_vec());
        Arc::new(config)
    }

    /// A client configuration which trusts only this certificate.
    pub fn client_config(&self) -> Arc<rustls::ClientConfig> {
        let mut roots = rustls::RootCertStore::empty();
        roots.add(self.cert.clone()).unwrap();

        let mut config = rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();
        config.alpn_protocols.push(b"http/1.1".to_vec());
        Arc::new(config)
    }
}

/// A client configuration which trusts nothing.
pub fn untrusting_client_config() -> Arc<rustls::ClientConfig> {
    Arc::new(
        rustls::ClientConfig::builder()
            .with_root_certificates(rustls::RootCertStore::empty())
            .with_no_client_auth(),
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub error: bool,
    pub origin: String,
    pub text: String,
    pub console: bool,
}

/// A logger which keeps every record.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    records: Mutex<Vec<Record>>,
}

impl RecordingLogger {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<Record> {
        self.records().into_iter().filter(|r| r.error).collect()
    }

    /// Records whose text contains `needle`.
    pub fn matching(&self, needle: &str) -> Vec<Record> {
        self.records()
            .into_iter()
            .filter(|r| r.text.contains(needle))
            .collect()
    }

    fn push(&self, error: bool, origin: &str, text: &str, console: bool) {
        self.records.lock().unwrap().push(Record {
            error,
            origin: origin.to_owned(),
            text: text.to_owned(),
            console,
        });
    }
}

impl Logger for RecordingLogger {
    fn log_message(&self, origin: &str, text: &str, also_console: bool) {
        self.push(false, origin, text, also_console);
    }

    fn log_error(&self, origin: &str, text: &str, also_console: bool) {
        self.push(true, origin, text, also_console);
    }
}

/// Install a test subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
