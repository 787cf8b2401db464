use std::time::Duration;

use wsdriver::{ConnectionConfig, ErrorKind, Reactor, Scheme, Socket, WebSocket, WebSocketFactory};

mod common;

use common::{EchoServer, RecordingLogger};

#[test]
fn default_ports() {
    assert_eq!(WebSocketFactory::default_port("ws://example.com/a"), "80");
    assert_eq!(WebSocketFactory::default_port("example.com"), "80");
    assert_eq!(WebSocketFactory::default_port("wss://example.com"), "443");
    assert_eq!(WebSocketFactory::default_port("wss://example.com:9443"), "443");
    assert_eq!(WebSocketFactory::default_port("gopher://example.com"), "");
}

#[test]
fn create_for_uri_remembers_target() {
    common::init_tracing();
    let server = EchoServer::plain();
    let logger = RecordingLogger::shared();
    let factory = WebSocketFactory::new().with_default_logger(logger.clone());
    let reactor = Reactor::new().unwrap();

    let mut socket = factory
        .create_for_uri(&reactor, "ws://127.0.0.1/echo", &server.port())
        .unwrap()
        .unwrap();
    assert!(matches!(socket, WebSocket::Plain(_)));

    let target = socket.target().unwrap();
    assert_eq!(target.scheme(), &Scheme::Plain);
    assert_eq!(target.port(), server.port());
    assert_eq!(target.path(), "/echo");

    assert!(socket.reconnect(), "{}", socket.peek_error());
    assert!(socket.write("hello"));
    assert_eq!(socket.read().as_deref(), Some("hello"));
    assert!(socket.close());

    assert_eq!(logger.matching("Successfully connected").len(), 1);
}

#[test]
fn unsupported_scheme_is_returned_without_own_logger() {
    let reactor = Reactor::new().unwrap();
    let logger = RecordingLogger::shared();
    let factory = WebSocketFactory::new().with_default_logger(logger.clone());

    let err = factory
        .create_for_uri(&reactor, "http://example.com/", "")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("unsupported web protocol \"http\""));

    // The default logger belongs to connections, not to the factory.
    assert!(logger.records().is_empty());
}

#[test]
fn unsupported_scheme_is_logged_with_own_logger() {
    let reactor = Reactor::new().unwrap();
    let own = RecordingLogger::shared();
    let factory = WebSocketFactory::new().with_own_logger(own.clone());

    assert!(factory
        .create_for_uri(&reactor, "WS://example.com/", "")
        .unwrap()
        .is_none());

    let errors = own.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].origin, "WebSocketFactory.create_for_uri");
    assert!(errors[0].console);
    assert!(errors[0].text.contains("\"WS\""));
}

#[test]
fn clones_share_configuration() {
    let server = EchoServer::plain();
    let factory = WebSocketFactory::new().with_config(ConnectionConfig {
        handshake_timeout: Some(Duration::from_secs(2)),
        nodelay: false,
        ..Default::default()
    });
    let copy = factory.clone();

    let handles: Vec<_> = (0..2)
        .map(|n| {
            let factory = copy.clone();
            let url = server.url();
            std::thread::spawn(move || {
                let reactor = Reactor::new().unwrap();
                let mut socket = factory.create_unsecure(&reactor);
                assert_eq!(
                    socket.config().handshake_timeout,
                    Some(Duration::from_secs(2))
                );
                assert!(!socket.config().nodelay);

                let text = format!("thread {n}");
                assert!(socket.connect(&url, ""));
                assert!(socket.write(&text));
                assert_eq!(socket.read(), Some(text));
                assert!(socket.close());
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(factory.config().handshake_timeout, Some(Duration::from_secs(2)));
}

#[test]
fn connections_without_default_logger_are_silent() {
    let reactor = Reactor::new().unwrap();
    let mut socket = WebSocketFactory::new().create_unsecure(&reactor);

    assert!(!socket.write("abc"));
    assert_eq!(socket.error_code(), Some(ErrorKind::Precondition));
    assert_eq!(
        format!("{:?}", socket.logger()),
        format!("{:?}", wsdriver::NoopLogger)
    );
}
