//! Full client/server exchanges over loopback TCP

use std::net::SocketAddr;
use std::time::Duration;

use crypto_session::{CipherKind, KeyDerivation};
use futures::future::join_all;
use net_transport::{SecureClient, SecureServer, ServerConfig, ShutdownHandle, TransportError};
use shared_protocol::{ACKNOWLEDGEMENT, Message, PUBLIC_KEY_WIRE_SIZE};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

struct Running {
    addr: SocketAddr,
    messages: mpsc::Receiver<Message>,
    shutdown: ShutdownHandle,
    task: JoinHandle<Result<(), TransportError>>,
}

async fn start(config: ServerConfig) -> Running {
    let (server, messages, shutdown) = SecureServer::new(config);
    let bound = server.bind().await.unwrap();
    let addr = bound.local_addr();
    let task = tokio::spawn(bound.serve());
    Running {
        addr,
        messages,
        shutdown,
        task,
    }
}

async fn next_message(rx: &mut mpsc::Receiver<Message>) -> Message {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a message")
        .expect("queue closed")
}

#[tokio::test]
async fn test_hello_is_delivered_and_acknowledged() {
    let mut server = start(ServerConfig::new("127.0.0.1:0")).await;

    let mut client = SecureClient::connect(server.addr, CipherKind::AesGcm, KeyDerivation::Raw)
        .await
        .unwrap();
    let reply = client.request(b"hello").await.unwrap();
    assert_eq!(reply, ACKNOWLEDGEMENT);

    let message = next_message(&mut server.messages).await;
    assert_eq!(message.payload_lossy(), "hello");
    assert_eq!(message.origin.peer_addr, client.local_addr().unwrap());

    client.shutdown().await.unwrap();
    server.shutdown.shutdown();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_every_cipher_round_trips() {
    for cipher in CipherKind::ALL {
        for derivation in [KeyDerivation::Raw, KeyDerivation::HkdfSha256] {
            let config = ServerConfig::new("127.0.0.1:0")
                .with_cipher(cipher)
                .with_key_derivation(derivation);
            let mut server = start(config).await;

            let mut client = SecureClient::connect(server.addr, cipher, derivation)
                .await
                .unwrap();
            assert_eq!(client.cipher(), cipher);

            for text in ["first", "a somewhat longer second message", ""] {
                let reply = client.request(text.as_bytes()).await.unwrap();
                assert_eq!(reply, ACKNOWLEDGEMENT, "{cipher} / {derivation}");
                assert_eq!(next_message(&mut server.messages).await.payload_lossy(), text);
            }

            server.shutdown.shutdown();
            server.task.await.unwrap().unwrap();
        }
    }
}

#[tokio::test]
async fn test_bad_handshake_does_not_affect_other_clients() {
    let mut server = start(ServerConfig::new("127.0.0.1:0")).await;

    // Send a truncated public key and half-close
    let mut rogue = TcpStream::connect(server.addr).await.unwrap();
    let mut server_key = [0u8; PUBLIC_KEY_WIRE_SIZE];
    rogue.read_exact(&mut server_key).await.unwrap();
    rogue.write_all(&server_key[..30]).await.unwrap();
    rogue.shutdown().await.unwrap();

    let mut buf = [0u8; 64];
    let n = tokio::time::timeout(Duration::from_secs(5), rogue.read(&mut buf))
        .await
        .unwrap()
        .unwrap_or(0);
    assert_eq!(n, 0, "server should close a connection whose handshake failed");

    let mut client = SecureClient::connect(server.addr, CipherKind::AesGcm, KeyDerivation::Raw)
        .await
        .unwrap();
    assert_eq!(client.request(b"still here").await.unwrap(), ACKNOWLEDGEMENT);
    assert_eq!(
        next_message(&mut server.messages).await.payload_lossy(),
        "still here"
    );

    server.shutdown.shutdown();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_cipher_mismatch_drops_messages() {
    let mut server = start(ServerConfig::new("127.0.0.1:0").with_cipher(CipherKind::AesGcm)).await;

    let mut client = SecureClient::connect(server.addr, CipherKind::ChaCha20, KeyDerivation::Raw)
        .await
        .unwrap();
    client.send(b"wrong cipher").await.unwrap();

    // The tag check fails server-side: no acknowledgement and nothing queued
    let reply = tokio::time::timeout(Duration::from_millis(200), client.recv()).await;
    assert!(reply.is_err());
    assert!(server.messages.try_recv().is_err());

    server.shutdown.shutdown();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_concurrent_clients() {
    let mut server = start(ServerConfig::new("127.0.0.1:0")).await;
    let addr = server.addr;

    let clients = (0..8).map(|i| async move {
        let mut client = SecureClient::connect(addr, CipherKind::AesGcm, KeyDerivation::Raw)
            .await
            .unwrap();
        let reply = client.request(format!("client {i}").as_bytes()).await.unwrap();
        assert_eq!(reply, ACKNOWLEDGEMENT);
        client.local_addr().unwrap()
    });

    let consumer = async {
        let mut seen = Vec::new();
        for _ in 0..8 {
            seen.push(next_message(&mut server.messages).await);
        }
        seen
    };

    let (addrs, messages) = tokio::join!(join_all(clients), consumer);

    let mut texts: Vec<String> = messages.iter().map(Message::payload_lossy).collect();
    texts.sort();
    let mut expected: Vec<String> = (0..8).map(|i| format!("client {i}")).collect();
    expected.sort();
    assert_eq!(texts, expected);

    let connections: std::collections::HashSet<_> =
        messages.iter().map(|m| m.origin.connection).collect();
    assert_eq!(connections.len(), 8);
    for message in &messages {
        assert!(addrs.contains(&message.origin.peer_addr));
    }

    server.shutdown.shutdown();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_bind_conflict_is_reported() {
    let server = start(ServerConfig::new("127.0.0.1:0")).await;

    let (second, _rx, _handle) = SecureServer::new(ServerConfig::new(server.addr.to_string()));
    assert!(matches!(
        second.bind().await,
        Err(TransportError::Bind { .. })
    ));

    server.shutdown.shutdown();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_shutdown_closes_queue_and_listener() {
    let mut server = start(ServerConfig::new("127.0.0.1:0")).await;

    let mut client = SecureClient::connect(server.addr, CipherKind::AesGcm, KeyDerivation::Raw)
        .await
        .unwrap();
    client.request(b"before shutdown").await.unwrap();
    assert_eq!(
        next_message(&mut server.messages).await.payload_lossy(),
        "before shutdown"
    );

    server.shutdown.shutdown();
    server.task.await.unwrap().unwrap();

    // Existing session can no longer deliver; its next push ends it
    client.send(b"after shutdown").await.unwrap();
    let reply = tokio::time::timeout(Duration::from_secs(5), client.recv())
        .await
        .unwrap()
        .unwrap_or(None);
    assert!(reply.is_none());

    let end = tokio::time::timeout(Duration::from_secs(5), server.messages.recv())
        .await
        .unwrap();
    assert!(end.is_none());

    assert!(TcpStream::connect(server.addr).await.is_err());
}
