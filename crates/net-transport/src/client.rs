//! Client side of the secure transport

use std::net::SocketAddr;
use std::sync::Arc;

use crypto_session::{CipherKind, CryptoSession, KeyDerivation, OsRandom, RandomSource};
use shared_protocol::READ_BUFFER_SIZE;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::{TransportError, TransportResult, handshake};

/// Connected client with an established crypto session
pub struct SecureClient {
    stream: TcpStream,
    crypto: CryptoSession,
    peer_addr: SocketAddr,
    buf: Vec<u8>,
}

impl SecureClient {
    /// Connect and run the key exchange using the OS random source
    pub async fn connect(
        addr: SocketAddr,
        cipher: CipherKind,
        derivation: KeyDerivation,
    ) -> TransportResult<Self> {
        Self::connect_with(addr, cipher, derivation, Arc::new(OsRandom)).await
    }

    pub async fn connect_with(
        addr: SocketAddr,
        cipher: CipherKind,
        derivation: KeyDerivation,
        rng: Arc<dyn RandomSource>,
    ) -> TransportResult<Self> {
        let mut stream = TcpStream::connect(addr)
            .await
            .map_err(|source| TransportError::ConnectionFailed { addr, source })?;

        let secret = handshake::initiate(&mut stream, rng.as_ref()).await?;
        let crypto = CryptoSession::from_shared_secret(&secret, cipher, derivation, rng)?;
        info!(%addr, %cipher, "Connected to secure server");

        Ok(Self {
            stream,
            crypto,
            peer_addr: addr,
            buf: vec![0u8; READ_BUFFER_SIZE],
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn local_addr(&self) -> TransportResult<SocketAddr> {
        Ok(self.stream.local_addr()?)
    }

    pub fn cipher(&self) -> CipherKind {
        self.crypto.kind()
    }

    /// Encrypt and send one message
    pub async fn send(&mut self, plaintext: &[u8]) -> TransportResult<()> {
        let framed = self.crypto.encrypt(plaintext)?;
        self.stream
            .write_all(&framed)
            .await
            .map_err(TransportError::Write)?;
        debug!(len = plaintext.len(), "Sent message");
        Ok(())
    }

    /// Read and decrypt one message. `None` means the server closed the
    /// connection.
    pub async fn recv(&mut self) -> TransportResult<Option<Vec<u8>>> {
        let n = self
            .stream
            .read(&mut self.buf)
            .await
            .map_err(TransportError::Read)?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(self.crypto.decrypt(&self.buf[..n])?))
    }

    /// Send a message and wait for the server's reply
    pub async fn request(&mut self, plaintext: &[u8]) -> TransportResult<Vec<u8>> {
        self.send(plaintext).await?;
        self.recv().await?.ok_or(TransportError::ConnectionClosed)
    }

    pub async fn shutdown(mut self) -> TransportResult<()> {
        self.stream.shutdown().await.map_err(TransportError::Write)
    }
}
