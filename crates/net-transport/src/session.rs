//! Per-connection session: handshake, then the encrypted receive loop

use std::io::ErrorKind;
use std::sync::Arc;

use crypto_session::{CryptoSession, RandomSource};
use shared_protocol::{Message, Origin, SessionState};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};

use crate::{MessageQueue, SessionConfig, TransportResult, handshake};

/// What a finished session reports back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub origin: Origin,
    pub final_state: SessionState,
    /// Messages decrypted and handed to the queue
    pub messages_received: u64,
    /// Chunks that failed to decrypt and were dropped
    pub chunks_rejected: u64,
}

/// One accepted connection
pub struct ConnectionSession<S> {
    origin: Origin,
    stream: S,
    state: SessionState,
    config: Arc<SessionConfig>,
    rng: Arc<dyn RandomSource>,
    queue: MessageQueue,
    messages_received: u64,
    chunks_rejected: u64,
}

impl<S> ConnectionSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        origin: Origin,
        stream: S,
        config: Arc<SessionConfig>,
        rng: Arc<dyn RandomSource>,
        queue: MessageQueue,
    ) -> Self {
        Self {
            origin,
            stream,
            state: SessionState::Connected,
            config,
            rng,
            queue,
            messages_received: 0,
            chunks_rejected: 0,
        }
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drive the session to a terminal state. The stream is shut down on
    /// every exit path.
    pub async fn run(mut self) -> SessionSummary {
        let crypto = match self.establish().await {
            Ok(crypto) => crypto,
            Err(e) => {
                warn!(origin = %self.origin, "Handshake failed: {}", e);
                self.transition(SessionState::Failed);
                return self.finish().await;
            }
        };

        self.transition(SessionState::SecureLoop);
        info!(
            origin = %self.origin,
            cipher = %crypto.kind(),
            authenticated = crypto.kind().is_authenticated(),
            "Secure session established"
        );

        let outcome = self.secure_loop(&crypto).await;
        self.transition(outcome);
        self.finish().await
    }

    async fn establish(&mut self) -> TransportResult<CryptoSession> {
        self.transition(SessionState::KeyExchanging);

        let secret = handshake::respond(&mut self.stream, self.rng.as_ref()).await?;
        let crypto = CryptoSession::from_shared_secret(
            &secret,
            self.config.cipher,
            self.config.key_derivation,
            self.rng.clone(),
        )?;
        Ok(crypto)
    }

    /// Returns the terminal state the loop ended in
    async fn secure_loop(&mut self, crypto: &CryptoSession) -> SessionState {
        let mut buf = vec![0u8; self.config.read_buffer_size.max(1)];
        let mut consecutive_errors = 0u32;

        loop {
            let n = match self.stream.read(&mut buf).await {
                Ok(0) => {
                    info!(origin = %self.origin, "Peer disconnected");
                    return SessionState::Closed;
                }
                Ok(n) => {
                    consecutive_errors = 0;
                    n
                }
                Err(e) if is_disconnect(&e) => {
                    info!(origin = %self.origin, "Peer disconnected: {}", e);
                    return SessionState::Closed;
                }
                Err(e) => {
                    consecutive_errors += 1;
                    warn!(
                        origin = %self.origin,
                        consecutive_errors,
                        "Read error: {}", e
                    );
                    if consecutive_errors >= self.config.max_consecutive_read_errors {
                        error!(origin = %self.origin, "Too many read errors, giving up");
                        return SessionState::Failed;
                    }
                    continue;
                }
            };

            // One read is one message; a chunk that fails to decrypt is dropped
            let plaintext = match crypto.decrypt(&buf[..n]) {
                Ok(plaintext) => plaintext,
                Err(e) => {
                    self.chunks_rejected += 1;
                    warn!(origin = %self.origin, len = n, "Dropping undecryptable chunk: {}", e);
                    continue;
                }
            };

            debug!(origin = %self.origin, len = plaintext.len(), "Received message");
            if let Err(e) = self.queue.push(Message::new(self.origin, plaintext)).await {
                info!(origin = %self.origin, "{}, ending session", e);
                return SessionState::Closed;
            }
            self.messages_received += 1;

            match crypto.encrypt(&self.config.acknowledgement) {
                Ok(ack) => {
                    if let Err(e) = self.stream.write_all(&ack).await {
                        warn!(origin = %self.origin, "Failed to send acknowledgement: {}", e);
                    }
                }
                Err(e) => {
                    warn!(origin = %self.origin, "Failed to encrypt acknowledgement: {}", e);
                }
            }
        }
    }

    fn transition(&mut self, to: SessionState) {
        match self.state.transition(to) {
            Ok(next) => {
                debug!(origin = %self.origin, from = ?self.state, to = ?next, "Session state change");
                self.state = next;
            }
            Err(e) => error!(origin = %self.origin, "{}", e),
        }
    }

    async fn finish(mut self) -> SessionSummary {
        if let Err(e) = self.stream.shutdown().await {
            debug!(origin = %self.origin, "Stream shutdown: {}", e);
        }

        SessionSummary {
            origin: self.origin,
            final_state: self.state,
            messages_received: self.messages_received,
            chunks_rejected: self.chunks_rejected,
        }
    }
}

fn is_disconnect(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof
            | ErrorKind::NotConnected
    )
}
