//! TCP server: accepts connections and runs one session per connection

use std::net::SocketAddr;
use std::sync::Arc;

use crypto_session::{OsRandom, RandomSource};
use shared_protocol::{ConnectionId, Message, Origin};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

use crate::{
    ACCEPT_ERROR_BACKOFF, ConnectionSession, MessageQueue, ServerConfig, SessionConfig,
    TransportError, TransportResult,
};

/// Signals a running server to stop accepting connections
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        // send_replace never fails, even with no receivers left
        self.tx.send_replace(true);
    }
}

/// Server that has not bound its listener yet
pub struct SecureServer {
    config: ServerConfig,
    rng: Arc<dyn RandomSource>,
    messages: mpsc::Sender<Message>,
    shutdown: watch::Receiver<bool>,
}

impl SecureServer {
    /// Create a server together with the receiving end of its message
    /// queue and the handle that stops it.
    pub fn new(config: ServerConfig) -> (Self, mpsc::Receiver<Message>, ShutdownHandle) {
        let (messages, rx) = mpsc::channel(config.queue_capacity.max(1));
        let (shutdown_tx, shutdown) = watch::channel(false);

        let server = Self {
            config,
            rng: Arc::new(OsRandom),
            messages,
            shutdown,
        };
        let handle = ShutdownHandle {
            tx: Arc::new(shutdown_tx),
        };
        (server, rx, handle)
    }

    /// Replace the random source used for handshakes and nonces
    pub fn with_random_source(mut self, rng: Arc<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub async fn bind(self) -> TransportResult<BoundServer> {
        let addr = self.config.listen_addr.clone();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| TransportError::Bind { addr, source })?;

        Ok(BoundServer {
            listener,
            local_addr,
            session: Arc::new(self.config.session),
            rng: self.rng,
            messages: self.messages,
            shutdown: self.shutdown,
        })
    }

    /// Bind and serve until shutdown
    pub async fn start(self) -> TransportResult<()> {
        self.bind().await?.serve().await
    }
}

/// Server with a bound listener, ready to serve
pub struct BoundServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    session: Arc<SessionConfig>,
    rng: Arc<dyn RandomSource>,
    messages: mpsc::Sender<Message>,
    shutdown: watch::Receiver<bool>,
}

impl BoundServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until the shutdown handle fires.
    ///
    /// On shutdown the listener is closed and the server's end of the
    /// message queue is released. Sessions already running keep going; the
    /// consumer sees the queue end once none of them is mid-push.
    pub async fn serve(self) -> TransportResult<()> {
        let Self {
            listener,
            local_addr,
            session,
            rng,
            messages,
            mut shutdown,
        } = self;

        info!(
            %local_addr,
            cipher = %session.cipher,
            key_derivation = %session.key_derivation,
            "Server listening"
        );

        let queue = MessageQueue::new(&messages);
        let accept_task = tokio::spawn(accept_loop(listener, session, rng, queue));

        wait_for_shutdown(&mut shutdown).await;
        info!("Shutting down server");

        accept_task.abort();
        report_accept_task_end(accept_task.await);
        drop(messages);

        Ok(())
    }
}

/// Returns true when the accept task died for a reason other than the
/// abort issued at shutdown
fn report_accept_task_end(result: Result<(), JoinError>) -> bool {
    match result {
        Err(e) if !e.is_cancelled() => {
            error!("Accept loop ended abnormally: {}", e);
            true
        }
        _ => false,
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            // Every handle is gone; nothing can stop the server any more
            std::future::pending::<()>().await;
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    config: Arc<SessionConfig>,
    rng: Arc<dyn RandomSource>,
    queue: MessageQueue,
) {
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                let origin = Origin {
                    connection: ConnectionId::new(),
                    peer_addr,
                };
                info!(%origin, "New connection");

                let session =
                    ConnectionSession::new(origin, stream, config.clone(), rng.clone(), queue.clone());
                tokio::spawn(async move {
                    let summary = session.run().await;
                    debug!(
                        origin = %summary.origin,
                        state = ?summary.final_state,
                        messages = summary.messages_received,
                        rejected = summary.chunks_rejected,
                        "Session finished"
                    );
                });
            }
            Err(e) => {
                warn!("{}", TransportError::Accept(e));
                tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
            }
        }
    }
}
