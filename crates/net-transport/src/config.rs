//! Server and session configuration

use bytes::Bytes;
use crypto_session::{CipherKind, KeyDerivation};
use shared_protocol::{ACKNOWLEDGEMENT, DEFAULT_LISTEN_ADDR, MESSAGE_QUEUE_CAPACITY, READ_BUFFER_SIZE};

/// Settings every session on a server shares
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Cipher used for all application messages
    pub cipher: CipherKind,
    /// How the cipher key is obtained from the shared secret
    pub key_derivation: KeyDerivation,
    /// Bytes requested per socket read; one read is one message
    pub read_buffer_size: usize,
    /// Plaintext encrypted and written back after each accepted message
    pub acknowledgement: Bytes,
    /// Consecutive failed reads tolerated before the session is failed
    pub max_consecutive_read_errors: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cipher: CipherKind::AesGcm,
            key_derivation: KeyDerivation::Raw,
            read_buffer_size: READ_BUFFER_SIZE,
            acknowledgement: Bytes::from_static(ACKNOWLEDGEMENT),
            max_consecutive_read_errors: 16,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on, e.g. `0.0.0.0:3000`
    pub listen_addr: String,
    /// Capacity of the message queue shared by all sessions
    pub queue_capacity: usize,
    /// Per-connection settings
    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            queue_capacity: MESSAGE_QUEUE_CAPACITY,
            session: SessionConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(listen_addr: impl Into<String>) -> Self {
        Self {
            listen_addr: listen_addr.into(),
            ..Default::default()
        }
    }

    pub fn with_cipher(mut self, cipher: CipherKind) -> Self {
        self.session.cipher = cipher;
        self
    }

    pub fn with_key_derivation(mut self, derivation: KeyDerivation) -> Self {
        self.session.key_derivation = derivation;
        self
    }
}
