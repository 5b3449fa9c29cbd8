//! Server settings: JSON file, then environment, then command line

use std::path::{Path, PathBuf};

use crypto_session::{CipherKind, CryptoError, KeyDerivation};
use net_transport::{ServerConfig, SessionConfig};
use serde::{Deserialize, Serialize};
use shared_protocol::{DEFAULT_LISTEN_ADDR, MESSAGE_QUEUE_CAPACITY, READ_BUFFER_SIZE};
use thiserror::Error;

/// Names a JSON settings file
pub const CONFIG_PATH_ENV: &str = "SECURE_SERVER_CONFIG";
pub const LISTEN_ADDR_ENV: &str = "SECURE_SERVER_LISTEN_ADDR";
pub const CIPHER_ENV: &str = "SECURE_SERVER_CIPHER";
pub const KEY_DERIVATION_ENV: &str = "SECURE_SERVER_KEY_DERIVATION";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for {var}: {source}")]
    Env {
        var: &'static str,
        #[source]
        source: CryptoError,
    },

    #[error("Invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub listen_addr: String,
    pub cipher: CipherKind,
    pub key_derivation: KeyDerivation,
    pub queue_capacity: usize,
    pub read_buffer_size: usize,
    pub max_consecutive_read_errors: u32,
    pub certificate_path: Option<PathBuf>,
    pub private_key_path: Option<PathBuf>,
    pub trusted_roots_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            cipher: session.cipher,
            key_derivation: session.key_derivation,
            queue_capacity: MESSAGE_QUEUE_CAPACITY,
            read_buffer_size: READ_BUFFER_SIZE,
            max_consecutive_read_errors: session.max_consecutive_read_errors,
            certificate_path: None,
            private_key_path: None,
            trusted_roots_path: None,
        }
    }
}

impl Settings {
    /// Resolve settings from every source.
    ///
    /// `args` are the command-line arguments without the program name; the
    /// first one, if present, is the listen address. `env` looks up an
    /// environment variable.
    pub fn load<I, F>(args: I, env: F) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = match env(CONFIG_PATH_ENV) {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };

        settings.apply_env(&env)?;

        if let Some(addr) = args.into_iter().next() {
            settings.listen_addr = addr;
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    fn apply_env<F>(&mut self, env: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = env(LISTEN_ADDR_ENV) {
            self.listen_addr = addr;
        }
        if let Some(cipher) = env(CIPHER_ENV) {
            self.cipher = cipher.parse().map_err(|source| ConfigError::Env {
                var: CIPHER_ENV,
                source,
            })?;
        }
        if let Some(derivation) = env(KEY_DERIVATION_ENV) {
            self.key_derivation = derivation.parse().map_err(|source| ConfigError::Env {
                var: KEY_DERIVATION_ENV,
                source,
            })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.listen_addr.trim().is_empty() {
            return Err(ConfigError::Invalid("listen_addr is empty".into()));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue_capacity must be at least 1".into()));
        }
        if self.read_buffer_size == 0 {
            return Err(ConfigError::Invalid("read_buffer_size must be at least 1".into()));
        }
        if self.max_consecutive_read_errors == 0 {
            return Err(ConfigError::Invalid(
                "max_consecutive_read_errors must be at least 1".into(),
            ));
        }
        if self.certificate_path.is_some() != self.private_key_path.is_some() {
            return Err(ConfigError::Invalid(
                "certificate_path and private_key_path must be set together".into(),
            ));
        }
        Ok(())
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            listen_addr: self.listen_addr.clone(),
            queue_capacity: self.queue_capacity,
            session: SessionConfig {
                cipher: self.cipher,
                key_derivation: self.key_derivation,
                read_buffer_size: self.read_buffer_size,
                max_consecutive_read_errors: self.max_consecutive_read_errors,
                ..Default::default()
            },
        }
    }
}
