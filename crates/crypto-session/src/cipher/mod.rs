//! Pluggable symmetric ciphers
//!
//! Every handler frames its output as `nonce_or_iv || cipher_output`, where
//! the prefix width depends only on the cipher:
//!
//! | Cipher   | Prefix | Authenticated |
//! |----------|--------|---------------|
//! | AES-GCM  | 12     | yes           |
//! | ChaCha20 | 24     | no            |
//! | DES-CBC  | 8      | no (padding)  |

mod aes_gcm;
mod chacha20;
mod des_cbc;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use self::aes_gcm::AesGcmHandler;
pub use self::chacha20::ChaCha20Handler;
pub use self::des_cbc::DesCbcHandler;

use crate::{CryptoError, CryptoResult, RandomSource};

/// Encrypt/decrypt capability shared by every cipher variant.
///
/// Handlers are stateless apart from their random source, so one instance
/// can be used from many tasks at once.
pub trait EncryptionHandler: Send + Sync {
    /// Which cipher this handler implements
    fn kind(&self) -> CipherKind;

    /// Encrypt `plaintext` under `key`, returning a framed ciphertext
    fn encrypt(&self, plaintext: &[u8], key: &[u8]) -> CryptoResult<Vec<u8>>;

    /// Split and decrypt a framed ciphertext produced by [`encrypt`](Self::encrypt)
    fn decrypt(&self, framed: &[u8], key: &[u8]) -> CryptoResult<Vec<u8>>;
}

/// Cipher selection, fixed per session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CipherKind {
    #[default]
    AesGcm,
    #[serde(rename = "chacha20")]
    ChaCha20,
    DesCbc,
}

impl CipherKind {
    pub const ALL: [CipherKind; 3] = [Self::AesGcm, Self::ChaCha20, Self::DesCbc];

    /// Required key length in bytes
    pub fn key_len(self) -> usize {
        match self {
            Self::AesGcm => AesGcmHandler::KEY_SIZE,
            Self::ChaCha20 => ChaCha20Handler::KEY_SIZE,
            Self::DesCbc => DesCbcHandler::KEY_SIZE,
        }
    }

    /// Length of the nonce/IV prefix of a framed ciphertext
    pub fn frame_prefix_len(self) -> usize {
        match self {
            Self::AesGcm => AesGcmHandler::NONCE_SIZE,
            Self::ChaCha20 => ChaCha20Handler::NONCE_SIZE,
            Self::DesCbc => DesCbcHandler::IV_SIZE,
        }
    }

    /// Whether tampering is detected on decrypt
    pub fn is_authenticated(self) -> bool {
        matches!(self, Self::AesGcm)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AesGcm => "aes-gcm",
            Self::ChaCha20 => "chacha20",
            Self::DesCbc => "des-cbc",
        }
    }
}

impl fmt::Display for CipherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CipherKind {
    type Err = CryptoError;

    fn from_str(s: &str) -> CryptoResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aes-gcm" | "aes" => Ok(Self::AesGcm),
            "chacha20" | "xchacha20" => Ok(Self::ChaCha20),
            "des-cbc" | "des" => Ok(Self::DesCbc),
            other => Err(CryptoError::UnknownCipher(other.to_string())),
        }
    }
}

/// Create the handler for `kind`
pub fn create_handler(kind: CipherKind, rng: Arc<dyn RandomSource>) -> Box<dyn EncryptionHandler> {
    match kind {
        CipherKind::AesGcm => Box::new(AesGcmHandler::new(rng)),
        CipherKind::ChaCha20 => Box::new(ChaCha20Handler::new(rng)),
        CipherKind::DesCbc => Box::new(DesCbcHandler::new(rng)),
    }
}

/// Fail with `CiphertextTooShort` unless `framed` holds at least `minimum` bytes
fn require_len(framed: &[u8], minimum: usize) -> CryptoResult<()> {
    if framed.len() < minimum {
        return Err(CryptoError::CiphertextTooShort {
            minimum,
            actual: framed.len(),
        });
    }
    Ok(())
}

fn require_key_len(key: &[u8], expected: usize) -> CryptoResult<()> {
    if key.len() != expected {
        return Err(CryptoError::InvalidKeyLength {
            expected,
            actual: key.len(),
        });
    }
    Ok(())
}
