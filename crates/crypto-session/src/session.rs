//! Established cryptographic session: one cipher handler bound to one key

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use hkdf::Hkdf;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::{
    CipherKey, CipherKind, CryptoError, CryptoResult, EncryptionHandler, RandomSource,
    SharedSecret, create_handler,
};

/// How cipher key material is obtained from the ECDH shared secret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyDerivation {
    /// Use the raw shared secret, truncated to the cipher's key length
    #[default]
    Raw,
    /// Expand the shared secret with HKDF-SHA256
    HkdfSha256,
}

impl KeyDerivation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::HkdfSha256 => "hkdf-sha256",
        }
    }

    /// Turn a shared secret into a key for `kind`
    pub fn derive(self, secret: &SharedSecret, kind: CipherKind) -> CryptoResult<CipherKey> {
        let secret = secret.as_bytes();
        let key_len = kind.key_len();

        match self {
            Self::Raw => {
                // The raw secret is 32 bytes: a full AES/ChaCha20 key, DES takes a prefix
                CipherKey::from_bytes(kind, &secret[..key_len])
            }
            Self::HkdfSha256 => {
                let hkdf = Hkdf::<Sha256>::new(None, secret);
                let mut okm = Zeroizing::new(vec![0u8; key_len]);
                let info = format!("secure-transport {} key", kind);
                hkdf.expand(info.as_bytes(), &mut okm)
                    .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
                CipherKey::from_bytes(kind, &okm)
            }
        }
    }
}

impl fmt::Display for KeyDerivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyDerivation {
    type Err = CryptoError;

    fn from_str(s: &str) -> CryptoResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" | "none" => Ok(Self::Raw),
            "hkdf-sha256" | "hkdf" => Ok(Self::HkdfSha256),
            other => Err(CryptoError::UnknownKeyDerivation(other.to_string())),
        }
    }
}

/// Established cryptographic session
pub struct CryptoSession {
    /// Cipher for encryption/decryption
    handler: Box<dyn EncryptionHandler>,
    /// Key derived from the handshake
    key: CipherKey,
}

impl CryptoSession {
    /// Create a new session from a shared secret
    ///
    /// # Arguments
    /// * `shared_secret` - The result of the P-256 key exchange
    /// * `kind` - Cipher both peers are configured with
    /// * `derivation` - How the key is obtained from the secret
    /// * `rng` - Random source for per-message nonces
    pub fn from_shared_secret(
        shared_secret: &SharedSecret,
        kind: CipherKind,
        derivation: KeyDerivation,
        rng: Arc<dyn RandomSource>,
    ) -> CryptoResult<Self> {
        let key = derivation.derive(shared_secret, kind)?;
        Ok(Self::with_key(key, rng))
    }

    /// Create a session around an existing key
    pub fn with_key(key: CipherKey, rng: Arc<dyn RandomSource>) -> Self {
        Self {
            handler: create_handler(key.kind(), rng),
            key,
        }
    }

    pub fn kind(&self) -> CipherKind {
        self.key.kind()
    }

    /// Encrypt one application message into a framed ciphertext
    pub fn encrypt(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        self.handler.encrypt(plaintext, self.key.as_bytes())
    }

    /// Decrypt one framed ciphertext
    pub fn decrypt(&self, framed: &[u8]) -> CryptoResult<Vec<u8>> {
        self.handler.decrypt(framed, self.key.as_bytes())
    }
}

impl fmt::Debug for CryptoSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoSession")
            .field("kind", &self.kind())
            .finish_non_exhaustive()
    }
}
