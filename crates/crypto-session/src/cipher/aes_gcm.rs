//! AES-256-GCM handler

use std::sync::Arc;

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};

use super::{CipherKind, EncryptionHandler, require_key_len, require_len};
use crate::{CryptoError, CryptoResult, RandomSource};

/// AES-256 in GCM mode with a random 96-bit nonce per message.
///
/// Framed output: `[12-byte nonce][ciphertext][16-byte tag]`
pub struct AesGcmHandler {
    rng: Arc<dyn RandomSource>,
}

impl AesGcmHandler {
    pub const KEY_SIZE: usize = 32;
    pub const NONCE_SIZE: usize = 12;
    pub const TAG_SIZE: usize = 16;

    pub fn new(rng: Arc<dyn RandomSource>) -> Self {
        Self { rng }
    }

    fn cipher(key: &[u8]) -> CryptoResult<Aes256Gcm> {
        require_key_len(key, Self::KEY_SIZE)?;
        Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength {
            expected: Self::KEY_SIZE,
            actual: key.len(),
        })
    }
}

impl EncryptionHandler for AesGcmHandler {
    fn kind(&self) -> CipherKind {
        CipherKind::AesGcm
    }

    fn encrypt(&self, plaintext: &[u8], key: &[u8]) -> CryptoResult<Vec<u8>> {
        let cipher = Self::cipher(key)?;

        let mut nonce = [0u8; Self::NONCE_SIZE];
        self.rng.fill(&mut nonce)?;

        let sealed = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        let mut framed = Vec::with_capacity(Self::NONCE_SIZE + sealed.len());
        framed.extend_from_slice(&nonce);
        framed.extend_from_slice(&sealed);
        Ok(framed)
    }

    fn decrypt(&self, framed: &[u8], key: &[u8]) -> CryptoResult<Vec<u8>> {
        let cipher = Self::cipher(key)?;
        require_len(framed, Self::NONCE_SIZE)?;

        let (nonce, sealed) = framed.split_at(Self::NONCE_SIZE);
        cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CryptoError::AuthenticationFailed)
    }
}
