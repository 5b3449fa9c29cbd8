//! ChaCha20 with an extended 24-byte nonce
//!
//! A sub-key is derived with HChaCha20 from the key and the first 16 nonce
//! bytes; the last 8 nonce bytes drive the ChaCha20 stream under that
//! sub-key. This is a plain stream cipher: there is no authentication tag,
//! so corrupted input decrypts to garbage instead of failing.

use std::sync::Arc;

use chacha20::cipher::consts::U10;
use chacha20::cipher::generic_array::GenericArray;
use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20::{ChaCha20, Key, Nonce, hchacha};

use super::{CipherKind, EncryptionHandler, require_key_len, require_len};
use crate::{CryptoResult, RandomSource};

/// Confidentiality-only ChaCha20 handler.
///
/// Framed output: `[24-byte nonce][ciphertext]`
pub struct ChaCha20Handler {
    rng: Arc<dyn RandomSource>,
}

impl ChaCha20Handler {
    pub const KEY_SIZE: usize = 32;
    pub const NONCE_SIZE: usize = 24;

    /// Nonce bytes fed into the sub-key derivation
    const SUBKEY_INPUT: usize = 16;

    pub fn new(rng: Arc<dyn RandomSource>) -> Self {
        Self { rng }
    }

    /// Build the stream cipher for `key` and a full 24-byte nonce
    fn stream(key: &[u8], nonce: &[u8]) -> CryptoResult<ChaCha20> {
        require_key_len(key, Self::KEY_SIZE)?;

        let (subkey_input, stream_nonce) = nonce.split_at(Self::SUBKEY_INPUT);
        let subkey = hchacha::<U10>(Key::from_slice(key), GenericArray::from_slice(subkey_input));

        // 8-byte stream nonce in the low bytes of the 96-bit ChaCha20 nonce
        let mut iv = [0u8; 12];
        iv[4..].copy_from_slice(stream_nonce);

        Ok(ChaCha20::new(&subkey, Nonce::from_slice(&iv)))
    }
}

impl EncryptionHandler for ChaCha20Handler {
    fn kind(&self) -> CipherKind {
        CipherKind::ChaCha20
    }

    fn encrypt(&self, plaintext: &[u8], key: &[u8]) -> CryptoResult<Vec<u8>> {
        require_key_len(key, Self::KEY_SIZE)?;

        let mut framed = vec![0u8; Self::NONCE_SIZE + plaintext.len()];
        let (nonce, body) = framed.split_at_mut(Self::NONCE_SIZE);
        self.rng.fill(nonce)?;

        body.copy_from_slice(plaintext);
        Self::stream(key, nonce)?.apply_keystream(body);
        Ok(framed)
    }

    fn decrypt(&self, framed: &[u8], key: &[u8]) -> CryptoResult<Vec<u8>> {
        require_key_len(key, Self::KEY_SIZE)?;
        require_len(framed, Self::NONCE_SIZE)?;

        let (nonce, ciphertext) = framed.split_at(Self::NONCE_SIZE);
        let mut plaintext = ciphertext.to_vec();
        Self::stream(key, nonce)?.apply_keystream(&mut plaintext);
        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CryptoError, OsRandom, generate_key};
    use chacha20::{XChaCha20, XNonce};

    fn handler() -> ChaCha20Handler {
        ChaCha20Handler::new(Arc::new(OsRandom))
    }

    #[test]
    fn test_encrypt_decrypt() {
        let handler = handler();
        let key = generate_key(CipherKind::ChaCha20, &OsRandom).unwrap();

        let message = b"secret message for the chacha20 handler";
        let framed = handler.encrypt(message, key.as_bytes()).unwrap();
        assert_eq!(framed.len(), ChaCha20Handler::NONCE_SIZE + message.len());

        let plain = handler.decrypt(&framed, key.as_bytes()).unwrap();
        assert_eq!(plain, message);
    }

    #[test]
    fn test_matches_xchacha20_construction() {
        let handler = handler();
        let key = [0x42u8; 32];
        let message = b"subkey derivation must match XChaCha20";
        let framed = handler.encrypt(message, &key).unwrap();

        let (nonce, ciphertext) = framed.split_at(ChaCha20Handler::NONCE_SIZE);
        let mut reference = ciphertext.to_vec();
        XChaCha20::new(Key::from_slice(&key), XNonce::from_slice(nonce))
            .apply_keystream(&mut reference);
        assert_eq!(reference, message);
    }

    #[test]
    fn test_corruption_is_not_detected() {
        let handler = handler();
        let key = generate_key(CipherKind::ChaCha20, &OsRandom).unwrap();
        let message = b"no integrity here";
        let mut framed = handler.encrypt(message, key.as_bytes()).unwrap();

        let offset = 5;
        framed[ChaCha20Handler::NONCE_SIZE + offset] ^= 0xff;

        let plain = handler.decrypt(&framed, key.as_bytes()).unwrap();
        assert_eq!(plain.len(), message.len());
        assert_eq!(plain[offset], message[offset] ^ 0xff);
        assert_eq!(&plain[..offset], &message[..offset]);
        assert_eq!(&plain[offset + 1..], &message[offset + 1..]);
    }

    #[test]
    fn test_short_ciphertext() {
        let handler = handler();
        let key = generate_key(CipherKind::ChaCha20, &OsRandom).unwrap();
        assert!(matches!(
            handler.decrypt(b"short", key.as_bytes()),
            Err(CryptoError::CiphertextTooShort {
                minimum: 24,
                actual: 5
            })
        ));
        // nonce only: empty plaintext
        assert!(handler.decrypt(&[0u8; 24], key.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_key_length() {
        let handler = handler();
        assert!(matches!(
            handler.encrypt(b"message", &[0u8; 16]),
            Err(CryptoError::InvalidKeyLength {
                expected: 32,
                actual: 16
            })
        ));
        assert!(matches!(
            handler.decrypt(&[0u8; 40], &[0u8; 8]),
            Err(CryptoError::InvalidKeyLength { .. })
        ));
    }

    #[test]
    fn test_fresh_nonce_per_message() {
        let handler = handler();
        let key = generate_key(CipherKind::ChaCha20, &OsRandom).unwrap();
        let a = handler.encrypt(b"same", key.as_bytes()).unwrap();
        let b = handler.encrypt(b"same", key.as_bytes()).unwrap();
        assert_ne!(a[..24], b[..24]);
        assert_ne!(a, b);
    }
}
