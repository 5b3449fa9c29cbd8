//! DES in CBC mode with PKCS#7 padding

use std::sync::Arc;

use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::NoPadding};
use des::Des;

use super::{CipherKind, EncryptionHandler, require_key_len, require_len};
use crate::padding::{pkcs7_pad, pkcs7_unpad};
use crate::{CryptoError, CryptoResult, RandomSource};

type DesCbcEnc = cbc::Encryptor<Des>;
type DesCbcDec = cbc::Decryptor<Des>;

/// Legacy DES-CBC handler. Only padding is checked on decrypt.
///
/// Framed output: `[8-byte IV][padded ciphertext]`
pub struct DesCbcHandler {
    rng: Arc<dyn RandomSource>,
}

impl DesCbcHandler {
    pub const KEY_SIZE: usize = 8;
    pub const BLOCK_SIZE: usize = 8;
    pub const IV_SIZE: usize = Self::BLOCK_SIZE;

    pub fn new(rng: Arc<dyn RandomSource>) -> Self {
        Self { rng }
    }

    fn invalid_key(key: &[u8]) -> CryptoError {
        CryptoError::InvalidKeyLength {
            expected: Self::KEY_SIZE,
            actual: key.len(),
        }
    }
}

impl EncryptionHandler for DesCbcHandler {
    fn kind(&self) -> CipherKind {
        CipherKind::DesCbc
    }

    fn encrypt(&self, plaintext: &[u8], key: &[u8]) -> CryptoResult<Vec<u8>> {
        require_key_len(key, Self::KEY_SIZE)?;

        let padded = pkcs7_pad(plaintext, Self::BLOCK_SIZE)?;

        let mut iv = [0u8; Self::IV_SIZE];
        self.rng.fill(&mut iv)?;

        let encryptor = DesCbcEnc::new_from_slices(key, &iv).map_err(|_| Self::invalid_key(key))?;
        let ciphertext = encryptor.encrypt_padded_vec_mut::<NoPadding>(&padded);

        let mut framed = Vec::with_capacity(Self::IV_SIZE + ciphertext.len());
        framed.extend_from_slice(&iv);
        framed.extend_from_slice(&ciphertext);
        Ok(framed)
    }

    fn decrypt(&self, framed: &[u8], key: &[u8]) -> CryptoResult<Vec<u8>> {
        require_key_len(key, Self::KEY_SIZE)?;
        require_len(framed, Self::IV_SIZE)?;

        let (iv, ciphertext) = framed.split_at(Self::IV_SIZE);
        if ciphertext.len() % Self::BLOCK_SIZE != 0 {
            return Err(CryptoError::NotBlockAligned(ciphertext.len()));
        }

        let decryptor = DesCbcDec::new_from_slices(key, iv).map_err(|_| Self::invalid_key(key))?;
        let padded = decryptor
            .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
            .map_err(|_| CryptoError::NotBlockAligned(ciphertext.len()))?;

        pkcs7_unpad(&padded, Self::BLOCK_SIZE).map(<[u8]>::to_vec)
    }
}
