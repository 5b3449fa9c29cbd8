//! Crypto session error types

use thiserror::Error;

/// Cryptographic operation error
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Random source failed: {0}")]
    RandomSource(String),

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Invalid peer public key: {0}")]
    InvalidPeerKey(String),

    #[error("Invalid keys for shared secret derivation")]
    InvalidKeys,

    #[error("Ciphertext too short: need at least {minimum} bytes, got {actual}")]
    CiphertextTooShort { minimum: usize, actual: usize },

    #[error("Ciphertext length {0} is not a multiple of the block size")]
    NotBlockAligned(usize),

    #[error("Invalid padded data length")]
    InvalidLength,

    #[error("Invalid padding")]
    InvalidPadding,

    #[error("Decryption failed: authentication tag mismatch")]
    AuthenticationFailed,

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Unknown cipher: {0}")]
    UnknownCipher(String),

    #[error("Unknown key derivation: {0}")]
    UnknownKeyDerivation(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
