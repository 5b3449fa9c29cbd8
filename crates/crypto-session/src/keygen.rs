//! Symmetric key generation

use zeroize::Zeroizing;

use crate::{CipherKind, CryptoResult, RandomSource};

/// Symmetric key material for one cipher, wiped on drop
#[derive(Clone)]
pub struct CipherKey {
    kind: CipherKind,
    bytes: Zeroizing<Vec<u8>>,
}

impl CipherKey {
    /// Wrap existing key material, checking its length against `kind`
    pub fn from_bytes(kind: CipherKind, bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != kind.key_len() {
            return Err(crate::CryptoError::InvalidKeyLength {
                expected: kind.key_len(),
                actual: bytes.len(),
            });
        }
        Ok(Self {
            kind,
            bytes: Zeroizing::new(bytes.to_vec()),
        })
    }

    pub fn kind(&self) -> CipherKind {
        self.kind
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherKey")
            .field("kind", &self.kind)
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

/// Generate a fresh random key of the length `kind` requires
pub fn generate_key(kind: CipherKind, rng: &dyn RandomSource) -> CryptoResult<CipherKey> {
    let mut bytes = Zeroizing::new(vec![0u8; kind.key_len()]);
    rng.fill(&mut bytes)?;
    Ok(CipherKey { kind, bytes })
}
