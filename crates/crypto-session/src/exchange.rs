//! Ephemeral P-256 key exchange

use p256::ecdh::diffie_hellman;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use shared_protocol::{PUBLIC_KEY_WIRE_SIZE, PublicKeyWire};
use tracing::debug;
use zeroize::Zeroizing;

use crate::{CryptoError, CryptoResult, RandomSource, SHARED_SECRET_SIZE};

/// SEC1 tag of an uncompressed point
const UNCOMPRESSED_TAG: u8 = 0x04;

/// Attempts before giving up on drawing a valid scalar.
/// A uniformly random 32-byte string is out of range with probability ~2^-32.
const MAX_SCALAR_ATTEMPTS: usize = 8;

/// Key pair for ephemeral key exchange
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a new ephemeral key pair
    pub fn generate(rng: &dyn RandomSource) -> CryptoResult<Self> {
        let mut scalar = Zeroizing::new([0u8; 32]);
        for attempt in 1..=MAX_SCALAR_ATTEMPTS {
            rng.fill(&mut scalar[..])
                .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
            if let Ok(secret) = SecretKey::from_slice(&scalar[..]) {
                return Ok(Self::from_secret(secret));
            }
            debug!(attempt, "Drawn scalar out of range, retrying");
        }
        Err(CryptoError::KeyGeneration(
            "random source did not produce a valid scalar".into(),
        ))
    }

    /// Rebuild a key pair from a raw 32-byte private scalar.
    ///
    /// Fails with `InvalidKeys` for a zero or out-of-range scalar.
    pub fn from_private_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidKeys);
        }
        SecretKey::from_slice(bytes)
            .map(Self::from_secret)
            .map_err(|_| CryptoError::InvalidKeys)
    }

    fn from_secret(secret: SecretKey) -> Self {
        let public = secret.public_key();
        Self { secret, public }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Get the public key in its wire form
    pub fn public_key_wire(&self) -> PublicKeyWire {
        marshal_public_key(&self.public)
    }

    /// Perform Diffie-Hellman key exchange against the peer's public key
    pub fn diffie_hellman(&self, their_public: &PublicKey) -> SharedSecret {
        derive_shared_secret(&self.secret, their_public)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public_key_wire())
            .finish_non_exhaustive()
    }
}

/// Raw ECDH output (the shared x-coordinate), wiped on drop
pub struct SharedSecret(Zeroizing<[u8; SHARED_SECRET_SIZE]>);

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8; SHARED_SECRET_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

/// Encode a public key as a 65-byte uncompressed SEC1 point
pub fn marshal_public_key(public: &PublicKey) -> PublicKeyWire {
    let encoded = public.to_encoded_point(false);
    let mut wire = [0u8; PUBLIC_KEY_WIRE_SIZE];
    wire.copy_from_slice(encoded.as_bytes());
    PublicKeyWire(wire)
}

/// Decode a peer's public key from the wire.
///
/// Only the 65-byte uncompressed form is accepted, and the point must lie on
/// the curve.
pub fn unmarshal_public_key(bytes: &[u8]) -> CryptoResult<PublicKey> {
    let wire =
        PublicKeyWire::try_from(bytes).map_err(|e| CryptoError::InvalidPeerKey(e.to_string()))?;

    if wire.0[0] != UNCOMPRESSED_TAG {
        return Err(CryptoError::InvalidPeerKey(format!(
            "expected uncompressed point tag 0x04, got {:#04x}",
            wire.0[0]
        )));
    }

    PublicKey::from_sec1_bytes(wire.as_bytes())
        .map_err(|_| CryptoError::InvalidPeerKey("point is not on the curve".into()))
}

/// Compute the ECDH shared secret between our private key and a peer key
pub fn derive_shared_secret(secret: &SecretKey, peer: &PublicKey) -> SharedSecret {
    let shared = diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
    let mut bytes = Zeroizing::new([0u8; SHARED_SECRET_SIZE]);
    bytes.copy_from_slice(shared.raw_secret_bytes().as_slice());
    SharedSecret(bytes)
}

/// Which side of the handshake we are on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// We opened the connection (client)
    Initiator,
    /// We accepted the connection (server)
    Responder,
}

/// One side of a key exchange in progress
#[derive(Debug)]
pub struct Handshake {
    our_keypair: KeyPair,
    role: Role,
}

impl Handshake {
    /// Start a new handshake as initiator
    pub fn new_initiator(rng: &dyn RandomSource) -> CryptoResult<Self> {
        Ok(Self {
            our_keypair: KeyPair::generate(rng)?,
            role: Role::Initiator,
        })
    }

    /// Start a new handshake as responder
    pub fn new_responder(rng: &dyn RandomSource) -> CryptoResult<Self> {
        Ok(Self {
            our_keypair: KeyPair::generate(rng)?,
            role: Role::Responder,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Get our public key to send to the peer
    pub fn public_key(&self) -> PublicKeyWire {
        self.our_keypair.public_key_wire()
    }

    /// Complete the handshake with the peer's public key bytes.
    ///
    /// Consumes the handshake so the ephemeral private key is dropped as soon
    /// as the secret exists.
    pub fn complete(self, their_public: &[u8]) -> CryptoResult<SharedSecret> {
        let their_public = unmarshal_public_key(their_public)?;
        Ok(self.our_keypair.diffie_hellman(&their_public))
    }
}
