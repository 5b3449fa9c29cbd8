//! Crypto Session - handshake and message encryption for the secure transport
//!
//! Provides an ephemeral P-256 key exchange and three interchangeable
//! symmetric ciphers (AES-256-GCM, extended-nonce ChaCha20, DES-CBC) behind
//! a single [`EncryptionHandler`] trait.

mod cipher;
mod error;
mod exchange;
mod keygen;
mod padding;
mod random;
mod session;

pub use cipher::*;
pub use error::*;
pub use exchange::*;
pub use keygen::*;
pub use padding::*;
pub use random::*;
pub use session::*;

/// Shared secret size (P-256 x-coordinate, 32 bytes)
pub const SHARED_SECRET_SIZE: usize = 32;
