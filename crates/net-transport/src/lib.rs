//! Network Transport - encrypted TCP sessions for the secure transport
//!
//! Every accepted connection performs a P-256 public key exchange and then
//! exchanges length-implicit ciphertext chunks: one socket read is one
//! message. Decrypted messages are delivered through a bounded queue.

mod certs;
mod client;
mod config;
mod error;
pub mod handshake;
mod queue;
mod server;
mod session;

pub use certs::*;
pub use client::*;
pub use config::*;
pub use error::*;
pub use queue::*;
pub use server::*;
pub use session::*;

use std::time::Duration;

/// Pause after a failed accept before trying again
pub const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);
