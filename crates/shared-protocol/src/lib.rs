//! Shared Protocol Definitions for the secure transport
//!
//! This crate contains the wire constants, message and session types shared
//! between the crypto layer, the transport and the server binary.

mod error;
mod session;

pub use error::*;
pub use session::*;

/// Width of a marshaled public key on the wire (uncompressed P-256 point)
pub const PUBLIC_KEY_WIRE_SIZE: usize = 65;

/// Size of the buffer each session reads into
pub const READ_BUFFER_SIZE: usize = 4096;

/// Default capacity of the server's message queue
pub const MESSAGE_QUEUE_CAPACITY: usize = 10;

/// Payload encrypted and written back after every accepted message
pub const ACKNOWLEDGEMENT: &[u8] = b"Thanks for sending stuff\n";

/// Default listen address for the server
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";
