//! Session and message types

use std::net::SocketAddr;

use bytes::Bytes;
use uuid::Uuid;

use crate::{PUBLIC_KEY_WIRE_SIZE, ProtocolError, ProtocolResult};

/// Unique identifier assigned to every accepted connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // First group of the UUID is enough to tell connections apart in logs
        let full = self.0.simple().to_string();
        write!(f, "{}", &full[..8])
    }
}

/// Where a message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub connection: ConnectionId,
    pub peer_addr: SocketAddr,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.peer_addr, self.connection)
    }
}

/// Decrypted application message handed to the consumer
#[derive(Debug, Clone)]
pub struct Message {
    pub origin: Origin,
    pub payload: Bytes,
}

impl Message {
    pub fn new(origin: Origin, payload: impl Into<Bytes>) -> Self {
        Self {
            origin,
            payload: payload.into(),
        }
    }

    /// Payload as text, replacing invalid UTF-8
    pub fn payload_lossy(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Public key exactly as it travels on the wire
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKeyWire(pub [u8; PUBLIC_KEY_WIRE_SIZE]);

impl PublicKeyWire {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for PublicKeyWire {
    type Error = ProtocolError;

    fn try_from(bytes: &[u8]) -> ProtocolResult<Self> {
        let array: [u8; PUBLIC_KEY_WIRE_SIZE] =
            bytes
                .try_into()
                .map_err(|_| ProtocolError::InvalidPublicKeyLength {
                    expected: PUBLIC_KEY_WIRE_SIZE,
                    actual: bytes.len(),
                })?;
        Ok(Self(array))
    }
}

impl std::fmt::Debug for PublicKeyWire {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKeyWire(")?;
        for byte in &self.0[..8] {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, "..)")
    }
}

/// Per-connection session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Socket accepted, nothing exchanged yet
    Connected,
    /// Public keys are being exchanged
    KeyExchanging,
    /// Shared secret established, application messages flowing
    SecureLoop,
    /// Peer disconnected cleanly
    Closed,
    /// Handshake or session failed
    Failed,
}

impl SessionState {
    /// Whether the session can no longer change state
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }

    /// Whether `to` is a legal next state
    pub fn can_transition_to(self, to: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, to),
            (Connected, KeyExchanging)
                | (KeyExchanging, SecureLoop)
                | (SecureLoop, Closed)
                | (Connected, Failed)
                | (KeyExchanging, Failed)
                | (SecureLoop, Failed)
        )
    }

    /// Move to `to`, rejecting transitions the state machine does not allow
    pub fn transition(self, to: SessionState) -> ProtocolResult<SessionState> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(ProtocolError::InvalidStateTransition { from: self, to })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let state = SessionState::Connected;
        let state = state.transition(SessionState::KeyExchanging).unwrap();
        let state = state.transition(SessionState::SecureLoop).unwrap();
        let state = state.transition(SessionState::Closed).unwrap();
        assert!(state.is_terminal());
    }

    #[test]
    fn test_failed_reachable_from_non_terminal_states() {
        for state in [
            SessionState::Connected,
            SessionState::KeyExchanging,
            SessionState::SecureLoop,
        ] {
            assert_eq!(
                state.transition(SessionState::Failed).unwrap(),
                SessionState::Failed
            );
        }
    }

    #[test]
    fn test_terminal_states_reject_transitions() {
        for from in [SessionState::Closed, SessionState::Failed] {
            let err = from.transition(SessionState::SecureLoop).unwrap_err();
            assert!(matches!(err, ProtocolError::InvalidStateTransition { .. }));
        }
    }

    #[test]
    fn test_handshake_cannot_be_skipped() {
        assert!(
            SessionState::Connected
                .transition(SessionState::SecureLoop)
                .is_err()
        );
        assert!(
            SessionState::KeyExchanging
                .transition(SessionState::Closed)
                .is_err()
        );
    }

    #[test]
    fn test_public_key_wire_length() {
        let bytes = [4u8; PUBLIC_KEY_WIRE_SIZE];
        assert!(PublicKeyWire::try_from(&bytes[..]).is_ok());

        let err = PublicKeyWire::try_from(&bytes[..64]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::InvalidPublicKeyLength {
                expected: 65,
                actual: 64
            }
        ));
        assert!(PublicKeyWire::try_from(&[0u8; 66][..]).is_err());
    }

    #[test]
    fn test_message_payload_lossy() {
        let origin = Origin {
            connection: ConnectionId::new(),
            peer_addr: "127.0.0.1:9000".parse().unwrap(),
        };
        let msg = Message::new(origin, b"hello".to_vec());
        assert_eq!(msg.payload_lossy(), "hello");
    }
}
