//! Public key exchange over a byte stream
//!
//! Transcript, responder's view:
//! 1. write our 65-byte public key
//! 2. read exactly 65 bytes of the peer's public key
//! 3. derive the shared secret locally
//!
//! The initiator does the same with steps 1 and 2 swapped.

use std::io::ErrorKind;

use crypto_session::{Handshake, RandomSource, Role, SharedSecret};
use shared_protocol::PUBLIC_KEY_WIRE_SIZE;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::{TransportError, TransportResult};

/// Run the server side of the key exchange
pub async fn respond<S>(stream: &mut S, rng: &dyn RandomSource) -> TransportResult<SharedSecret>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handshake = Handshake::new_responder(rng)?;

    send_public_key(stream, &handshake).await?;
    let peer = read_public_key(stream).await?;

    finish(handshake, &peer)
}

/// Run the client side of the key exchange
pub async fn initiate<S>(stream: &mut S, rng: &dyn RandomSource) -> TransportResult<SharedSecret>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handshake = Handshake::new_initiator(rng)?;

    let peer = read_public_key(stream).await?;
    send_public_key(stream, &handshake).await?;

    finish(handshake, &peer)
}

async fn send_public_key<S>(stream: &mut S, handshake: &Handshake) -> TransportResult<()>
where
    S: AsyncWrite + Unpin,
{
    let public = handshake.public_key();
    stream
        .write_all(public.as_bytes())
        .await
        .map_err(TransportError::Write)?;
    stream.flush().await.map_err(TransportError::Write)?;
    debug!(role = ?handshake.role(), "Sent public key");
    Ok(())
}

/// Read exactly one public key; a short read is a failure, not a partial key
async fn read_public_key<S>(stream: &mut S) -> TransportResult<[u8; PUBLIC_KEY_WIRE_SIZE]>
where
    S: AsyncRead + Unpin,
{
    let mut peer = [0u8; PUBLIC_KEY_WIRE_SIZE];
    match stream.read_exact(&mut peer).await {
        Ok(_) => Ok(peer),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(TransportError::Handshake(format!(
            "peer closed the connection before sending a {PUBLIC_KEY_WIRE_SIZE}-byte public key"
        ))),
        Err(e) => Err(TransportError::Read(e)),
    }
}

fn finish(handshake: Handshake, peer: &[u8]) -> TransportResult<SharedSecret> {
    let role: Role = handshake.role();
    let secret = handshake.complete(peer)?;
    debug!(?role, "Derived shared secret");
    Ok(secret)
}
