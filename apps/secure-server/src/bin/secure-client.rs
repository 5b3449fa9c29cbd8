//! Demo client: sends each line of stdin to the server and prints the reply
//!
//! Usage: `secure-client [ADDR] [CIPHER] [KEY_DERIVATION]`

use std::net::SocketAddr;

use anyhow::Context;
use crypto_session::{CipherKind, KeyDerivation};
use net_transport::SecureClient;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("secure_client=info".parse()?),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let addr: SocketAddr = args
        .next()
        .unwrap_or_else(|| "127.0.0.1:3000".to_string())
        .parse()
        .context("invalid server address")?;
    let cipher: CipherKind = match args.next() {
        Some(s) => s.parse()?,
        None => CipherKind::default(),
    };
    let derivation: KeyDerivation = match args.next() {
        Some(s) => s.parse()?,
        None => KeyDerivation::default(),
    };

    let mut client = SecureClient::connect(addr, cipher, derivation).await?;
    info!(%addr, %cipher, "Connected, type messages and press enter");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match client.request(line.as_bytes()).await {
            Ok(reply) => print!("{}", String::from_utf8_lossy(&reply)),
            Err(e) => {
                eprintln!("{}", e);
                break;
            }
        }
    }

    client.shutdown().await?;
    Ok(())
}
