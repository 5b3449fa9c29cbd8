//! Secure Server
//!
//! Accepts TCP connections, runs a P-256 key exchange with each client and
//! prints every decrypted message it receives.

mod config;

use anyhow::Context;
use net_transport::{
    SecureServer, ShutdownHandle, load_certificate_chain, load_private_key, load_trusted_roots,
};
use shared_protocol::Message;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("secure_server=debug".parse()?)
                .add_directive("net_transport=info".parse()?),
        )
        .init();

    info!("Starting Secure Server");

    let settings = Settings::load(std::env::args().skip(1), |key| std::env::var(key).ok())
        .context("loading settings")?;
    load_tls_material(&settings)?;

    let (server, messages, shutdown) = SecureServer::new(settings.server_config());
    let server = server.bind().await?;

    let consumer = tokio::spawn(print_messages(messages));
    let signal = tokio::spawn(shutdown_on_ctrl_c(shutdown));

    server.serve().await?;

    signal.abort();
    consumer.await?;
    info!("Server stopped");

    Ok(())
}

/// Certificate material is optional and never sent on the wire; loading it
/// at startup catches misconfigured paths early.
fn load_tls_material(settings: &Settings) -> anyhow::Result<()> {
    if let (Some(cert_path), Some(key_path)) = (&settings.certificate_path, &settings.private_key_path) {
        let chain = load_certificate_chain(cert_path)?;
        load_private_key(key_path)?;
        info!(certificates = chain.len(), "Loaded server certificate");
    }

    if let Some(roots_path) = &settings.trusted_roots_path {
        let roots = load_trusted_roots(roots_path)?;
        info!(roots = roots.len(), "Loaded trusted roots");
    }

    Ok(())
}

async fn print_messages(mut messages: mpsc::Receiver<Message>) {
    while let Some(message) = messages.recv().await {
        println!(
            "received message from ({}): {}",
            message.origin.peer_addr,
            message.payload_lossy()
        );
    }
    debug!("Message queue closed");
}

async fn shutdown_on_ctrl_c(shutdown: ShutdownHandle) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Ctrl-C received");
            shutdown.shutdown();
        }
        Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
    }
}
