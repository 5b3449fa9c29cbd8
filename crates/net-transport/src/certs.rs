//! PEM certificate and key loading for deployments that configure TLS
//! material alongside the server

use std::path::Path;

use rustls::RootCertStore;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tracing::debug;

use crate::{TransportError, TransportResult};

fn certificate_error(path: &Path, e: impl std::fmt::Display) -> TransportError {
    TransportError::Certificate(format!("{}: {}", path.display(), e))
}

/// Load every certificate in a PEM file, leaf first
pub fn load_certificate_chain(
    path: impl AsRef<Path>,
) -> TransportResult<Vec<CertificateDer<'static>>> {
    let path = path.as_ref();
    let certs = CertificateDer::pem_file_iter(path)
        .map_err(|e| certificate_error(path, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| certificate_error(path, e))?;

    if certs.is_empty() {
        return Err(certificate_error(path, "no certificates found"));
    }

    debug!(path = %path.display(), count = certs.len(), "Loaded certificate chain");
    Ok(certs)
}

/// Load the first private key in a PEM file
pub fn load_private_key(path: impl AsRef<Path>) -> TransportResult<PrivateKeyDer<'static>> {
    let path = path.as_ref();
    PrivateKeyDer::from_pem_file(path).map_err(|e| certificate_error(path, e))
}

/// Build a root store from a PEM bundle
pub fn load_trusted_roots(path: impl AsRef<Path>) -> TransportResult<RootCertStore> {
    let path = path.as_ref();
    let certs = load_certificate_chain(path)?;

    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(certs);
    if added == 0 {
        return Err(certificate_error(path, "no usable trust anchors"));
    }

    debug!(path = %path.display(), added, ignored, "Loaded trusted roots");
    Ok(roots)
}
