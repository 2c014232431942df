//! Serving certificate loading
//!
//! The webhook is registered as an aggregated API service, so the API
//! server reaches it over TLS using the certificate mounted into the pod.
//! With a requestheader client CA configured, the aggregator's client
//! certificate is verified against it.

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::{VerifierBuilderError, WebPkiClientVerifier};
use rustls::{RootCertStore, ServerConfig};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No certificates found in {0}")]
    NoCertificates(PathBuf),

    #[error("No private key found in {0}")]
    NoPrivateKey(PathBuf),

    #[error("No CA certificates found in {0}")]
    NoClientCa(PathBuf),

    #[error("Invalid TLS configuration: {0}")]
    Rustls(#[from] rustls::Error),

    #[error("Failed to build client verifier: {0}")]
    ClientVerifier(#[from] VerifierBuilderError),
}

fn open(path: &Path) -> Result<BufReader<File>, TlsError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| TlsError::Read {
            path: path.to_path_buf(),
            source,
        })
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let certs = rustls_pemfile::certs(&mut open(path)?)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    if certs.is_empty() {
        return Err(TlsError::NoCertificates(path.to_path_buf()));
    }
    Ok(certs)
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    rustls_pemfile::private_key(&mut open(path)?)
        .map_err(|source| TlsError::Read {
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| TlsError::NoPrivateKey(path.to_path_buf()))
}

fn load_client_ca(path: &Path) -> Result<RootCertStore, TlsError> {
    let mut roots = RootCertStore::empty();
    for cert in load_certs(path).map_err(|e| match e {
        TlsError::NoCertificates(path) => TlsError::NoClientCa(path),
        other => other,
    })? {
        roots.add(cert)?;
    }

    tracing::info!(
        ca_file = %path.display(),
        cert_count = roots.len(),
        "Loaded requestheader client CA"
    );
    Ok(roots)
}

/// Build a rustls server config from PEM certificate chain and key files.
///
/// With `client_ca` set, clients may present a certificate and any
/// certificate presented must chain to that CA. Clients without one still
/// complete the handshake (kubelet probes); the router decides per route.
pub fn load_server_config(
    cert_path: &Path,
    key_path: &Path,
    client_ca: Option<&Path>,
) -> Result<ServerConfig, TlsError> {
    let certs = load_certs(cert_path)?;
    let key = load_private_key(key_path)?;

    let builder = ServerConfig::builder();
    let mut config = match client_ca {
        Some(ca_path) => {
            let verifier = WebPkiClientVerifier::builder(Arc::new(load_client_ca(ca_path)?))
                .allow_unauthenticated()
                .build()?;
            builder
                .with_client_cert_verifier(verifier)
                .with_single_cert(certs, key)?
        }
        None => builder.with_no_client_auth().with_single_cert(certs, key)?,
    };
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    tracing::debug!(cert = %cert_path.display(), "Loaded serving certificate");
    Ok(config)
}
