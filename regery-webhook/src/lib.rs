//! Regery webhook - cert-manager DNS-01 solver
//!
//! cert-manager calls this webhook to publish and remove `_acme-challenge`
//! TXT records. The Regery solver resolves API credentials from a Kubernetes
//! Secret and issues one records call per challenge action.

pub mod config;
pub mod defaults;
pub mod regery;
pub mod secrets;
pub mod webhook;

pub use regery::RegerySolver;
pub use webhook::{Solver, StopSignal};

/// Pick the process-wide rustls crypto provider once. Safe to call repeatedly.
pub fn install_rustls_crypto_provider() {
    if rustls::crypto::CryptoProvider::get_default().is_some() {
        return;
    }

    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}
