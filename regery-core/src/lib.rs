//! Regery Core - cert-manager webhook protocol types
//!
//! This crate contains the `ChallengePayload` envelope exchanged between
//! cert-manager and a DNS-01 webhook solver, plus the Kubernetes discovery
//! and status objects the webhook server returns.
//!
//! Provider-specific logic (credentials, Regery API calls) lives in the
//! `regery-webhook` crate.

mod protocol;

pub use protocol::*;
