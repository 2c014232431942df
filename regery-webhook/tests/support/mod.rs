#![allow(dead_code)]

use regery_core::{ChallengeAction, ChallengeRequest};
use regery_webhook::RegerySolver;
use regery_webhook::secrets::StaticSecretStore;
use std::sync::Arc;
use wiremock::MockServer;

pub const NAMESPACE: &str = "cert-manager";
pub const SECRET_NAME: &str = "regery-credentials";

/// Challenge for `_acme-challenge.example.com.` in zone `example.com.`
pub fn challenge(action: ChallengeAction) -> ChallengeRequest {
    ChallengeRequest {
        uid: "6f1c2f43-5d0a-4b6e-9c1b-2a9a0c7f9e11".to_string(),
        action,
        challenge_type: "dns-01".to_string(),
        dns_name: "example.com".to_string(),
        key: "abc123".to_string(),
        resource_namespace: NAMESPACE.to_string(),
        resolved_fqdn: "_acme-challenge.example.com.".to_string(),
        resolved_zone: "example.com.".to_string(),
        allow_ambient_credentials: false,
        config: Some(serde_json::json!({ "secretName": SECRET_NAME })),
    }
}

pub fn store_with(data: &[(&str, &str)]) -> StaticSecretStore {
    StaticSecretStore::new().with_secret(NAMESPACE, SECRET_NAME, data.iter().copied())
}

pub fn credential_store() -> StaticSecretStore {
    store_with(&[("api-key", "K"), ("api-secret", "S")])
}

/// Solver wired to the mock API and an in-memory secret store
pub fn solver(api: &MockServer, store: StaticSecretStore) -> RegerySolver {
    regery_webhook::install_rustls_crypto_provider();
    RegerySolver::new()
        .with_api_url(api.uri())
        .with_secret_store(Arc::new(store))
}
