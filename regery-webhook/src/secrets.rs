//! Secret store access
//!
//! Provider credentials live in Kubernetes Secrets next to the Issuer.
//! `KubeSecretStore` reads them through the API server; `StaticSecretStore`
//! keeps them in memory for tests and local runs.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Key-value payload of a secret, values as raw bytes
pub type SecretData = BTreeMap<String, Vec<u8>>;

/// Errors that can occur while reading a secret
#[derive(Debug, Error)]
pub enum SecretStoreError {
    #[error("resource name may not be empty")]
    EmptyName,

    #[error("secret \"{name}\" not found in namespace \"{namespace}\"")]
    NotFound { namespace: String, name: String },

    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
}

/// Read-only access to named secrets
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, namespace: &str, name: &str) -> Result<SecretData, SecretStoreError>;
}

/// Secret store backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
}

impl KubeSecretStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from connection settings handed over by the host.
    pub fn try_from_config(config: kube::Config) -> Result<Self, SecretStoreError> {
        let client = Client::try_from(config)?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<SecretData, SecretStoreError> {
        if name.is_empty() {
            return Err(SecretStoreError::EmptyName);
        }

        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = api
            .get_opt(name)
            .await?
            .ok_or_else(|| SecretStoreError::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })?;

        Ok(secret
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(key, value)| (key, value.0))
            .collect())
    }
}

/// In-memory secret store keyed by (namespace, name)
#[derive(Debug, Clone, Default)]
pub struct StaticSecretStore {
    secrets: HashMap<(String, String), SecretData>,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret<K, V>(
        mut self,
        namespace: &str,
        name: &str,
        data: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        let data = data
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self.secrets
            .insert((namespace.to_string(), name.to_string()), data);
        self
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<SecretData, SecretStoreError> {
        if name.is_empty() {
            return Err(SecretStoreError::EmptyName);
        }

        self.secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| SecretStoreError::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }
}
