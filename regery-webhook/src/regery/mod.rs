//! Regery DNS-01 solver
//!
//! Handles:
//! - Credential lookup from the Secret named in the Issuer config
//! - TXT record creation (Present) and removal (CleanUp) via the Regery API

mod credentials;
mod error;
mod records;

pub use credentials::{API_KEY_FIELD, API_SECRET_FIELD, Credentials, ProviderConfig, resolve};
pub use error::{CredentialError, SolverError};
pub use records::{
    RecordsClient, RecordsPayload, TxtRecord, is_outside_zone, normalize_name, record_label,
    records_url,
};

use crate::defaults::{REGERY_API_BASE, SOLVER_NAME};
use crate::secrets::{KubeSecretStore, SecretStore};
use crate::webhook::{Solver, StopSignal};
use async_trait::async_trait;
use regery_core::ChallengeRequest;
use reqwest::Method;
use std::sync::Arc;

/// Which side of the challenge lifecycle a call handles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordOperation {
    Create,
    Delete,
}

impl RecordOperation {
    fn method(self) -> Method {
        match self {
            RecordOperation::Create => Method::POST,
            RecordOperation::Delete => Method::DELETE,
        }
    }

    fn payload<'a>(self, name: &'a str, value: &'a str) -> RecordsPayload<'a> {
        match self {
            RecordOperation::Create => RecordsPayload::create(name, value),
            RecordOperation::Delete => RecordsPayload::delete(name, value),
        }
    }
}

/// Solver publishing DNS-01 challenge records through the Regery API
pub struct RegerySolver {
    secrets: Option<Arc<dyn SecretStore>>,
    api_url: String,
    records: RecordsClient,
}

impl Default for RegerySolver {
    fn default() -> Self {
        Self::new()
    }
}

impl RegerySolver {
    /// Create an uninitialized solver. `initialize` attaches the secret store.
    pub fn new() -> Self {
        Self {
            secrets: None,
            api_url: REGERY_API_BASE.to_string(),
            records: RecordsClient::new(),
        }
    }

    /// Use an already built secret store instead of connecting in `initialize`.
    pub fn with_secret_store(mut self, store: Arc<dyn SecretStore>) -> Self {
        self.secrets = Some(store);
        self
    }

    /// Point the solver at a different API endpoint (mock servers in tests).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn is_initialized(&self) -> bool {
        self.secrets.is_some()
    }

    async fn credentials(&self, challenge: &ChallengeRequest) -> Result<Credentials, SolverError> {
        let store = self.secrets.as_deref().ok_or(SolverError::NotInitialized)?;

        resolve(store, &self.api_url, challenge)
            .await
            .map_err(|source| SolverError::Credentials {
                namespace: challenge.resource_namespace.clone(),
                source,
            })
    }

    async fn update_record(
        &self,
        challenge: &ChallengeRequest,
        operation: RecordOperation,
    ) -> Result<(), SolverError> {
        tracing::debug!(
            namespace = %challenge.resource_namespace,
            zone = %challenge.resolved_zone,
            fqdn = %challenge.resolved_fqdn,
            ?operation,
            "Handling challenge record"
        );

        let credentials = self.credentials(challenge).await?;

        let zone = normalize_name(&challenge.resolved_zone);
        if is_outside_zone(&challenge.resolved_fqdn, zone) {
            tracing::warn!(
                zone = %zone,
                fqdn = %challenge.resolved_fqdn,
                "FQDN is outside the zone, publishing the full name as record label"
            );
        }
        let label = record_label(&challenge.resolved_fqdn, zone);
        let url = records_url(&credentials.api_url, zone);
        let payload = operation.payload(&label, &challenge.key);

        if let Err(e) = self
            .records
            .send(operation.method(), &url, &payload, &credentials)
            .await
        {
            tracing::error!(fqdn = %challenge.resolved_fqdn, "{}", e);
            return Err(e);
        }

        match operation {
            RecordOperation::Create => {
                tracing::info!(fqdn = %challenge.resolved_fqdn, "Presented TXT record")
            }
            RecordOperation::Delete => {
                tracing::info!(fqdn = %challenge.resolved_fqdn, "Deleted TXT record")
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Solver for RegerySolver {
    type Error = SolverError;

    fn name(&self) -> &str {
        SOLVER_NAME
    }

    async fn initialize(&mut self, host: kube::Config, stop: StopSignal) -> Result<(), SolverError> {
        tracing::debug!(
            cluster_url = %host.cluster_url,
            stop_requested = *stop.borrow(),
            "Initializing Regery solver"
        );

        let store = KubeSecretStore::try_from_config(host).map_err(SolverError::Initialize)?;
        self.secrets = Some(Arc::new(store));
        Ok(())
    }

    async fn present(&self, challenge: &ChallengeRequest) -> Result<(), SolverError> {
        self.update_record(challenge, RecordOperation::Create).await
    }

    async fn clean_up(&self, challenge: &ChallengeRequest) -> Result<(), SolverError> {
        self.update_record(challenge, RecordOperation::Delete).await
    }
}
