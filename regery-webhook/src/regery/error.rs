use crate::secrets::SecretStoreError;
use reqwest::{Method, StatusCode};
use thiserror::Error;

/// Errors raised while resolving Regery credentials for a challenge
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("error decoding solver config: {0}")]
    ConfigDecode(#[source] serde_json::Error),

    #[error("unable to get secret `{namespace}/{name}`: {source}")]
    SecretLookup {
        namespace: String,
        name: String,
        #[source]
        source: SecretStoreError,
    },

    #[error("unable to get {key} from secret `{namespace}/{name}`: key {key:?} not found in secret data")]
    MissingField {
        key: &'static str,
        namespace: String,
        name: String,
    },
}

/// Errors returned by the Regery solver to the webhook host
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("unable to resolve credentials in namespace `{namespace}`: {source}")]
    Credentials {
        namespace: String,
        #[source]
        source: CredentialError,
    },

    #[error("failed to marshal records payload: {0}")]
    PayloadEncode(#[source] serde_json::Error),

    #[error("Error calling Regery API status: {status} url: {url} method: {method}")]
    ApiRequest {
        status: StatusCode,
        url: String,
        method: Method,
    },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("unable to build Kubernetes client: {0}")]
    Initialize(#[source] SecretStoreError),

    #[error("solver used before initialization")]
    NotInitialized,
}

impl SolverError {
    /// Inner credential error, if resolving credentials is what failed
    pub fn credential_error(&self) -> Option<&CredentialError> {
        match self {
            SolverError::Credentials { source, .. } => Some(source),
            _ => None,
        }
    }
}
