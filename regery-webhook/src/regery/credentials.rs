//! Credential resolution
//!
//! The Issuer's solver config names a Secret in the challenge namespace.
//! That Secret must carry `api-key` and `api-secret` entries.

use super::error::CredentialError;
use crate::secrets::{SecretData, SecretStore};
use regery_core::ChallengeRequest;
use serde::Deserialize;

pub const API_KEY_FIELD: &str = "api-key";
pub const API_SECRET_FIELD: &str = "api-secret";

/// Solver configuration embedded in the Issuer
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default)]
    pub secret_name: String,
}

impl ProviderConfig {
    /// Parse the challenge's config blob. A missing blob is an empty config.
    pub fn from_challenge(config: Option<&serde_json::Value>) -> Result<Self, CredentialError> {
        match config {
            None => Ok(Self::default()),
            Some(value) => Self::deserialize(value).map_err(CredentialError::ConfigDecode),
        }
    }
}

/// Credentials for one Regery API call
#[derive(Clone)]
pub struct Credentials {
    pub api_url: String,
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    /// Value of the `Authorization` header: key and secret joined by a colon.
    pub fn authorization(&self) -> String {
        format!("{}:{}", self.api_key, self.api_secret)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

fn string_from_secret_data(data: &SecretData, key: &str) -> Option<String> {
    data.get(key)
        .map(|value| String::from_utf8_lossy(value).into_owned())
}

/// Look up the Secret referenced by the challenge and extract the API key pair.
pub async fn resolve(
    store: &dyn SecretStore,
    api_url: &str,
    challenge: &ChallengeRequest,
) -> Result<Credentials, CredentialError> {
    let config = ProviderConfig::from_challenge(challenge.config.as_ref())?;
    let namespace = challenge.resource_namespace.as_str();
    let name = config.secret_name;

    let data = store
        .get(namespace, &name)
        .await
        .map_err(|source| CredentialError::SecretLookup {
            namespace: namespace.to_string(),
            name: name.clone(),
            source,
        })?;

    let missing = |key: &'static str| CredentialError::MissingField {
        key,
        namespace: namespace.to_string(),
        name: name.clone(),
    };

    let api_key =
        string_from_secret_data(&data, API_KEY_FIELD).ok_or_else(|| missing(API_KEY_FIELD))?;
    let api_secret = string_from_secret_data(&data, API_SECRET_FIELD)
        .ok_or_else(|| missing(API_SECRET_FIELD))?;

    Ok(Credentials {
        api_url: api_url.to_string(),
        api_key,
        api_secret,
    })
}
