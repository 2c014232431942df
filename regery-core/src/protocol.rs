//! cert-manager webhook protocol types
//!
//! cert-manager talks to DNS-01 webhook solvers by creating a
//! `ChallengePayload` resource in the solver's API group. The request half
//! describes the challenge, the response half reports the outcome.

use serde::{Deserialize, Serialize};

/// Version of the webhook API served under each solver group.
pub const WEBHOOK_API_VERSION: &str = "v1alpha1";

/// `apiVersion` carried by every `ChallengePayload`.
pub const CHALLENGE_PAYLOAD_API_VERSION: &str = "acme.cert-manager.io/v1alpha1";

pub const CHALLENGE_PAYLOAD_KIND: &str = "ChallengePayload";

/// Envelope exchanged between cert-manager and the webhook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengePayload {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<ChallengeRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ChallengeResponse>,
}

fn default_api_version() -> String {
    CHALLENGE_PAYLOAD_API_VERSION.to_string()
}

fn default_kind() -> String {
    CHALLENGE_PAYLOAD_KIND.to_string()
}

impl ChallengePayload {
    pub fn for_request(request: ChallengeRequest) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            request: Some(request),
            response: None,
        }
    }

    pub fn for_response(response: ChallengeResponse) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            request: None,
            response: Some(response),
        }
    }
}

/// What the solver is asked to do with the challenge record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeAction {
    Present,
    CleanUp,
}

impl std::fmt::Display for ChallengeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChallengeAction::Present => write!(f, "Present"),
            ChallengeAction::CleanUp => write!(f, "CleanUp"),
        }
    }
}

/// A single DNS-01 challenge as handed to the solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRequest {
    #[serde(default)]
    pub uid: String,
    pub action: ChallengeAction,
    #[serde(rename = "type", default)]
    pub challenge_type: String,
    #[serde(default)]
    pub dns_name: String,
    /// Token value to publish in the TXT record
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub resource_namespace: String,
    #[serde(rename = "resolvedFQDN", default)]
    pub resolved_fqdn: String,
    #[serde(default)]
    pub resolved_zone: String,
    #[serde(default)]
    pub allow_ambient_credentials: bool,
    /// Solver-specific configuration from the Issuer, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

/// Outcome reported back to cert-manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    #[serde(default)]
    pub uid: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl ChallengeResponse {
    pub fn success(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            success: true,
            status: None,
        }
    }

    pub fn failure(uid: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            success: false,
            status: Some(Status::failure(
                StatusReason::InternalError,
                500,
                message.into(),
            )),
        }
    }

    /// Error message from a failed response
    pub fn error_message(&self) -> Option<&str> {
        self.status.as_ref().map(|s| s.message.as_str())
    }
}

/// Machine-readable reason attached to a failure status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusReason {
    BadRequest,
    Unauthorized,
    NotFound,
    InternalError,
}

/// Subset of the Kubernetes `meta/v1` Status object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    #[serde(default = "status_kind")]
    pub kind: String,
    #[serde(default = "status_api_version")]
    pub api_version: String,
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<StatusReason>,
    #[serde(default)]
    pub code: u16,
}

fn status_kind() -> String {
    "Status".to_string()
}

fn status_api_version() -> String {
    "v1".to_string()
}

impl Status {
    pub fn failure(reason: StatusReason, code: u16, message: impl Into<String>) -> Self {
        Self {
            kind: status_kind(),
            api_version: status_api_version(),
            status: "Failure".to_string(),
            message: message.into(),
            reason: Some(reason),
            code,
        }
    }
}

/// Discovery document for `/apis/{group}/{version}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResourceList {
    pub kind: String,
    pub api_version: String,
    pub group_version: String,
    pub resources: Vec<ApiResource>,
}

impl ApiResourceList {
    /// Discovery for a webhook group exposing one resource per solver.
    pub fn for_solvers<'a>(group: &str, solvers: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            kind: "APIResourceList".to_string(),
            api_version: "v1".to_string(),
            group_version: format!("{}/{}", group, WEBHOOK_API_VERSION),
            resources: solvers
                .into_iter()
                .map(|name| ApiResource {
                    name: name.to_string(),
                    singular_name: name.to_string(),
                    namespaced: false,
                    kind: CHALLENGE_PAYLOAD_KIND.to_string(),
                    verbs: vec!["create".to_string()],
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResource {
    pub name: String,
    pub singular_name: String,
    pub namespaced: bool,
    pub kind: String,
    pub verbs: Vec<String>,
}
