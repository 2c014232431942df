//! cert-manager webhook host
//!
//! Handles:
//! - The `Solver` capability interface a DNS-01 provider implements
//! - Dispatching `ChallengePayload` requests to the registered solver
//! - Serving the webhook API over HTTPS (or plain HTTP for local runs)

mod server;
mod tls;

pub use server::{ServerError, WebhookServer, router};
pub use tls::{TlsError, load_server_config};

use async_trait::async_trait;
use regery_core::{ChallengeAction, ChallengeRequest, ChallengeResponse};

/// Flips to `true` once the process is asked to stop.
pub type StopSignal = tokio::sync::watch::Receiver<bool>;

/// A DNS-01 challenge solver as seen by the webhook server
///
/// `initialize` runs once before the server starts accepting requests;
/// `present` and `clean_up` may then be called concurrently.
#[async_trait]
pub trait Solver: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Solver name, matched against `solverName` in the Issuer
    fn name(&self) -> &str;

    async fn initialize(&mut self, host: kube::Config, stop: StopSignal)
    -> Result<(), Self::Error>;

    /// Publish the challenge record
    async fn present(&self, challenge: &ChallengeRequest) -> Result<(), Self::Error>;

    /// Remove the challenge record
    async fn clean_up(&self, challenge: &ChallengeRequest) -> Result<(), Self::Error>;
}

/// Run the requested action and turn the outcome into a webhook response.
pub async fn dispatch<S: Solver>(solver: &S, request: &ChallengeRequest) -> ChallengeResponse {
    let result = match request.action {
        ChallengeAction::Present => solver.present(request).await,
        ChallengeAction::CleanUp => solver.clean_up(request).await,
    };

    match result {
        Ok(()) => ChallengeResponse::success(&request.uid),
        Err(e) => {
            tracing::warn!(
                uid = %request.uid,
                action = %request.action,
                solver = solver.name(),
                "Challenge action failed: {}",
                e
            );
            ChallengeResponse::failure(&request.uid, e.to_string())
        }
    }
}
