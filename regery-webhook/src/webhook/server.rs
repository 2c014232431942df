//! Webhook API server
//!
//! Routes:
//! - POST /apis/{group}/v1alpha1/{solver}: solve a `ChallengePayload`
//! - GET  /apis/{group}/v1alpha1: API discovery for the aggregator
//! - GET  /healthz, /livez, /readyz: probes
//!
//! The `/apis` routes answer 401 on TLS connections that did not present a
//! client certificate when the server requires one. Probes stay open.

use super::{Solver, StopSignal, dispatch};
use crate::defaults::{ACCEPT_ERROR_BACKOFF, SHUTDOWN_GRACE_PERIOD};
use axum::body::Bytes;
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use regery_core::{
    ApiResourceList, ChallengePayload, Status, StatusReason, WEBHOOK_API_VERSION,
};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

struct WebhookState<S> {
    group_name: String,
    solver: Arc<S>,
}

impl<S: Solver> WebhookState<S> {
    fn reject_foreign_path(&self, group: &str, version: &str) -> Option<Response> {
        if group != self.group_name || version != WEBHOOK_API_VERSION {
            return Some(status_response(
                StatusCode::NOT_FOUND,
                StatusReason::NotFound,
                format!("the server could not find the requested resource ({}/{})", group, version),
            ));
        }
        None
    }
}

fn status_response(code: StatusCode, reason: StatusReason, message: impl Into<String>) -> Response {
    (code, Json(Status::failure(reason, code.as_u16(), message))).into_response()
}

/// Build the webhook router for a single registered solver.
pub fn router<S: Solver>(group_name: impl Into<String>, solver: Arc<S>) -> Router {
    let state = Arc::new(WebhookState {
        group_name: group_name.into(),
        solver,
    });

    let apis = Router::new()
        .route("/apis/{group}/{version}", get(discovery::<S>))
        .route("/apis/{group}/{version}/{resource}", post(solve::<S>))
        .route_layer(middleware::from_fn(require_client_certificate))
        .with_state(state);

    Router::new()
        .route("/healthz", get(health))
        .route("/livez", get(health))
        .route("/readyz", get(health))
        .merge(apis)
}

/// Client certificate state of the connection a request arrived on.
/// Only attached when the server requires client certificates.
#[derive(Debug, Clone, Copy)]
struct ClientCertificate {
    verified: bool,
}

async fn require_client_certificate(request: Request, next: Next) -> Response {
    if let Some(ClientCertificate { verified: false }) =
        request.extensions().get::<ClientCertificate>()
    {
        tracing::warn!(
            path = %request.uri().path(),
            "Rejected request without client certificate"
        );
        return status_response(
            StatusCode::UNAUTHORIZED,
            StatusReason::Unauthorized,
            "client certificate required",
        );
    }
    next.run(request).await
}

async fn health() -> &'static str {
    "ok"
}

async fn discovery<S: Solver>(
    State(state): State<Arc<WebhookState<S>>>,
    Path((group, version)): Path<(String, String)>,
) -> Response {
    if let Some(rejection) = state.reject_foreign_path(&group, &version) {
        return rejection;
    }

    Json(ApiResourceList::for_solvers(
        &state.group_name,
        [state.solver.name()],
    ))
    .into_response()
}

async fn solve<S: Solver>(
    State(state): State<Arc<WebhookState<S>>>,
    Path((group, version, resource)): Path<(String, String, String)>,
    body: Bytes,
) -> Response {
    if let Some(rejection) = state.reject_foreign_path(&group, &version) {
        return rejection;
    }

    if resource != state.solver.name() {
        return status_response(
            StatusCode::NOT_FOUND,
            StatusReason::NotFound,
            format!("no solver registered under the name \"{}\"", resource),
        );
    }

    let payload: ChallengePayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            return status_response(
                StatusCode::BAD_REQUEST,
                StatusReason::BadRequest,
                format!("invalid ChallengePayload: {}", e),
            );
        }
    };

    let Some(request) = payload.request else {
        return status_response(
            StatusCode::BAD_REQUEST,
            StatusReason::BadRequest,
            "ChallengePayload has no request",
        );
    };

    tracing::debug!(
        uid = %request.uid,
        action = %request.action,
        namespace = %request.resource_namespace,
        fqdn = %request.resolved_fqdn,
        "Received challenge"
    );

    let response = dispatch(state.solver.as_ref(), &request).await;
    (
        StatusCode::CREATED,
        Json(ChallengePayload::for_response(response)),
    )
        .into_response()
}

async fn wait_for_stop(mut stop: StopSignal) {
    // A dropped sender also counts as a stop request.
    let _ = stop.wait_for(|stopping| *stopping).await;
}

/// Webhook API listener
pub struct WebhookServer {
    addr: SocketAddr,
    router: Router,
    tls: Option<Arc<rustls::ServerConfig>>,
    require_client_certificates: bool,
}

impl WebhookServer {
    pub fn new(addr: SocketAddr, router: Router) -> Self {
        Self {
            addr,
            router,
            tls: None,
            require_client_certificates: false,
        }
    }

    pub fn with_tls(mut self, config: rustls::ServerConfig) -> Self {
        self.tls = Some(Arc::new(config));
        self
    }

    /// Reject `/apis` requests on TLS connections without a verified client
    /// certificate. The TLS config must carry a client verifier.
    pub fn require_client_certificates(mut self) -> Self {
        self.require_client_certificates = true;
        self
    }

    /// Bind the configured address and serve until `stop` fires.
    pub async fn run(self, stop: StopSignal) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.addr,
                source,
            })?;
        self.serve(listener, stop).await
    }

    /// Serve on an already bound listener until `stop` fires.
    pub async fn serve(self, listener: TcpListener, stop: StopSignal) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;

        match self.tls {
            Some(tls) => {
                tracing::info!("Webhook listening on https://{}", local_addr);
                let acceptor = TlsAcceptor::from(tls);
                serve_tls(
                    listener,
                    self.router,
                    acceptor,
                    self.require_client_certificates,
                    stop,
                )
                .await
            }
            None => {
                tracing::warn!(
                    "Webhook listening on http://{} without TLS; the Kubernetes API aggregator requires HTTPS",
                    local_addr
                );
                axum::serve(listener, self.router)
                    .with_graceful_shutdown(wait_for_stop(stop))
                    .await?;
                Ok(())
            }
        }
    }
}

async fn serve_tls(
    listener: TcpListener,
    router: Router,
    acceptor: TlsAcceptor,
    require_client_certificates: bool,
    stop: StopSignal,
) -> Result<(), ServerError> {
    let shutdown = wait_for_stop(stop);
    tokio::pin!(shutdown);
    let graceful = GracefulShutdown::new();

    loop {
        let (stream, peer) = tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::error!("Accept error: {}", e);
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    continue;
                }
            },
        };

        let acceptor = acceptor.clone();
        let router = router.clone();
        let watcher = graceful.watcher();
        tokio::spawn(async move {
            let stream = match acceptor.accept(stream).await {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::debug!(%peer, "TLS handshake failed: {}", e);
                    return;
                }
            };

            let app = if require_client_certificates {
                let verified = stream.get_ref().1.peer_certificates().is_some();
                router.layer(Extension(ClientCertificate { verified }))
            } else {
                router
            };

            let builder = auto::Builder::new(TokioExecutor::new());
            let conn =
                builder.serve_connection(TokioIo::new(stream), TowerToHyperService::new(app));
            if let Err(e) = watcher.watch(conn.into_owned()).await {
                tracing::debug!(%peer, "Connection error: {}", e);
            }
        });
    }

    drop(listener);
    tracing::info!("Webhook server shutting down, draining connections");
    tokio::select! {
        _ = graceful.shutdown() => {
            tracing::info!("All connections closed");
        }
        _ = tokio::time::sleep(SHUTDOWN_GRACE_PERIOD) => {
            tracing::warn!(
                "Connections still open after {:?}, shutting down anyway",
                SHUTDOWN_GRACE_PERIOD
            );
        }
    }
    Ok(())
}
