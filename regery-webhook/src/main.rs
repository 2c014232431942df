use clap::Parser;
use regery_webhook::config::{Args, RuntimeConfig, init_tracing};
use regery_webhook::webhook::{WebhookServer, load_server_config, router};
use regery_webhook::{RegerySolver, Solver, StopSignal, install_rustls_crypto_provider};
use std::sync::Arc;
use tokio::sync::watch;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    install_rustls_crypto_provider();

    let args = Args::parse();
    init_tracing(args.log_format);

    let config = match RuntimeConfig::from_args(args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            return Err(e.into());
        }
    };

    tracing::info!("Regery webhook v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Group name: {}", config.group_name);
    tracing::info!("Listening on: {}", config.listen);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(config))
}

async fn run(config: RuntimeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    });

    let kube_config = kube::Config::infer().await?;

    let mut solver = RegerySolver::new();
    solver.initialize(kube_config, stop_rx.clone()).await?;
    tracing::info!(solver = solver.name(), "Solver initialized");

    let app = router(config.group_name.clone(), Arc::new(solver));
    let mut server = WebhookServer::new(config.listen, app);
    match &config.tls {
        Some(tls) => {
            let client_ca = tls.client_ca.as_deref();
            server = server.with_tls(load_server_config(&tls.cert, &tls.key, client_ca)?);
            if client_ca.is_some() {
                server = server.require_client_certificates();
            } else {
                tracing::warn!(
                    "No requestheader client CA configured, solve requests are not authenticated"
                );
            }
        }
        None => tracing::warn!("No serving certificate configured, serving plain HTTP"),
    }

    run_until_stopped(server, stop_rx).await
}

async fn run_until_stopped(
    server: WebhookServer,
    stop: StopSignal,
) -> Result<(), Box<dyn std::error::Error>> {
    server.run(stop).await?;
    tracing::info!("Webhook server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}
