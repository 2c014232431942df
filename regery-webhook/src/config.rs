//! Process configuration
//!
//! Read once at startup from flags and environment. Nothing here is
//! re-read while serving.

use crate::defaults::{DEFAULT_BIND_ADDRESS, DEFAULT_SECURE_PORT};
use clap::{Parser, ValueEnum};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GROUP_NAME must be specified")]
    MissingGroupName,

    #[error("Invalid bind address '{0}'")]
    InvalidBindAddress(String),

    #[error("--tls-cert-file and --tls-private-key-file must be set together")]
    IncompleteTls,

    #[error("--requestheader-client-ca-file requires --tls-cert-file and --tls-private-key-file")]
    ClientCaWithoutTls,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Regery webhook - cert-manager DNS-01 solver for the Regery DNS API
#[derive(Debug, Parser)]
#[command(name = "regery-webhook")]
#[command(version)]
#[command(about = "cert-manager DNS-01 webhook for the Regery DNS API")]
pub struct Args {
    /// API group the webhook is registered under
    #[arg(long, env = "GROUP_NAME")]
    pub group_name: Option<String>,

    /// HTTPS port
    #[arg(long, env = "SECURE_PORT", default_value_t = DEFAULT_SECURE_PORT)]
    pub secure_port: u16,

    /// Address to listen on
    #[arg(long, default_value = DEFAULT_BIND_ADDRESS)]
    pub bind_address: String,

    /// PEM certificate chain for serving
    #[arg(long)]
    pub tls_cert_file: Option<PathBuf>,

    /// PEM private key for serving
    #[arg(long)]
    pub tls_private_key_file: Option<PathBuf>,

    /// CA bundle that signs the API aggregator's client certificate
    #[arg(long, env = "REQUESTHEADER_CLIENT_CA_FILE")]
    pub requestheader_client_ca_file: Option<PathBuf>,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Serving certificate and key paths, plus the optional client CA
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFiles {
    pub cert: PathBuf,
    pub key: PathBuf,
    pub client_ca: Option<PathBuf>,
}

/// Validated startup configuration
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub group_name: String,
    pub listen: SocketAddr,
    pub tls: Option<TlsFiles>,
    pub log_format: LogFormat,
}

impl RuntimeConfig {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let group_name = args
            .group_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or(ConfigError::MissingGroupName)?;

        let ip: IpAddr = args
            .bind_address
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddress(args.bind_address.clone()))?;

        let client_ca = args.requestheader_client_ca_file;
        let tls = match (args.tls_cert_file, args.tls_private_key_file) {
            (Some(cert), Some(key)) => Some(TlsFiles {
                cert,
                key,
                client_ca,
            }),
            (None, None) if client_ca.is_some() => return Err(ConfigError::ClientCaWithoutTls),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteTls),
        };

        Ok(Self {
            group_name,
            listen: SocketAddr::new(ip, args.secure_port),
            tls,
            log_format: args.log_format,
        })
    }
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
