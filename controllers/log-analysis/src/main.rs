//! Log Analysis Controller
//!
//! Watches LogAnalysisRequest resources, reads the logs of the pod each one
//! points at, asks a chat-completion service for a diagnosis and records the
//! verdict in the request's status.

mod config;
mod controller;
mod error;
mod logs;
mod reconciler;
mod store;
mod watcher;

#[cfg(test)]
mod test_utils;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // kube and reqwest both pull in rustls; pick the provider explicitly.
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("rustls crypto provider already installed");
    }

    info!("Starting Log Analysis Controller");

    let config = ControllerConfig::from_env()?;

    info!("Configuration:");
    info!("  Diagnosis endpoint: {}", config.diagnosis.endpoint);
    info!("  Diagnosis model: {}", config.diagnosis.model);
    info!(
        "  API key: {}",
        if config.diagnosis.api_key.is_some() { "set" } else { "not set" }
    );
    info!(
        "  Namespace: {}",
        config.watch_namespace.as_deref().unwrap_or("all namespaces")
    );
    info!("  Log byte bound: {}", config.log_max_bytes);
    info!("  Reconcile timeout: {:?}", config.reconcile_timeout);
    info!("  Error requeue: {:?}", config.error_requeue);
    info!("  Concurrency: {}", config.concurrency);

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
