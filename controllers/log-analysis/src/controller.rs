//! Main controller implementation.
//!
//! Wires the Kubernetes client, the diagnosis client and the reconciler
//! together and runs the LogAnalysisRequest watcher.

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::logs::PodLogSource;
use crate::reconciler::{Reconciler, SystemClock};
use crate::store::KubeRequestStore;
use crate::watcher::{WatchContext, Watcher};
use crds::LogAnalysisRequest;
use diagnosis_client::DiagnosisClient;
use kube::{Api, Client};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Main controller for LogAnalysisRequest resources.
pub struct Controller {
    log_analysis_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance and starts its watcher.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing Log Analysis Controller");

        let kube_client = Client::try_default()
            .await
            .map_err(|e| ControllerError::Kube(e.into()))?;

        let diagnosis_client = DiagnosisClient::new(config.diagnosis.clone())?;
        if !diagnosis_client.has_credential() {
            warn!("OPENAI_API_KEY is not set; every analysis will fail until it is provided");
        }

        let reconciler = Arc::new(Reconciler::new(
            Arc::new(KubeRequestStore::new(kube_client.clone())),
            Arc::new(PodLogSource::new(kube_client.clone(), config.log_max_bytes)),
            Arc::new(diagnosis_client),
            Arc::new(SystemClock),
            config.reconcile_timeout,
        ));

        let api: Api<LogAnalysisRequest> = match &config.watch_namespace {
            Some(ns) => Api::namespaced(kube_client, ns),
            None => Api::all(kube_client),
        };

        let watcher = Watcher::new(
            api,
            Arc::new(WatchContext::new(reconciler, config.error_requeue)),
            config.concurrency,
            config.debounce,
        );
        let log_analysis_watcher = tokio::spawn(watcher.watch_log_analysis_requests());

        Ok(Self {
            log_analysis_watcher,
        })
    }

    /// Runs the controller until shutdown.
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("Log Analysis Controller running");

        self.log_analysis_watcher
            .await
            .map_err(|e| {
                ControllerError::Watch(format!("LogAnalysisRequest watcher panicked: {}", e))
            })?
            .map_err(|e| ControllerError::Watch(format!("LogAnalysisRequest watcher error: {}", e)))?;

        info!("Log Analysis Controller stopped");
        Ok(())
    }
}
