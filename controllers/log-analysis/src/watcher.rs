//! Kubernetes resource watcher.
//!
//! Drives reconciliation of LogAnalysisRequest resources through
//! kube_runtime::Controller, which handles reconnection, deduplication of
//! queued objects and requeueing after errors.

use crate::error::{ControllerError, ReconcileError};
use crate::reconciler::{ReconcileOutcome, Reconciler};
use crds::LogAnalysisRequest;
use futures::StreamExt;
use kube::{Api, ResourceExt};
use kube_runtime::{
    Controller,
    controller::{Action, Config as ControllerConfig},
    watcher,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Shared state handed to every reconciliation.
pub struct WatchContext {
    reconciler: Arc<Reconciler>,
    error_requeue: Duration,
}

impl WatchContext {
    /// Creates a new context.
    pub fn new(reconciler: Arc<Reconciler>, error_requeue: Duration) -> Self {
        Self {
            reconciler,
            error_requeue,
        }
    }
}

/// Whether `request` still needs a diagnosis for its current generation.
///
/// Status writes do not bump `metadata.generation`, so the events caused by
/// our own writes are skipped here instead of buying a second diagnosis.
pub fn needs_analysis(request: &LogAnalysisRequest) -> bool {
    let observed = request.status.as_ref().and_then(|s| s.observed_generation);
    match (request.metadata.generation, observed) {
        (Some(generation), Some(observed)) => generation != observed,
        _ => true,
    }
}

async fn reconcile(
    request: Arc<LogAnalysisRequest>,
    ctx: Arc<WatchContext>,
) -> Result<Action, ReconcileError> {
    let name = request.name_any();
    let Some(namespace) = request.namespace() else {
        warn!("LogAnalysisRequest {} has no namespace, ignoring", name);
        return Ok(Action::await_change());
    };

    if !needs_analysis(&request) {
        debug!(%namespace, %name, "Generation already analysed, skipping");
        return Ok(Action::await_change());
    }

    match ctx.reconciler.reconcile(&namespace, &name).await? {
        ReconcileOutcome::Completed(_) => {}
        ReconcileOutcome::Deleted => debug!(%namespace, %name, "Request deleted during reconcile"),
    }
    Ok(Action::await_change())
}

fn error_policy(
    request: Arc<LogAnalysisRequest>,
    error: &ReconcileError,
    ctx: Arc<WatchContext>,
) -> Action {
    let namespace = request.namespace().unwrap_or_default();
    error!(
        %namespace,
        name = %request.name_any(),
        "Reconciliation failed: {}",
        error
    );
    Action::requeue(ctx.error_requeue)
}

/// Watches LogAnalysisRequest resources for changes.
pub struct Watcher {
    api: Api<LogAnalysisRequest>,
    context: Arc<WatchContext>,
    concurrency: u16,
    debounce: Duration,
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(
        api: Api<LogAnalysisRequest>,
        context: Arc<WatchContext>,
        concurrency: u16,
        debounce: Duration,
    ) -> Self {
        Self {
            api,
            context,
            concurrency,
            debounce,
        }
    }

    /// Watches LogAnalysisRequest resources until the stream ends or a
    /// shutdown signal arrives.
    pub async fn watch_log_analysis_requests(self) -> Result<(), ControllerError> {
        info!(
            concurrency = self.concurrency,
            debounce_secs = self.debounce.as_secs(),
            "Starting LogAnalysisRequest watcher"
        );

        let controller_config = ControllerConfig::default()
            .debounce(self.debounce)
            .concurrency(self.concurrency);

        Controller::new(self.api, watcher::Config::default())
            .with_config(controller_config)
            .shutdown_on_signal()
            .run(reconcile, error_policy, self.context)
            .for_each(|res| async move {
                match res {
                    Ok((obj, _)) => debug!("Reconciled LogAnalysisRequest {}", obj),
                    Err(e) => error!("Controller error for LogAnalysisRequest: {}", e),
                }
            })
            .await;

        info!("LogAnalysisRequest watcher stopped");
        Ok(())
    }
}
