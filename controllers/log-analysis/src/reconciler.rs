//! Reconciliation logic for LogAnalysisRequest CRDs.
//!
//! Each call re-derives everything from the current state of the resource:
//! fetch, resolve the target, drain its logs, ask for a diagnosis, write
//! the status. Nothing is remembered between calls except what ends up in
//! the status subresource, so duplicate or reordered triggers are harmless.
//!
//! Status is only ever written after both external calls succeed. A failed
//! log fetch or diagnosis leaves the previous verdict untouched.

use crate::error::{LogSourceError, ReconcileError, StoreError};
use crate::logs::LogSource;
use crate::store::RequestStore;
use chrono::{DateTime, Utc};
use crds::{LogAnalysisRequest, LogAnalysisRequestStatus};
use diagnosis_client::{DiagnosisClientTrait, DiagnosisError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

/// Token whose presence in a diagnosis marks the request as resolved.
const RESOLVED_TOKEN: &str = "resolved";

/// Source of wall-clock time for status timestamps.
pub trait Clock: Send + Sync {
    /// Current time
    fn now(&self) -> DateTime<Utc>;
}

/// [`Clock`] reading the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Result of a reconciliation that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Status was written
    Completed(LogAnalysisRequestStatus),
    /// Resource was gone; nothing was written
    Deleted,
}

/// `true` iff the diagnosis mentions "resolved", ignoring case.
///
/// This is a plain substring test: "not resolved" and "unresolved" count too.
pub fn is_resolved(diagnosis: &str) -> bool {
    diagnosis.to_lowercase().contains(RESOLVED_TOKEN)
}

/// Timestamp for a new status write; never earlier than or equal to `previous`.
pub fn next_timestamp(previous: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    match previous {
        Some(prev) if now <= prev => prev + chrono::Duration::microseconds(1),
        _ => now,
    }
}

/// Status produced by a successful diagnosis.
pub fn derive_status(
    diagnosis: String,
    previous: Option<&LogAnalysisRequestStatus>,
    generation: Option<i64>,
    now: DateTime<Utc>,
) -> LogAnalysisRequestStatus {
    LogAnalysisRequestStatus {
        resolved: is_resolved(&diagnosis),
        diagnosis: Some(diagnosis),
        timestamp: Some(next_timestamp(previous.and_then(|s| s.timestamp), now)),
        observed_generation: generation,
    }
}

/// Reconciles LogAnalysisRequest resources.
pub struct Reconciler {
    store: Arc<dyn RequestStore>,
    logs: Arc<dyn LogSource>,
    diagnosis: Arc<dyn DiagnosisClientTrait>,
    clock: Arc<dyn Clock>,
    deadline: Duration,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    ///
    /// `deadline` bounds the log drain and the diagnosis call of a single
    /// reconciliation together.
    pub fn new(
        store: Arc<dyn RequestStore>,
        logs: Arc<dyn LogSource>,
        diagnosis: Arc<dyn DiagnosisClientTrait>,
        clock: Arc<dyn Clock>,
        deadline: Duration,
    ) -> Self {
        Self {
            store,
            logs,
            diagnosis,
            clock,
            deadline,
        }
    }

    /// Reconciles the LogAnalysisRequest `namespace/name`.
    ///
    /// This method:
    /// 1. Fetches the resource (absent means deleted: return cleanly)
    /// 2. Resolves the target namespace
    /// 3. Drains the target pod's logs
    /// 4. Asks the diagnosis service for a verdict
    /// 5. Derives the resolved flag
    /// 6. Writes the status, retrying once on a write conflict
    ///
    /// No backoff happens here; errors are returned for kube-runtime to requeue.
    pub async fn reconcile(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let key = format!("{namespace}/{name}");
        let deadline = Instant::now() + self.deadline;

        let request = match self.store.get(namespace, name).await {
            Ok(Some(request)) => request,
            Ok(None) => {
                debug!("LogAnalysisRequest {} no longer exists, skipping", key);
                return Ok(ReconcileOutcome::Deleted);
            }
            Err(source) => return Err(ReconcileError::Fetch { key, source }),
        };

        info!("Reconciling LogAnalysisRequest {}", key);

        let target = &request.spec.target_ref;
        if target.name.is_empty() {
            return Err(ReconcileError::InvalidRequest {
                key,
                reason: "spec.targetRef.name is empty".to_string(),
            });
        }
        if !target.kind().eq_ignore_ascii_case("pod") {
            return Err(ReconcileError::InvalidRequest {
                key,
                reason: format!("unsupported target kind {}", target.kind()),
            });
        }
        let target_namespace = target.resolve_namespace(namespace);
        let target_key = format!("{}/{}", target_namespace, target.name);

        let logs = match timeout_at(
            deadline,
            self.logs
                .fetch(target_namespace, &target.name, request.spec.tail_lines()),
        )
        .await
        {
            Ok(Ok(logs)) => logs,
            Ok(Err(source)) => {
                warn!("Failed to fetch logs for {}: {}", target_key, source);
                return Err(ReconcileError::TargetUnavailable {
                    target: target_key,
                    source,
                });
            }
            Err(_) => {
                warn!("Timed out fetching logs for {}", target_key);
                return Err(ReconcileError::TargetUnavailable {
                    target: target_key,
                    source: LogSourceError::Timeout(self.deadline),
                });
            }
        };
        debug!(
            target = %target_key,
            bytes = logs.text.len(),
            truncated = logs.truncated,
            "Fetched target logs"
        );

        let diagnosis = match timeout_at(deadline, self.diagnosis.diagnose(&logs.text)).await {
            Ok(Ok(diagnosis)) => diagnosis,
            Ok(Err(e)) => {
                warn!("Diagnosis for {} failed: {}", key, e);
                return Err(ReconcileError::DiagnosisUnavailable(e));
            }
            Err(_) => {
                warn!("Diagnosis for {} timed out", key);
                return Err(ReconcileError::DiagnosisUnavailable(DiagnosisError::Timeout(
                    self.deadline,
                )));
            }
        };

        let status = derive_status(
            diagnosis,
            request.status.as_ref(),
            request.metadata.generation,
            self.clock.now(),
        );

        let outcome = self.persist_status(namespace, name, request, status).await?;
        if let ReconcileOutcome::Completed(status) = &outcome {
            info!(
                resolved = status.resolved,
                model = self.diagnosis.model(),
                "Log analysis complete for {}",
                key
            );
        }
        Ok(outcome)
    }

    /// Writes `status` onto the fetched copy of the resource.
    ///
    /// On a conflict the resource is re-fetched and the write retried once.
    async fn persist_status(
        &self,
        namespace: &str,
        name: &str,
        mut request: LogAnalysisRequest,
        status: LogAnalysisRequestStatus,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let key = format!("{namespace}/{name}");
        request.status = Some(status.clone());

        match self.store.update_status(&request).await {
            Ok(_) => return Ok(ReconcileOutcome::Completed(status)),
            Err(StoreError::NotFound(_)) => {
                debug!("LogAnalysisRequest {} deleted before status write", key);
                return Ok(ReconcileOutcome::Deleted);
            }
            Err(StoreError::Conflict(_)) => {
                warn!("Status update for {} conflicted, retrying against fresh copy", key);
            }
            Err(source) => {
                return Err(ReconcileError::PersistenceFailure {
                    key: key.clone(),
                    source,
                });
            }
        }

        let mut fresh = match self.store.get(namespace, name).await {
            Ok(Some(fresh)) => fresh,
            Ok(None) => return Ok(ReconcileOutcome::Deleted),
            Err(source) => {
                return Err(ReconcileError::PersistenceFailure {
                    key: key.clone(),
                    source,
                });
            }
        };

        let status = LogAnalysisRequestStatus {
            timestamp: Some(next_timestamp(
                fresh.status.as_ref().and_then(|s| s.timestamp),
                self.clock.now(),
            )),
            ..status
        };
        fresh.status = Some(status.clone());

        match self.store.update_status(&fresh).await {
            Ok(_) => Ok(ReconcileOutcome::Completed(status)),
            Err(StoreError::NotFound(_)) => Ok(ReconcileOutcome::Deleted),
            Err(StoreError::Conflict(_)) => Err(ReconcileError::PersistenceConflict(key)),
            Err(source) => Err(ReconcileError::PersistenceFailure {
                key: key.clone(),
                source,
            }),
        }
    }
}
