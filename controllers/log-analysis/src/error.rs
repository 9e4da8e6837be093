//! Controller-specific error types.
//!
//! `ReconcileError` is what a single reconciliation surfaces to kube-runtime;
//! every variant is retried with a requeue. `ControllerError` covers startup
//! and the watch loop.

use diagnosis_client::DiagnosisError;
use kube::Error as KubeError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while starting or running the controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Diagnosis client could not be built
    #[error("Diagnosis client error: {0}")]
    Diagnosis(#[from] DiagnosisError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

/// Errors from the resource store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Object no longer exists
    #[error("Not found: {0}")]
    NotFound(String),

    /// Write was rejected because the object changed since it was read
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Object is missing metadata required for the write
    #[error("Invalid object: {0}")]
    InvalidObject(String),

    /// Any other Kubernetes API failure
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),
}

/// Errors from the log source.
#[derive(Debug, Error)]
pub enum LogSourceError {
    /// Target pod does not exist
    #[error("Target not found: {0}")]
    NotFound(String),

    /// Log request rejected by the API server (permissions, container not ready, ...)
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Log stream broke while being drained
    #[error("Log stream error: {0}")]
    Stream(#[from] std::io::Error),

    /// Deadline elapsed before the stream was fully drained
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors surfaced by a single reconciliation.
///
/// A deleted resource is not an error; it is reported as
/// [`crate::reconciler::ReconcileOutcome::Deleted`].
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Loading the resource failed for a reason other than not-found
    #[error("Failed to fetch LogAnalysisRequest {key}: {source}")]
    Fetch {
        /// namespace/name
        key: String,
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// Spec cannot be acted on
    #[error("Invalid LogAnalysisRequest {key}: {reason}")]
    InvalidRequest {
        /// namespace/name
        key: String,
        /// What is wrong with the spec
        reason: String,
    },

    /// Logs for the target could not be retrieved
    #[error("Target {target} unavailable: {source}")]
    TargetUnavailable {
        /// namespace/name of the target pod
        target: String,
        /// Underlying log source error
        #[source]
        source: LogSourceError,
    },

    /// Diagnosis service failed or is not configured
    #[error("Diagnosis unavailable: {0}")]
    DiagnosisUnavailable(#[source] DiagnosisError),

    /// Status write conflicted again after a re-fetch
    #[error("Status update for {0} conflicted after retry")]
    PersistenceConflict(String),

    /// Status write failed for a reason other than a conflict
    #[error("Failed to persist status for {key}: {source}")]
    PersistenceFailure {
        /// namespace/name
        key: String,
        /// Underlying store error
        #[source]
        source: StoreError,
    },
}
