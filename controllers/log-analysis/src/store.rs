//! LogAnalysisRequest store.
//!
//! Wraps the Kubernetes API behind a small trait so the reconciler can be
//! unit tested against an in-memory store.

use crate::error::StoreError;
use crds::LogAnalysisRequest;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use serde_json::json;
use tracing::debug;

/// Read and status-write access to `LogAnalysisRequest` objects.
#[async_trait::async_trait]
pub trait RequestStore: Send + Sync {
    /// Load a request. `Ok(None)` means it does not exist.
    async fn get(&self, namespace: &str, name: &str)
        -> Result<Option<LogAnalysisRequest>, StoreError>;

    /// Write `request.status` to the status subresource.
    ///
    /// The write is conditional on `request.metadata.resourceVersion`; if the
    /// stored object has moved on, [`StoreError::Conflict`] is returned.
    async fn update_status(
        &self,
        request: &LogAnalysisRequest,
    ) -> Result<LogAnalysisRequest, StoreError>;
}

/// [`RequestStore`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeRequestStore {
    client: Client,
}

impl KubeRequestStore {
    /// Creates a new store instance.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<LogAnalysisRequest> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Build the merge patch for a status write.
///
/// Carrying `metadata.resourceVersion` in the patch makes the API server
/// reject it with 409 if the object changed since it was read.
pub fn status_patch(request: &LogAnalysisRequest) -> Result<serde_json::Value, StoreError> {
    let resource_version = request.metadata.resource_version.as_deref().ok_or_else(|| {
        StoreError::InvalidObject("LogAnalysisRequest missing resourceVersion".to_string())
    })?;

    Ok(json!({
        "metadata": { "resourceVersion": resource_version },
        "status": request.status,
    }))
}

fn map_kube_error(e: kube::Error, key: &str) -> StoreError {
    if let kube::Error::Api(err) = &e {
        match err.code {
            404 => return StoreError::NotFound(key.to_string()),
            409 => return StoreError::Conflict(key.to_string()),
            _ => {}
        }
    }
    StoreError::Kube(e)
}

#[async_trait::async_trait]
impl RequestStore for KubeRequestStore {
    async fn get(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<LogAnalysisRequest>, StoreError> {
        self.api(namespace)
            .get_opt(name)
            .await
            .map_err(|e| map_kube_error(e, &format!("{namespace}/{name}")))
    }

    async fn update_status(
        &self,
        request: &LogAnalysisRequest,
    ) -> Result<LogAnalysisRequest, StoreError> {
        let name = request.metadata.name.as_deref().ok_or_else(|| {
            StoreError::InvalidObject("LogAnalysisRequest missing name".to_string())
        })?;
        let namespace = request.metadata.namespace.as_deref().ok_or_else(|| {
            StoreError::InvalidObject("LogAnalysisRequest missing namespace".to_string())
        })?;

        let patch = status_patch(request)?;
        debug!(%namespace, %name, "Patching LogAnalysisRequest status");

        self.api(namespace)
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| map_kube_error(e, &format!("{namespace}/{name}")))
    }
}
