//! Test utilities for unit testing the reconciler
//!
//! In-memory stand-ins for the resource store, the log source and the clock.

use crate::error::{LogSourceError, StoreError};
use crate::logs::{FetchedLogs, LogSource};
use crate::reconciler::Clock;
use crate::store::RequestStore;
use chrono::{DateTime, Utc};
use crds::{LogAnalysisRequest, LogAnalysisRequestSpec, LogAnalysisRequestStatus, TargetRef};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Helper to create a test LogAnalysisRequest
pub fn create_test_request(
    namespace: &str,
    name: &str,
    target: &str,
    target_namespace: Option<&str>,
    tail_lines: Option<i64>,
) -> LogAnalysisRequest {
    LogAnalysisRequest {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            generation: Some(1),
            resource_version: Some("1".to_string()),
            ..Default::default()
        },
        spec: LogAnalysisRequestSpec {
            target_ref: TargetRef {
                name: target.to_string(),
                namespace: target_namespace.map(str::to_string),
                kind: None,
            },
            tail_lines,
        },
        status: None,
    }
}

/// A transport-level Kubernetes failure
pub fn kube_unavailable() -> kube::Error {
    kube::Error::Service(Box::new(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        "connection refused",
    )))
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Default)]
struct StoreState {
    objects: HashMap<(String, String), LogAnalysisRequest>,
    next_version: u64,
    get_failures: usize,
    update_failures: usize,
    concurrent_writes: usize,
    delete_on_update: bool,
    status_writes: usize,
}

/// In-memory [`RequestStore`] with resourceVersion conflict detection.
#[derive(Clone, Default)]
pub struct FakeStore {
    state: Arc<Mutex<StoreState>>,
}

impl FakeStore {
    /// Store seeded with `requests`
    pub fn with(requests: Vec<LogAnalysisRequest>) -> Self {
        let store = Self::default();
        {
            let mut state = lock(&store.state);
            state.next_version = 100;
            for request in requests {
                let key = (
                    request.metadata.namespace.clone().unwrap_or_default(),
                    request.metadata.name.clone().unwrap_or_default(),
                );
                state.objects.insert(key, request);
            }
        }
        store
    }

    /// Current copy of `namespace/name`
    pub fn object(&self, namespace: &str, name: &str) -> Option<LogAnalysisRequest> {
        lock(&self.state)
            .objects
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Current status of `namespace/name`
    pub fn status(&self, namespace: &str, name: &str) -> Option<LogAnalysisRequestStatus> {
        self.object(namespace, name).and_then(|o| o.status)
    }

    /// Fail the next `n` gets with a transport error
    pub fn fail_gets(&self, n: usize) {
        lock(&self.state).get_failures = n;
    }

    /// Fail the next `n` status writes with a transport error
    pub fn fail_updates(&self, n: usize) {
        lock(&self.state).update_failures = n;
    }

    /// Simulate another writer bumping the resourceVersion before each of the next `n` writes
    pub fn race_updates(&self, n: usize) {
        lock(&self.state).concurrent_writes = n;
    }

    /// Delete the object when the next status write arrives
    pub fn delete_on_update(&self) {
        lock(&self.state).delete_on_update = true;
    }

    /// Number of accepted status writes
    pub fn status_writes(&self) -> usize {
        lock(&self.state).status_writes
    }
}

#[async_trait::async_trait]
impl RequestStore for FakeStore {
    async fn get(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<LogAnalysisRequest>, StoreError> {
        let mut state = lock(&self.state);
        if state.get_failures > 0 {
            state.get_failures -= 1;
            return Err(StoreError::Kube(kube_unavailable()));
        }
        Ok(state
            .objects
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn update_status(
        &self,
        request: &LogAnalysisRequest,
    ) -> Result<LogAnalysisRequest, StoreError> {
        let mut state = lock(&self.state);
        let key = (
            request.metadata.namespace.clone().unwrap_or_default(),
            request.metadata.name.clone().unwrap_or_default(),
        );
        let display = format!("{}/{}", key.0, key.1);

        if state.update_failures > 0 {
            state.update_failures -= 1;
            return Err(StoreError::Kube(kube_unavailable()));
        }
        if state.delete_on_update {
            state.delete_on_update = false;
            state.objects.remove(&key);
        }
        if state.concurrent_writes > 0 {
            state.concurrent_writes -= 1;
            state.next_version += 1;
            let version = state.next_version.to_string();
            if let Some(stored) = state.objects.get_mut(&key) {
                stored.metadata.resource_version = Some(version);
            }
        }

        state.next_version += 1;
        let version = state.next_version.to_string();
        let Some(stored) = state.objects.get_mut(&key) else {
            return Err(StoreError::NotFound(display));
        };
        if stored.metadata.resource_version != request.metadata.resource_version {
            return Err(StoreError::Conflict(display));
        }
        stored.status = request.status.clone();
        stored.metadata.resource_version = Some(version);
        let updated = stored.clone();
        state.status_writes += 1;
        Ok(updated)
    }
}

/// Scripted reply for [`FakeLogSource`]
pub enum LogReply {
    /// Return this text
    Text(String),
    /// Target does not exist
    NotFound,
    /// Stream broke mid-read
    StreamError,
    /// Never answer within the deadline
    Hang,
}

/// In-memory [`LogSource`]
#[derive(Clone, Default)]
pub struct FakeLogSource {
    replies: Arc<Mutex<HashMap<(String, String), VecDeque<LogReply>>>>,
    calls: Arc<Mutex<Vec<(String, String, Option<i64>)>>>,
}

impl FakeLogSource {
    /// Queue a reply for pod `namespace/name`
    pub fn reply(&self, namespace: &str, name: &str, reply: LogReply) -> &Self {
        lock(&self.replies)
            .entry((namespace.to_string(), name.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    /// Calls made so far: (namespace, pod, tail_lines)
    pub fn calls(&self) -> Vec<(String, String, Option<i64>)> {
        lock(&self.calls).clone()
    }
}

#[async_trait::async_trait]
impl LogSource for FakeLogSource {
    async fn fetch(
        &self,
        namespace: &str,
        name: &str,
        tail_lines: Option<i64>,
    ) -> Result<FetchedLogs, LogSourceError> {
        lock(&self.calls).push((namespace.to_string(), name.to_string(), tail_lines));
        let reply = lock(&self.replies)
            .get_mut(&(namespace.to_string(), name.to_string()))
            .and_then(VecDeque::pop_front)
            .unwrap_or(LogReply::NotFound);

        match reply {
            LogReply::Text(text) => Ok(FetchedLogs {
                text,
                truncated: false,
            }),
            LogReply::NotFound => Err(LogSourceError::NotFound(format!("pod {namespace}/{name}"))),
            LogReply::StreamError => Err(LogSourceError::Stream(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "stream closed early",
            ))),
            LogReply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(FetchedLogs {
                    text: String::new(),
                    truncated: false,
                })
            }
        }
    }
}

/// [`Clock`] that always reports the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
