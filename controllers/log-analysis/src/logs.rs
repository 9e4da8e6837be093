//! Pod log retrieval.
//!
//! Turns (namespace, pod, tail bound) into a fully materialised string. The
//! stream is drained up to a byte bound; anything past the bound is dropped
//! and the analysis proceeds on what was read.

use crate::error::LogSourceError;
use futures::io::{AsyncRead, AsyncReadExt};
use k8s_openapi::api::core::v1::Pod;
use kube::api::LogParams;
use kube::{Api, Client};
use tracing::{debug, warn};

/// Default bound on bytes read from a single log stream (1 MiB)
pub const DEFAULT_MAX_LOG_BYTES: usize = 1024 * 1024;

/// Logs read from a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedLogs {
    /// Log text (lossily decoded as UTF-8)
    pub text: String,
    /// Whether the byte bound cut the stream short
    pub truncated: bool,
}

/// Source of historical pod logs.
#[async_trait::async_trait]
pub trait LogSource: Send + Sync {
    /// Fetch and fully drain the logs of pod `name` in `namespace`.
    ///
    /// Dropping the returned future releases the underlying stream.
    async fn fetch(
        &self,
        namespace: &str,
        name: &str,
        tail_lines: Option<i64>,
    ) -> Result<FetchedLogs, LogSourceError>;
}

/// [`LogSource`] reading from the pod log subresource.
#[derive(Clone)]
pub struct PodLogSource {
    client: Client,
    max_bytes: usize,
}

impl PodLogSource {
    /// Creates a new log source reading at most `max_bytes` per fetch.
    pub fn new(client: Client, max_bytes: usize) -> Self {
        Self { client, max_bytes }
    }

    fn log_params(&self, tail_lines: Option<i64>) -> LogParams {
        LogParams {
            tail_lines,
            limit_bytes: Some(server_limit_bytes(self.max_bytes)),
            ..Default::default()
        }
    }
}

/// `limitBytes` sent to the API server: one byte past the client bound, so
/// [`drain_bounded`] can still tell that the stream was cut.
pub fn server_limit_bytes(max_bytes: usize) -> i64 {
    i64::try_from(max_bytes).unwrap_or(i64::MAX).saturating_add(1)
}

/// Classify a failed log request; 404 means the target pod is gone.
pub fn map_log_error(e: kube::Error, namespace: &str, name: &str) -> LogSourceError {
    if let kube::Error::Api(err) = &e {
        if err.code == 404 {
            return LogSourceError::NotFound(format!("pod {namespace}/{name}"));
        }
    }
    LogSourceError::Kube(e)
}

#[async_trait::async_trait]
impl LogSource for PodLogSource {
    async fn fetch(
        &self,
        namespace: &str,
        name: &str,
        tail_lines: Option<i64>,
    ) -> Result<FetchedLogs, LogSourceError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        debug!(%namespace, pod = %name, ?tail_lines, "Streaming pod logs");

        let stream = api
            .log_stream(name, &self.log_params(tail_lines))
            .await
            .map_err(|e| map_log_error(e, namespace, name))?;

        let logs = drain_bounded(Box::pin(stream), self.max_bytes).await?;
        if logs.truncated {
            warn!(
                %namespace,
                pod = %name,
                max_bytes = self.max_bytes,
                "Pod logs exceeded byte bound, analysing truncated logs"
            );
        }
        Ok(logs)
    }
}

/// Read `reader` to the end, keeping at most `max_bytes`.
///
/// One extra byte is read to tell "exactly at the bound" from "over it".
pub async fn drain_bounded<R>(reader: R, max_bytes: usize) -> Result<FetchedLogs, LogSourceError>
where
    R: AsyncRead + Unpin,
{
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX).saturating_add(1);
    let mut buf = Vec::new();
    reader.take(limit).read_to_end(&mut buf).await?;

    let truncated = buf.len() > max_bytes;
    buf.truncate(max_bytes);

    Ok(FetchedLogs {
        text: String::from_utf8_lossy(&buf).into_owned(),
        truncated,
    })
}
