//! LogAnalysisRequest CRD
//!
//! Requests an analysis of a pod's logs. The controller fetches the logs,
//! asks the diagnosis service what is wrong and records the verdict in the
//! status subresource.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Kind assumed when `targetRef.kind` is omitted.
pub const DEFAULT_TARGET_KIND: &str = "Pod";

/// Desired analysis: which pod to read and how much of its log.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "aiops.aiops.dev",
    version = "v1",
    kind = "LogAnalysisRequest",
    namespaced,
    status = "LogAnalysisRequestStatus",
    shortname = "lar",
    printcolumn = r#"{"name":"Target","type":"string","jsonPath":".spec.targetRef.name"}"#,
    printcolumn = r#"{"name":"Resolved","type":"boolean","jsonPath":".status.resolved"}"#,
    printcolumn = r#"{"name":"Analyzed","type":"date","jsonPath":".status.timestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct LogAnalysisRequestSpec {
    /// Object whose logs are analyzed
    #[serde(alias = "objectRef")]
    pub target_ref: TargetRef,

    /// Only fetch the last N lines (absent means the full log)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1))]
    pub tail_lines: Option<i64>,
}

impl LogAnalysisRequestSpec {
    /// Effective tail bound. Non-positive values are treated as "no bound".
    pub fn tail_lines(&self) -> Option<i64> {
        self.tail_lines.filter(|n| *n > 0)
    }
}

/// Reference to the object whose logs are analyzed
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TargetRef {
    /// Name of the target pod
    pub name: String,

    /// Namespace (defaults to same namespace as the LogAnalysisRequest)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Kind of the target. Only `Pod` is supported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl TargetRef {
    /// Namespace the target lives in, falling back to `own_namespace` when
    /// the reference leaves it empty.
    pub fn resolve_namespace<'a>(&'a self, own_namespace: &'a str) -> &'a str {
        match self.namespace.as_deref() {
            Some(ns) if !ns.is_empty() => ns,
            _ => own_namespace,
        }
    }

    /// Kind of the target, defaulting to `Pod`.
    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or(DEFAULT_TARGET_KIND)
    }
}

/// Outcome of the last successful analysis
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LogAnalysisRequestStatus {
    /// Diagnosis text from the last successful analysis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,

    /// Whether the diagnosis reports the problem as resolved
    #[serde(default)]
    pub resolved: bool,

    /// Time of the last status write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,

    /// `metadata.generation` the diagnosis was produced for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}
