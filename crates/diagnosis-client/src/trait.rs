//! DiagnosisClient trait for mocking
//!
//! The reconciler depends on this trait rather than on the concrete HTTP
//! client so unit tests can script diagnosis results.

use crate::error::DiagnosisError;

/// Trait for diagnosis service operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait DiagnosisClientTrait: Send + Sync {
    /// Model identifier sent with every request
    fn model(&self) -> &str;

    /// Ask for a diagnosis of `logs`. Performs a single exchange, no retries.
    async fn diagnose(&self, logs: &str) -> Result<String, DiagnosisError>;
}
