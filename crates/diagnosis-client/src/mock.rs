//! Mock DiagnosisClient for unit testing
//!
//! Replies are scripted up front and handed out in order; once the script is
//! exhausted the default reply (if any) is returned.

use crate::diagnosis_trait::DiagnosisClientTrait;
use crate::error::DiagnosisError;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<Result<String, DiagnosisError>>,
    default_reply: Option<String>,
    calls: Vec<String>,
}

/// Mock DiagnosisClient for testing
#[derive(Debug, Clone)]
pub struct MockDiagnosisClient {
    model: String,
    state: Arc<Mutex<MockState>>,
}

impl MockDiagnosisClient {
    /// Create a new mock client with no scripted replies
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Create a mock that always answers `reply`
    pub fn always(model: impl Into<String>, reply: impl Into<String>) -> Self {
        let mock = Self::new(model);
        mock.set_default_reply(reply);
        mock
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a successful reply
    pub fn push_reply(&self, reply: impl Into<String>) {
        self.state().script.push_back(Ok(reply.into()));
    }

    /// Queue a failure
    pub fn push_error(&self, error: DiagnosisError) {
        self.state().script.push_back(Err(error));
    }

    /// Reply used once the script is exhausted
    pub fn set_default_reply(&self, reply: impl Into<String>) {
        self.state().default_reply = Some(reply.into());
    }

    /// Log texts received so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Number of diagnose calls made so far
    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }
}

#[async_trait::async_trait]
impl DiagnosisClientTrait for MockDiagnosisClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn diagnose(&self, logs: &str) -> Result<String, DiagnosisError> {
        let mut state = self.state();
        state.calls.push(logs.to_string());
        match state.script.pop_front() {
            Some(reply) => reply,
            None => state.default_reply.clone().ok_or(DiagnosisError::EmptyResult),
        }
    }
}
