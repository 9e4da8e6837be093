//! Diagnosis API client
//!
//! Implements a single chat-completion exchange against an OpenAI-compatible
//! endpoint: POST /v1/chat/completions with a bearer token.

use crate::diagnosis_trait::DiagnosisClientTrait;
use crate::error::DiagnosisError;
use crate::models::*;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Default chat-completion endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Default model identifier
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// System instruction framing the task
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a DevOps expert AI that analyzes Kubernetes pod logs and provides diagnoses.";

/// Maximum number of response body characters kept in an upstream error
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Configuration for [`DiagnosisClient`]
#[derive(Clone)]
pub struct DiagnosisConfig {
    /// Full URL of the chat-completion endpoint
    pub endpoint: String,
    /// Bearer credential; `None` makes every call fail with a configuration error
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    /// System instruction sent ahead of the logs
    pub system_prompt: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for DiagnosisConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl std::fmt::Debug for DiagnosisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosisConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Diagnosis API client
#[derive(Debug)]
pub struct DiagnosisClient {
    client: Client,
    config: DiagnosisConfig,
}

impl DiagnosisClient {
    /// Create a new diagnosis client
    ///
    /// A missing API key is not an error here; it is reported on each call so
    /// the controller can keep running and surface the problem per request.
    pub fn new(config: DiagnosisConfig) -> Result<Self, DiagnosisError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(DiagnosisError::Transport)?;

        Ok(Self { client, config })
    }

    /// Whether an API key is configured
    pub fn has_credential(&self) -> bool {
        self.api_key().is_some()
    }

    fn api_key(&self) -> Option<&str> {
        self.config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Build the request body for `logs`
    pub fn build_request(&self, logs: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage::system(self.config.system_prompt.clone()),
                ChatMessage::user(format!(
                    "Analyze the following pod logs and explain any issues:\n\n{logs}"
                )),
            ],
        }
    }

    /// Ask the service to diagnose `logs`
    ///
    /// # Returns
    /// * `Ok(String)` - Content of the first returned choice
    /// * `Err(DiagnosisError)` - Missing key, transport failure, non-success
    ///   status, empty choice list or undecodable body
    pub async fn diagnose(&self, logs: &str) -> Result<String, DiagnosisError> {
        let api_key = self.api_key().ok_or_else(|| {
            DiagnosisError::Configuration("OPENAI_API_KEY not set".to_string())
        })?;

        let request = self.build_request(logs);
        debug!(
            model = %request.model,
            log_bytes = logs.len(),
            "Sending logs to diagnosis service"
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(DiagnosisError::Upstream {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&body).map_err(|e| {
            DiagnosisError::Decode(format!(
                "{} - Response (first {} chars): {}",
                e,
                MAX_ERROR_BODY_CHARS,
                body.chars().take(MAX_ERROR_BODY_CHARS).collect::<String>()
            ))
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(DiagnosisError::EmptyResult)?;

        debug!(chars = content.len(), "Received diagnosis");
        Ok(content)
    }
}

#[async_trait::async_trait]
impl DiagnosisClientTrait for DiagnosisClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn diagnose(&self, logs: &str) -> Result<String, DiagnosisError> {
        DiagnosisClient::diagnose(self, logs).await
    }
}
