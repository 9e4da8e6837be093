//! Controller configuration.
//!
//! Everything is read from environment variables. Parsing goes through a
//! lookup function so tests can supply their own map.

use crate::error::ControllerError;
use crate::logs::DEFAULT_MAX_LOG_BYTES;
use diagnosis_client::DiagnosisConfig;
use std::time::Duration;

/// Default deadline for one reconciliation's external calls
pub const DEFAULT_RECONCILE_TIMEOUT: Duration = Duration::from_secs(120);

/// Default delay before a failed reconciliation is retried
pub const DEFAULT_ERROR_REQUEUE: Duration = Duration::from_secs(60);

/// Default number of reconciliations allowed to run at once
pub const DEFAULT_CONCURRENCY: u16 = 4;

/// Default quiet period after the last event before reconciling
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(5);

/// Runtime configuration of the log analysis controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Diagnosis service settings (endpoint, credential, model, HTTP timeout)
    pub diagnosis: DiagnosisConfig,
    /// Namespace to watch; `None` watches all namespaces
    pub watch_namespace: Option<String>,
    /// Bound on bytes read from a single pod log stream
    pub log_max_bytes: usize,
    /// Deadline covering the log drain and the diagnosis call
    pub reconcile_timeout: Duration,
    /// Requeue delay after a failed reconciliation
    pub error_requeue: Duration,
    /// Maximum concurrent reconciliations
    pub concurrency: u16,
    /// Debounce applied to watch events
    pub debounce: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            diagnosis: DiagnosisConfig::default(),
            watch_namespace: None,
            log_max_bytes: DEFAULT_MAX_LOG_BYTES,
            reconcile_timeout: DEFAULT_RECONCILE_TIMEOUT,
            error_requeue: DEFAULT_ERROR_REQUEUE,
            concurrency: DEFAULT_CONCURRENCY,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let mut diagnosis = defaults.diagnosis;
        diagnosis.api_key = get("OPENAI_API_KEY");
        if let Some(endpoint) = get("DIAGNOSIS_ENDPOINT") {
            diagnosis.endpoint = endpoint;
        }
        if let Some(model) = get("DIAGNOSIS_MODEL") {
            diagnosis.model = model;
        }
        if let Some(secs) = parse::<u64>(&get, "DIAGNOSIS_TIMEOUT_SECS")? {
            diagnosis.timeout = Duration::from_secs(secs);
        }

        let log_max_bytes = parse::<usize>(&get, "LOG_MAX_BYTES")?.unwrap_or(defaults.log_max_bytes);
        if log_max_bytes == 0 {
            return Err(ControllerError::InvalidConfig(
                "LOG_MAX_BYTES must be greater than zero".to_string(),
            ));
        }

        let concurrency = parse::<u16>(&get, "RECONCILE_CONCURRENCY")?.unwrap_or(defaults.concurrency);
        if concurrency == 0 {
            return Err(ControllerError::InvalidConfig(
                "RECONCILE_CONCURRENCY must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            diagnosis,
            watch_namespace: get("WATCH_NAMESPACE"),
            log_max_bytes,
            reconcile_timeout: parse::<u64>(&get, "RECONCILE_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.reconcile_timeout),
            error_requeue: parse::<u64>(&get, "ERROR_REQUEUE_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.error_requeue),
            concurrency,
            debounce: parse::<u64>(&get, "RECONCILE_DEBOUNCE_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.debounce),
        })
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ControllerError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| {
                ControllerError::InvalidConfig(format!("{key}={raw:?} is not valid: {e}"))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ControllerConfig, ControllerError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ControllerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = load(&[]).expect("config");
        assert!(config.diagnosis.api_key.is_none());
        assert_eq!(config.diagnosis.model, "gpt-4o");
        assert_eq!(
            config.diagnosis.endpoint,
            "https://api.openai.com/v1/chat/completions"
        );
        assert!(config.watch_namespace.is_none());
        assert_eq!(config.log_max_bytes, 1024 * 1024);
        assert_eq!(config.reconcile_timeout, Duration::from_secs(120));
        assert_eq!(config.error_requeue, Duration::from_secs(60));
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.debounce, Duration::from_secs(5));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("DIAGNOSIS_ENDPOINT", "http://llm.local/v1/chat/completions"),
            ("DIAGNOSIS_MODEL", "gpt-4o-mini"),
            ("DIAGNOSIS_TIMEOUT_SECS", "30"),
            ("WATCH_NAMESPACE", "prod"),
            ("LOG_MAX_BYTES", "4096"),
            ("RECONCILE_TIMEOUT_SECS", " 45 "),
            ("ERROR_REQUEUE_SECS", "10"),
            ("RECONCILE_CONCURRENCY", "8"),
            ("RECONCILE_DEBOUNCE_SECS", "0"),
        ])
        .expect("config");

        assert_eq!(config.diagnosis.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.diagnosis.endpoint, "http://llm.local/v1/chat/completions");
        assert_eq!(config.diagnosis.model, "gpt-4o-mini");
        assert_eq!(config.diagnosis.timeout, Duration::from_secs(30));
        assert_eq!(config.watch_namespace.as_deref(), Some("prod"));
        assert_eq!(config.log_max_bytes, 4096);
        assert_eq!(config.reconcile_timeout, Duration::from_secs(45));
        assert_eq!(config.error_requeue, Duration::from_secs(10));
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.debounce, Duration::ZERO);
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let config = load(&[("OPENAI_API_KEY", "  "), ("WATCH_NAMESPACE", "")]).expect("config");
        assert!(config.diagnosis.api_key.is_none());
        assert!(config.watch_namespace.is_none());
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = load(&[("LOG_MAX_BYTES", "lots")]).expect_err("should fail");
        match err {
            ControllerError::InvalidConfig(msg) => assert!(msg.contains("LOG_MAX_BYTES")),
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
        assert!(load(&[("RECONCILE_TIMEOUT_SECS", "-1")]).is_err());
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        assert!(matches!(
            load(&[("RECONCILE_CONCURRENCY", "0")]),
            Err(ControllerError::InvalidConfig(_))
        ));
        assert!(load(&[("LOG_MAX_BYTES", "0")]).is_err());
    }

    #[test]
    fn test_debug_output_redacts_api_key() {
        let config = load(&[("OPENAI_API_KEY", "sk-secret")]).expect("config");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
    }
}
