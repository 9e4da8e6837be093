//! Diagnosis API Client
//!
//! Sends a block of pod logs to an OpenAI-compatible chat-completion endpoint
//! and returns the model's diagnosis.
//!
//! # Example
//!
//! ```no_run
//! use diagnosis_client::{DiagnosisClient, DiagnosisConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DiagnosisConfig {
//!     api_key: Some("sk-...".to_string()),
//!     ..DiagnosisConfig::default()
//! };
//! let client = DiagnosisClient::new(config)?;
//!
//! let diagnosis = client.diagnose("OOMKilled at 10:02").await?;
//! println!("{diagnosis}");
//! # Ok(())
//! # }
//! ```
//!
//! The client performs exactly one request per call. Retrying is left to the
//! caller.

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod diagnosis_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::{DiagnosisClient, DiagnosisConfig};
pub use diagnosis_trait::DiagnosisClientTrait;
pub use error::DiagnosisError;
pub use models::*;
#[cfg(feature = "test-util")]
pub use mock::MockDiagnosisClient;
