//! Log Analysis CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the log analysis controller.

pub mod log_analysis_request;

pub use log_analysis_request::*;
