//! Error types for flowprobe
//!
//! Messages name the offending key, rule or step so a failing pipeline
//! report can be acted on without digging through logs.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for flowprobe
#[derive(Error, Debug)]
pub enum Error {
    // === Upstream Errors ===
    #[error("Upstream fetch for '{url}' failed: {message}")]
    UpstreamFetch { url: String, message: String },

    // === Scenario Matrix Errors ===
    #[error("Scenario matrix has no fields")]
    EmptyMatrix,

    #[error("Scenario {index} field set mismatch: expected [{expected}], got [{found}]")]
    FieldSetMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("Value {value} is not allowed for field '{field}'")]
    ValueNotAllowed { field: String, value: String },

    #[error("Scenario {index} duplicates scenario {first}: {label}")]
    DuplicateScenario {
        index: usize,
        first: usize,
        label: String,
    },

    // === Interception Errors ===
    #[error("Invalid URL pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid target path '{0}'. Paths are JSON pointers such as '/data' or '' for the root")]
    InvalidTargetPath(String),

    #[error("Interception rule '{0}' not found")]
    RuleNotFound(String),

    // === Pipeline Errors ===
    #[error("Step assertion failed: {0}")]
    StepAssertion(String),

    #[error("Timed out after {elapsed_ms}ms waiting for {condition}")]
    WaitTimeout { condition: String, elapsed_ms: u64 },

    #[error("Operation cancelled")]
    Cancelled,

    // === Session Errors ===
    #[error("Failed to open session for pipeline '{pipeline}': {reason}")]
    SessionOpenFailed { pipeline: String, reason: String },

    #[error("Session '{0}' is already closed")]
    SessionClosed(String),

    #[error("Automation driver error: {0}")]
    Driver(String),

    // === Shared State Errors ===
    #[error("Shared state key '{key}' has not been written. Run the producing pipeline first")]
    MissingSharedState { key: String },

    #[error("Context '{name}' is version {found}, expected version {expected}")]
    ContextVersionMismatch {
        name: String,
        expected: u32,
        found: u32,
    },

    #[error("Invalid session snapshot '{path}': {reason}")]
    SnapshotParse { path: String, reason: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an upstream fetch error
    pub fn upstream_fetch(url: &str, message: impl std::fmt::Display) -> Self {
        Self::UpstreamFetch {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a missing shared state error
    pub fn missing_state(key: &str) -> Self {
        Self::MissingSharedState {
            key: key.to_string(),
        }
    }

    /// Create an invalid pattern error
    pub fn invalid_pattern(pattern: &str, reason: impl std::fmt::Display) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a file read error
    pub fn file_read(path: &std::path::Path, error: impl std::fmt::Display) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Short machine-readable code used in pipeline reports
    pub fn code(&self) -> &'static str {
        match self {
            Error::UpstreamFetch { .. } => "UPSTREAM_FETCH",
            Error::StepAssertion(_) => "STEP_ASSERTION",
            Error::MissingSharedState { .. } => "MISSING_SHARED_STATE",
            Error::ContextVersionMismatch { .. } => "CONTEXT_VERSION",
            Error::WaitTimeout { .. } => "TIMEOUT",
            Error::Cancelled => "CANCELLED",
            Error::SessionOpenFailed { .. } | Error::SessionClosed(_) => "SESSION",
            Error::Driver(_) => "DRIVER",
            Error::EmptyMatrix
            | Error::FieldSetMismatch { .. }
            | Error::ValueNotAllowed { .. }
            | Error::DuplicateScenario { .. } => "MATRIX",
            Error::InvalidPattern { .. }
            | Error::InvalidTargetPath(_)
            | Error::RuleNotFound(_) => "RULE",
            Error::Config(_) | Error::ConfigParse(_) | Error::Yaml(_) => "CONFIG",
            _ => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_state_message_names_key() {
        let err = Error::missing_state("credit.request_id");
        assert!(err.to_string().contains("credit.request_id"));
        assert_eq!(err.code(), "MISSING_SHARED_STATE");
    }

    #[test]
    fn test_upstream_fetch_code() {
        let err = Error::upstream_fetch("http://backend/api", "connection refused");
        assert_eq!(err.code(), "UPSTREAM_FETCH");
        assert!(err.to_string().contains("connection refused"));
    }
}
