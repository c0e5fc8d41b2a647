//! Error taxonomy for the pipeline.
//!
//! Each category maps to a distinct exit code so scripted callers can tell
//! configuration mistakes from source outages from data defects. Row-level
//! defects (unparseable period, non-positive value) are deliberately NOT
//! errors: they are drop counters in `transform::TransformReport`, and the
//! batch continues without them.

use thiserror::Error;

/// A single failed pre-insert quality check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityIssue {
    /// Stable check identifier (e.g. `natural_key_unique`).
    pub check: &'static str,
    /// Human-readable specifics, including the offending row count.
    pub detail: String,
}

impl std::fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.check, self.detail)
    }
}

#[derive(Debug, Error)]
pub enum EtlError {
    /// Remote source unreachable or returned a non-success status.
    /// The operation yields no data and is not retried.
    #[error("source error: {0}")]
    Source(String),

    /// Input failed structural validation (missing required columns, empty
    /// batch). Fatal to the invocation that received it.
    #[error("validation error: {0}")]
    Validation(String),

    /// The whole batch was rejected by the pre-insert quality gate.
    /// Carries every failed check; nothing was inserted.
    #[error("quality gate failed: {}", fmt_issues(.0))]
    QualityGate(Vec<QualityIssue>),

    /// Not enough history to train a model for a scope. The scope is
    /// skipped; a batch run continues.
    #[error("insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Model fit failed for a scope.
    #[error("model error: {0}")]
    Model(String),

    /// Database failure.
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// Bad environment or CLI configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl EtlError {
    /// Process exit code reported by the binary wrapper.
    pub fn exit_code(&self) -> u8 {
        match self {
            EtlError::Config(_) | EtlError::Validation(_) => 2,
            EtlError::InsufficientData { .. } | EtlError::Model(_) => 3,
            EtlError::Source(_) => 4,
            EtlError::QualityGate(_) => 5,
            EtlError::Store(_) => 6,
        }
    }
}

fn fmt_issues(issues: &[QualityIssue]) -> String {
    let parts: Vec<String> = issues.iter().map(|i| i.to_string()).collect();
    parts.join("; ")
}
