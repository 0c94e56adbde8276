//! Error types surfaced by a run: the per-value failure, the aggregate returned
//! from `Runner::run`, and configuration errors caught before a run starts.

use std::fmt;
use thiserror::Error;

/// An action failure tagged with the value that produced it.
#[derive(Debug, Error)]
#[error("[value {value:?}]: {cause:#}")]
pub struct ValueError {
    value: String,
    #[source]
    cause: anyhow::Error,
}

impl ValueError {
    pub fn new(value: impl Into<String>, cause: anyhow::Error) -> Self {
        Self { value: value.into(), cause }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cause(&self) -> &anyhow::Error {
        &self.cause
    }

    pub fn into_parts(self) -> (String, anyhow::Error) {
        (self.value, self.cause)
    }
}

/// One entry of an [`AggregateError`].
#[derive(Debug, Error)]
pub enum RunFailure {
    #[error(transparent)]
    Value(#[from] ValueError),

    #[error("interrupted")]
    Interrupted,
}

/// Every failure collected during one run, in arrival order.
///
/// Arrival order is whatever order the workers happened to report in; it is
/// not the input order. When the run was interrupted the last entry is
/// [`RunFailure::Interrupted`].
#[derive(Debug)]
pub struct AggregateError {
    failures: Vec<RunFailure>,
}

impl AggregateError {
    /// Fold collected failures into a result: an empty list means success.
    pub fn from_failures(failures: Vec<RunFailure>) -> Result<(), AggregateError> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(AggregateError { failures })
        }
    }

    pub fn failures(&self) -> &[RunFailure] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<RunFailure> {
        self.failures
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn is_interrupted(&self) -> bool {
        self.failures.iter().any(|f| matches!(f, RunFailure::Interrupted))
    }

    /// Per-value failures only (the interruption marker is skipped).
    pub fn value_errors(&self) -> impl Iterator<Item = &ValueError> {
        self.failures.iter().filter_map(|f| match f {
            RunFailure::Value(e) => Some(e),
            RunFailure::Interrupted => None,
        })
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to run ({} errors):", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            write!(f, "\n[error {:>3}]: {}", i + 1, failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

/// Problems detected before any work is dispatched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("workers must be at least 1")]
    ZeroWorkers,

    #[error("command is required")]
    MissingCommand,

    #[error("unknown output mode {0:?} (expected one of plain, color, prefix, none)")]
    InvalidOutputMode(String),
}
