use std::time::Duration;

use thiserror::Error;

/// Failure of a whole sampling pass. Per-field probe and parse failures never
/// reach this type; providers default those fields instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SampleError {
    #[error("could not enumerate {what}: {reason}")]
    Enumeration { what: &'static str, reason: String },
    #[error("refresh cancelled")]
    Cancelled,
    #[error("worker failed: {0}")]
    Worker(String),
}

impl SampleError {
    pub fn enumeration(what: &'static str, reason: impl ToString) -> Self {
        SampleError::Enumeration {
            what,
            reason: reason.to_string(),
        }
    }
}

/// Outcome of a single external probe (`ps`, `df`, `sysctl`, ...).
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("failed to run {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum TerminateError {
    #[error("process {0} not found")]
    NotFound(i64),
    #[error("permission denied for process {0}")]
    Denied(i64),
    #[error("invalid process id {0}")]
    Invalid(i64),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShutdownError {
    #[error("{pending} worker(s) still busy after {grace:?}")]
    Timeout { pending: usize, grace: Duration },
}
