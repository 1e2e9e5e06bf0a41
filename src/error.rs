//! Error types for qblast
//!
//! Every failure of the job lifecycle is reported through [`Error`]. Variants raised
//! while talking to the service record the [`Phase`] they happened in and, where a
//! status block had already been parsed, the raw fields that were observed, so a
//! failed job can be diagnosed without running it again.

use crate::status::StatusBlock;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for qblast operations
pub type Result<T> = std::result::Result<T, Error>;

/// Lifecycle phase an error was raised in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Submitting the search (`CMD=Put`)
    Submit,
    /// Checking job status (`CMD=Get`, `FORMAT_OBJECT=SearchInfo`)
    Poll,
    /// Fetching the result archive (`CMD=Get`, `FORMAT_TYPE=...`)
    Download,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Submit => "submit",
            Phase::Poll => "poll",
            Phase::Download => "download",
        };
        f.write_str(name)
    }
}

/// Main error type for qblast
#[derive(Debug, Error)]
pub enum Error {
    /// Unsupported database, program or output format. Raised before any request is sent.
    #[error("validation error: unsupported {field} '{value}'")]
    Validation {
        /// Which setting was rejected (e.g. "database")
        field: &'static str,
        /// The rejected value as supplied by the caller
        value: String,
    },

    /// Invalid client configuration
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g. "endpoint")
        key: Option<String>,
    },

    /// Network failure or non-success HTTP status. Never retried by the client.
    #[error("transport error during {phase}: {reason}")]
    Transport {
        /// Phase the request belonged to
        phase: Phase,
        /// Description of the failure, with any credential stripped
        reason: String,
        /// Underlying HTTP client error, if the failure came from reqwest
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The status envelope is malformed or an expected field is missing
    #[error("protocol error during {phase}: {reason} (observed: {observed})")]
    Protocol {
        /// Phase the response belonged to
        phase: Phase,
        /// What was wrong with the response
        reason: String,
        /// Status fields parsed from the response, empty if none
        observed: StatusBlock,
    },

    /// The service no longer knows the job (`Status = UNKNOWN`)
    #[error("job {rid} is unknown to the service (observed: {observed})")]
    UnknownJob {
        /// Request id the service lost track of
        rid: String,
        /// Status fields parsed from the response
        observed: StatusBlock,
    },

    /// The service reports the search itself failed (`Status = FAILED`)
    #[error("job {rid} failed on the service (observed: {observed})")]
    JobFailed {
        /// Request id of the failed job
        rid: String,
        /// Status fields parsed from the response
        observed: StatusBlock,
    },

    /// The downloaded payload is not a valid archive, or an entry is unsafe to extract
    #[error("archive error: {reason}")]
    Archive {
        /// Why the archive was rejected
        reason: String,
        /// Offending entry name, when the error concerns a single entry
        entry: Option<String>,
    },

    /// Polling was cancelled through its cancellation token
    #[error("polling of job {rid} was cancelled")]
    Cancelled {
        /// Request id that was being polled
        rid: String,
    },

    /// The poll deadline passed before the job finished
    #[error("job {rid} did not finish before the poll deadline")]
    DeadlineExceeded {
        /// Request id that was being polled
        rid: String,
    },

    /// A lifecycle operation was invoked out of order
    #[error("cannot {operation} while job is {state}")]
    InvalidState {
        /// Operation that was attempted (e.g. "download")
        operation: &'static str,
        /// Lifecycle state the client was in
        state: crate::types::JobState,
    },

    /// I/O error while materializing results
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path being written when the error occurred
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Machine-readable error code, stable across releases
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "validation_error",
            Error::Config { .. } => "config_error",
            Error::Transport { .. } => "transport_error",
            Error::Protocol { .. } => "protocol_error",
            Error::UnknownJob { .. } => "unknown_job",
            Error::JobFailed { .. } => "job_failed",
            Error::Archive { .. } => "archive_error",
            Error::Cancelled { .. } => "cancelled",
            Error::DeadlineExceeded { .. } => "deadline_exceeded",
            Error::InvalidState { .. } => "invalid_state",
            Error::Io { .. } => "io_error",
        }
    }

    /// Process exit status a command-line front end should report for this error
    ///
    /// Usage problems map to 2 (the conventional "bad arguments" code), everything
    /// else to 1. Success is 0 and never comes from an `Error`.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Validation { .. } | Error::Config { .. } => 2,
            _ => 1,
        }
    }

    /// Lifecycle phase the error was raised in, if it came from a service exchange
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Error::Transport { phase, .. } | Error::Protocol { phase, .. } => Some(*phase),
            Error::UnknownJob { .. }
            | Error::JobFailed { .. }
            | Error::Cancelled { .. }
            | Error::DeadlineExceeded { .. } => Some(Phase::Poll),
            Error::Archive { .. } | Error::Io { .. } => Some(Phase::Download),
            _ => None,
        }
    }

    /// Status fields observed in the response that triggered the error
    pub fn observed(&self) -> Option<&StatusBlock> {
        match self {
            Error::Protocol { observed, .. }
            | Error::UnknownJob { observed, .. }
            | Error::JobFailed { observed, .. } => Some(observed),
            _ => None,
        }
    }

    pub(crate) fn archive(reason: impl Into<String>) -> Self {
        Error::Archive {
            reason: reason.into(),
            entry: None,
        }
    }

    pub(crate) fn transport(phase: Phase, source: reqwest::Error) -> Self {
        // The request URL may carry the api_key parameter
        let source = source.without_url();
        let reason = if source.is_timeout() {
            "request timed out".to_string()
        } else if source.is_connect() {
            "connection failed".to_string()
        } else {
            source.to_string()
        };
        Error::Transport {
            phase,
            reason,
            source: Some(source),
        }
    }
}
