// Error taxonomy shared by every layer of the crate. The CLI boundary
// converts these into a single stderr line and an exit code.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::JobStatus;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Resource kinds that can be looked up by name or ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Notebook,
    Transformation,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Notebook => f.write_str("notebook"),
            ResourceKind::Transformation => f.write_str("transformation"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// DNS, connect, timeout or any other failure below HTTP.
    #[error("request error: {0}")]
    Request(#[source] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("HTTP error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode {what} response: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("{kind} not found: {token}")]
    NotFound { kind: ResourceKind, token: String },

    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    UserInput(String),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("job {job_id} still not finished after {elapsed:?}")]
    Deadline { job_id: String, elapsed: Duration },

    #[error("job {job_id} finished with status {status}")]
    JobFailed { job_id: String, status: JobStatus },
}

impl Error {
    /// Process exit code for this failure class.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::UserInput(_) | Error::Configuration(_) | Error::Io { .. } => 2,
            Error::JobFailed { .. } | Error::Deadline { .. } => 3,
            Error::Request(_) | Error::Status { .. } | Error::Decode { .. } => 4,
            Error::NotFound { .. } | Error::Encode(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_carries_code_and_body() {
        let err = Error::Status {
            status: 404,
            body: "{\"detail\":\"Not Found\"}".into(),
        };
        assert_eq!(err.to_string(), "HTTP error 404: {\"detail\":\"Not Found\"}");
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn not_found_names_kind_and_token() {
        let err = Error::NotFound {
            kind: ResourceKind::Transformation,
            token: "summary".into(),
        };
        assert_eq!(err.to_string(), "transformation not found: summary");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn job_failure_exit_code() {
        let err = Error::JobFailed {
            job_id: "command:1".into(),
            status: JobStatus::Cancelled,
        };
        assert_eq!(err.to_string(), "job command:1 finished with status cancelled");
        assert_eq!(err.exit_code(), 3);
    }
}
