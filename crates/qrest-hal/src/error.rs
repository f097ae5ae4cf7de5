//! Error types for the HAL crate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::message::ServerMessage;

/// Errors that can occur while talking to a remote execution backend.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServerError {
    /// A required configuration key was found neither in the backend
    /// configuration nor in the environment.
    #[error("Missing configuration: '{key}'{hint}")]
    MissingConfiguration {
        /// The configuration key.
        key: String,
        /// Extra guidance, e.g. the environment variable that was consulted.
        hint: String,
    },

    /// A configuration value is present but unusable.
    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidConfiguration {
        /// The configuration key.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// No factory is registered under the requested backend name.
    #[error("Unknown backend: '{0}'")]
    UnknownBackend(String),

    /// Network or HTTP-layer failure.
    #[error("Transport error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Transport {
        /// HTTP status code, when the server answered.
        status: Option<u16>,
        /// Error description or response body.
        message: String,
    },

    /// The backend violated its own documented response contract.
    #[error("Malformed response: {reason}")]
    MalformedResponse {
        /// What was missing or mis-typed.
        reason: String,
        /// The offending message, kept for diagnostics.
        response: ServerMessage,
    },

    /// The backend reported that the job terminated unsuccessfully.
    #[error("Job execution failed{}: {message}", .code.map(|c| format!(" (status code {c})")).unwrap_or_default())]
    JobExecutionFailed {
        /// Backend status code, when reported.
        code: Option<i64>,
        /// Backend message, verbatim.
        message: String,
    },

    /// Login or token refresh failed.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The caller used a handle or helper in a way the lifecycle forbids.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while persisting a handle.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Build a `MissingConfiguration` error without a hint.
    pub fn missing(key: impl Into<String>) -> Self {
        ServerError::MissingConfiguration {
            key: key.into(),
            hint: String::new(),
        }
    }

    /// Build a `MalformedResponse` error retaining the offending message.
    pub fn malformed(reason: impl Into<String>, response: &ServerMessage) -> Self {
        ServerError::MalformedResponse {
            reason: reason.into(),
            response: response.clone(),
        }
    }

    /// Build a `JobExecutionFailed` error.
    pub fn job_failed(code: Option<i64>, message: impl Into<String>) -> Self {
        ServerError::JobExecutionFailed {
            code,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ServerError {
    fn from(e: reqwest::Error) -> Self {
        ServerError::Transport {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

/// Result type for HAL operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Category of a terminal job failure, as persisted in an async result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The backend reported the job as failed.
    JobExecution,
    /// The backend answered with a response it should not have produced.
    MalformedResponse,
    /// Login or refresh failed while polling.
    Authentication,
    /// Network or HTTP failure.
    Transport,
    /// Anything else.
    Other,
}

/// Serializable snapshot of the error that moved a job to `Failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFailure {
    /// Failure category.
    pub kind: FailureKind,
    /// Backend status code (job failures) or HTTP status (transport).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    /// Human-readable message.
    pub message: String,
    /// Offending response for malformed-response failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ServerMessage>,
}

impl JobFailure {
    /// Rebuild an error equivalent to the one that was recorded.
    pub fn to_error(&self) -> ServerError {
        match self.kind {
            FailureKind::JobExecution => ServerError::JobExecutionFailed {
                code: self.code,
                message: self.message.clone(),
            },
            FailureKind::MalformedResponse => ServerError::MalformedResponse {
                reason: self.message.clone(),
                response: self.response.clone().unwrap_or(ServerMessage::Null),
            },
            FailureKind::Authentication => ServerError::Authentication(self.message.clone()),
            FailureKind::Transport => ServerError::Transport {
                status: self.code.and_then(|c| u16::try_from(c).ok()),
                message: self.message.clone(),
            },
            FailureKind::Other => ServerError::InvalidState(self.message.clone()),
        }
    }
}

impl From<&ServerError> for JobFailure {
    fn from(e: &ServerError) -> Self {
        match e {
            ServerError::JobExecutionFailed { code, message } => JobFailure {
                kind: FailureKind::JobExecution,
                code: *code,
                message: message.clone(),
                response: None,
            },
            ServerError::MalformedResponse { reason, response } => JobFailure {
                kind: FailureKind::MalformedResponse,
                code: None,
                message: reason.clone(),
                response: Some(response.clone()),
            },
            ServerError::Authentication(msg) => JobFailure {
                kind: FailureKind::Authentication,
                code: None,
                message: msg.clone(),
                response: None,
            },
            ServerError::Transport { status, message } => JobFailure {
                kind: FailureKind::Transport,
                code: status.map(i64::from),
                message: message.clone(),
                response: None,
            },
            other => JobFailure {
                kind: FailureKind::Other,
                code: None,
                message: other.to_string(),
                response: None,
            },
        }
    }
}
