//! Job lifecycle types.
//!
//! The driver state machine:
//!
//! ```text
//!   Created ──→ Submitted ──→ Polling ──→ Done
//!      │            │            │
//!      └────────────┴────────────┴──→ Failed
//! ```
//!
//! **Invariants:**
//! - A submitted job is never assumed complete; the first status check
//!   happens after the backend's polling interval.
//! - `Done` and `Failed` are terminal and never revisited.
//! - Resuming a `Polling` job continues at the next status check; it never
//!   resubmits.

use serde::{Deserialize, Serialize};

use crate::message::{RestHeaders, ServerMessage};

/// Backend-assigned identifier of a submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Create a new job ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Phase of a job in the driver state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    /// Payload built, nothing sent yet.
    Created,
    /// Submission request accepted by the backend.
    Submitted,
    /// Waiting for a terminal status.
    Polling,
    /// Results available.
    Done,
    /// Terminated with an error.
    Failed,
}

impl JobPhase {
    /// Check if this is a terminal phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobPhase::Done | JobPhase::Failed)
    }
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobPhase::Created => write!(f, "Created"),
            JobPhase::Submitted => write!(f, "Submitted"),
            JobPhase::Polling => write!(f, "Polling"),
            JobPhase::Done => write!(f, "Done"),
            JobPhase::Failed => write!(f, "Failed"),
        }
    }
}

/// One compiled circuit, as produced by the compiler toolchain.
///
/// The `code` is opaque: it is forwarded to the backend unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelExecution {
    /// Name of the originating kernel.
    pub name: String,
    /// Serialized circuit in the backend's wire format.
    pub code: String,
}

impl KernelExecution {
    /// Create a new kernel execution.
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
        }
    }
}

/// The submission request built by a server helper.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerJobPayload {
    /// Submission path, relative to the helper's base URL.
    pub path: String,
    /// Request headers.
    pub headers: RestHeaders,
    /// JSON request body.
    pub body: ServerMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_phase_terminal() {
        assert!(!JobPhase::Created.is_terminal());
        assert!(!JobPhase::Submitted.is_terminal());
        assert!(!JobPhase::Polling.is_terminal());
        assert!(JobPhase::Done.is_terminal());
        assert!(JobPhase::Failed.is_terminal());
    }

    #[test]
    fn test_job_id_serializes_as_plain_string() {
        let id = JobId::new("job-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"job-1\"");
        assert_eq!(id.to_string(), "job-1");
    }

    #[test]
    fn test_kernel_execution_new() {
        let exec = KernelExecution::new("ghz", "OPENQASM 2.0;");
        assert_eq!(exec.name, "ghz");
        assert_eq!(exec.code, "OPENQASM 2.0;");
    }
}
