//! Serializable job handles.
//!
//! An [`AsyncResult`] is created when a job is accepted by the backend. It
//! carries everything needed to rebuild the server helper and continue
//! polling in another process: backend name, job id, status path and the
//! helper's persisted configuration. Its outcome slot is written once, by
//! whichever driver call first observes a terminal status.
//!
//! Handles persist as a versioned JSON record:
//!
//! ```json
//! {
//!   "version": 1,
//!   "backend": "fermioniq",
//!   "job_id": "job-1",
//!   "status_path": "/api/jobs/job-1",
//!   "config": { "base_url": "https://..." },
//!   "kernels": ["bell"],
//!   "initial_poll_delay_ms": 1000,
//!   "submitted_at": "2026-01-01T00:00:00Z",
//!   "outcome": { "state": "done", "result": { "executions": [...] } }
//! }
//! ```

use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::BackendConfig;
use crate::error::{JobFailure, ServerError, ServerResult};
use crate::job::{JobId, JobPhase};
use crate::message::ServerMessage;
use crate::result::SampleResult;

/// Record format written by this version of the crate.
pub const RECORD_VERSION: u32 = 1;

/// Terminal state of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobOutcome {
    /// Results were retrieved.
    Done {
        /// Normalized results.
        result: SampleResult,
    },
    /// The job, or the processing of its results, failed.
    Failed {
        /// What went wrong.
        failure: JobFailure,
    },
}

impl JobOutcome {
    /// The phase this outcome represents.
    pub fn phase(&self) -> JobPhase {
        match self {
            JobOutcome::Done { .. } => JobPhase::Done,
            JobOutcome::Failed { .. } => JobPhase::Failed,
        }
    }

    /// The stored result, or the stored failure as an error.
    pub fn to_result(&self) -> ServerResult<SampleResult> {
        match self {
            JobOutcome::Done { result } => Ok(result.clone()),
            JobOutcome::Failed { failure } => Err(failure.to_error()),
        }
    }
}

/// Handle to a submitted job.
#[derive(Debug)]
pub struct AsyncResult {
    backend: String,
    job_id: JobId,
    status_path: String,
    config: BackendConfig,
    kernels: Vec<String>,
    initial_poll_delay: Duration,
    submitted_at: DateTime<Utc>,
    outcome: OnceLock<JobOutcome>,
    poll_lock: Mutex<()>,
}

#[derive(Serialize, Deserialize)]
struct AsyncResultRecord {
    version: u32,
    backend: String,
    job_id: JobId,
    status_path: String,
    config: BackendConfig,
    #[serde(default)]
    kernels: Vec<String>,
    initial_poll_delay_ms: u64,
    submitted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    outcome: Option<JobOutcome>,
}

impl AsyncResult {
    /// Create a pending handle for a job submitted now.
    pub fn new(
        backend: impl Into<String>,
        job_id: JobId,
        status_path: impl Into<String>,
        config: BackendConfig,
        kernels: Vec<String>,
        initial_poll_delay: Duration,
    ) -> Self {
        Self {
            backend: backend.into(),
            job_id,
            status_path: status_path.into(),
            config,
            kernels,
            initial_poll_delay,
            submitted_at: Utc::now(),
            outcome: OnceLock::new(),
            poll_lock: Mutex::new(()),
        }
    }

    /// Registry name of the backend the job was submitted to.
    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Backend-assigned job identifier.
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Status-check path, relative to the backend base URL.
    pub fn status_path(&self) -> &str {
        &self.status_path
    }

    /// Configuration needed to rebuild the server helper.
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Names of the submitted kernels, in submission order.
    pub fn kernel_names(&self) -> &[String] {
        &self.kernels
    }

    /// Wait before the first status check.
    pub fn initial_poll_delay(&self) -> Duration {
        self.initial_poll_delay
    }

    /// When the job was accepted.
    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    /// Current phase: `Polling` until an outcome is stored.
    pub fn phase(&self) -> JobPhase {
        self.outcome().map_or(JobPhase::Polling, JobOutcome::phase)
    }

    /// Whether an outcome has been stored.
    pub fn is_resolved(&self) -> bool {
        self.outcome.get().is_some()
    }

    /// The stored outcome, if any.
    pub fn outcome(&self) -> Option<&JobOutcome> {
        self.outcome.get()
    }

    /// The stored result, if the job completed successfully.
    pub fn result(&self) -> Option<&SampleResult> {
        match self.outcome.get() {
            Some(JobOutcome::Done { result }) => Some(result),
            _ => None,
        }
    }

    /// The stored failure, if the job failed.
    pub fn failure(&self) -> Option<&JobFailure> {
        match self.outcome.get() {
            Some(JobOutcome::Failed { failure }) => Some(failure),
            _ => None,
        }
    }

    /// Store the outcome. Returns `false` if one was already stored, in
    /// which case the existing outcome is kept.
    pub(crate) fn resolve(&self, outcome: JobOutcome) -> bool {
        let stored = self.outcome.set(outcome).is_ok();
        if stored {
            debug!(job_id = %self.job_id, phase = %self.phase(), "Outcome stored");
        }
        stored
    }

    /// Serializes status checks for this handle.
    pub(crate) fn poll_lock(&self) -> &Mutex<()> {
        &self.poll_lock
    }

    fn to_record(&self) -> AsyncResultRecord {
        AsyncResultRecord {
            version: RECORD_VERSION,
            backend: self.backend.clone(),
            job_id: self.job_id.clone(),
            status_path: self.status_path.clone(),
            config: self.config.clone(),
            kernels: self.kernels.clone(),
            initial_poll_delay_ms: u64::try_from(self.initial_poll_delay.as_millis())
                .unwrap_or(u64::MAX),
            submitted_at: self.submitted_at,
            outcome: self.outcome.get().cloned(),
        }
    }

    fn from_record(record: AsyncResultRecord) -> Self {
        let outcome = OnceLock::new();
        if let Some(o) = record.outcome {
            let _ = outcome.set(o);
        }
        Self {
            backend: record.backend,
            job_id: record.job_id,
            status_path: record.status_path,
            config: record.config,
            kernels: record.kernels,
            initial_poll_delay: Duration::from_millis(record.initial_poll_delay_ms),
            submitted_at: record.submitted_at,
            outcome,
            poll_lock: Mutex::new(()),
        }
    }

    /// Serialize to a JSON value.
    pub fn to_json(&self) -> ServerResult<ServerMessage> {
        Ok(serde_json::to_value(self.to_record())?)
    }

    /// Deserialize from a JSON value, rejecting unknown record versions.
    pub fn from_json(value: ServerMessage) -> ServerResult<Self> {
        let version = value
            .get("version")
            .and_then(ServerMessage::as_u64)
            .ok_or_else(|| {
                ServerError::InvalidState("async result record has no 'version' field".into())
            })?;
        if version != u64::from(RECORD_VERSION) {
            return Err(ServerError::InvalidState(format!(
                "unsupported async result record version {version} (expected {RECORD_VERSION})"
            )));
        }
        let record: AsyncResultRecord = serde_json::from_value(value)?;
        Ok(Self::from_record(record))
    }

    /// Serialize to pretty-printed JSON bytes.
    pub fn to_bytes(&self) -> ServerResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(&self.to_record())?)
    }

    /// Deserialize from JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> ServerResult<Self> {
        let value: ServerMessage = serde_json::from_slice(bytes)?;
        Self::from_json(value)
    }

    /// Write the handle to `path`, creating parent directories.
    pub async fn save(&self, path: impl AsRef<Path>) -> ServerResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, self.to_bytes()?).await?;
        debug!(job_id = %self.job_id, ?path, "Saved async result");
        Ok(())
    }

    /// Read a handle from `path`.
    pub async fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let bytes = fs::read(path.as_ref()).await?;
        Self::from_bytes(&bytes)
    }
}

impl PartialEq for AsyncResult {
    fn eq(&self, other: &Self) -> bool {
        self.backend == other.backend
            && self.job_id == other.job_id
            && self.status_path == other.status_path
            && self.config == other.config
            && self.kernels == other.kernels
            && self.initial_poll_delay == other.initial_poll_delay
            && self.submitted_at == other.submitted_at
            && self.outcome.get() == other.outcome.get()
    }
}
