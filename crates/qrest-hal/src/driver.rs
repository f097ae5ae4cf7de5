//! Job lifecycle driver.
//!
//! [`JobDriver`] performs all submission and polling I/O. It moves a job
//! through `Created → Submitted → Polling → Done | Failed`, asking the
//! server helper to build and interpret every message.
//!
//! # Example
//!
//! ```ignore
//! let driver = JobDriver::new(Arc::new(registry), Arc::new(HttpClient::new()?));
//! let helper = driver.connect("fermioniq", config).await?;
//! let handle = driver.submit(helper.as_ref(), &executions).await?;
//! handle.save("job.json").await?;
//!
//! // later, possibly in another process
//! let handle = AsyncResult::load("job.json").await?;
//! let helper = driver.resume(&handle, &credentials).await?;
//! let result = driver.wait(helper.as_ref(), &handle).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::async_result::{AsyncResult, JobOutcome};
use crate::config::BackendConfig;
use crate::error::{JobFailure, ServerError, ServerResult};
use crate::helper::{MIN_POLLING_INTERVAL, ServerHelper};
use crate::job::{JobId, JobPhase, KernelExecution};
use crate::message::ServerMessage;
use crate::registry::BackendRegistry;
use crate::result::SampleResult;
use crate::transport::RestClient;

/// Result of a single status check.
#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    /// Not finished; check again after the given delay.
    Pending(Duration),
    /// Finished successfully.
    Done(SampleResult),
}

impl PollState {
    /// Whether the job finished.
    pub fn is_done(&self) -> bool {
        matches!(self, PollState::Done(_))
    }
}

/// Submits jobs and polls them to completion.
#[derive(Clone)]
pub struct JobDriver {
    registry: Arc<BackendRegistry>,
    transport: Arc<dyn RestClient>,
}

impl JobDriver {
    /// Create a driver over a registry and transport.
    pub fn new(registry: Arc<BackendRegistry>, transport: Arc<dyn RestClient>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    /// The backend registry.
    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// The transport shared with helpers.
    pub fn transport(&self) -> Arc<dyn RestClient> {
        Arc::clone(&self.transport)
    }

    /// Create and initialize the helper registered under `backend`.
    #[instrument(skip(self, config))]
    pub async fn connect(
        &self,
        backend: &str,
        config: BackendConfig,
    ) -> ServerResult<Arc<dyn ServerHelper>> {
        let mut helper = self.registry.create(backend)?;
        helper.initialize(config, Arc::clone(&self.transport)).await?;
        info!("Backend '{}' initialized", backend);
        Ok(Arc::from(helper))
    }

    /// Rebuild the helper for a stored handle.
    ///
    /// The handle's persisted configuration is overlaid with `overrides`,
    /// typically credentials that are never persisted.
    #[instrument(skip_all, fields(backend = handle.backend(), job_id = %handle.job_id()))]
    pub async fn resume(
        &self,
        handle: &AsyncResult,
        overrides: &BackendConfig,
    ) -> ServerResult<Arc<dyn ServerHelper>> {
        let config = handle.config().clone().merged(overrides);
        debug!(phase = %handle.phase(), "Resuming job");
        self.connect(handle.backend(), config).await
    }

    /// Submit all `executions` as one job.
    ///
    /// The returned handle is in `Polling`; no status check has been made.
    #[instrument(skip_all, fields(backend = helper.name(), circuits = executions.len()))]
    pub async fn submit(
        &self,
        helper: &dyn ServerHelper,
        executions: &[KernelExecution],
    ) -> ServerResult<AsyncResult> {
        if executions.is_empty() {
            return Err(ServerError::InvalidState(
                "no kernel executions to submit".into(),
            ));
        }

        let payload = helper.create_job(executions)?;
        debug!(phase = %JobPhase::Created, path = %payload.path, "Job payload built");

        let response = self
            .transport
            .post(
                helper.base_url(),
                &payload.path,
                &payload.body,
                &payload.headers,
            )
            .await
            .inspect_err(|e| warn!(phase = %JobPhase::Failed, "Submission failed: {}", e))?;

        let job_id = helper.extract_job_id(&response)?;
        info!(job_id = %job_id, phase = %JobPhase::Submitted, "Job submitted");

        let status_path = helper.status_path(&job_id);
        let delay = clamp_interval(helper.next_polling_interval(&response));
        let handle = AsyncResult::new(
            helper.name(),
            JobId::new(job_id),
            status_path,
            helper.persisted_config(),
            executions.iter().map(|e| e.name.clone()).collect(),
            delay,
        );

        info!(
            job_id = %handle.job_id(),
            phase = %JobPhase::Polling,
            "First status check in {:?}",
            delay
        );
        Ok(handle)
    }

    /// Perform exactly one status check without sleeping.
    ///
    /// A resolved handle returns its stored outcome without I/O.
    pub async fn poll_once(
        &self,
        helper: &dyn ServerHelper,
        handle: &AsyncResult,
    ) -> ServerResult<PollState> {
        if let Some(outcome) = handle.outcome() {
            return outcome.to_result().map(PollState::Done);
        }
        check_backend(helper, handle)?;

        let _guard = handle.poll_lock().lock().await;
        if let Some(outcome) = handle.outcome() {
            return outcome.to_result().map(PollState::Done);
        }
        self.status_check(helper, handle).await
    }

    /// Poll until the job reaches a terminal state.
    ///
    /// There is no iteration cap; use [`wait_with_timeout`](Self::wait_with_timeout)
    /// or drop the future to stop polling.
    pub async fn wait(
        &self,
        helper: &dyn ServerHelper,
        handle: &AsyncResult,
    ) -> ServerResult<SampleResult> {
        if let Some(outcome) = handle.outcome() {
            return outcome.to_result();
        }
        check_backend(helper, handle)?;

        let _guard = handle.poll_lock().lock().await;
        let mut delay = handle.initial_poll_delay();
        loop {
            if let Some(outcome) = handle.outcome() {
                return outcome.to_result();
            }
            tokio::time::sleep(delay).await;
            match self.status_check(helper, handle).await? {
                PollState::Pending(next) => delay = next,
                PollState::Done(result) => return Ok(result),
            }
        }
    }

    /// [`wait`](Self::wait) with a deadline. Returns `Ok(None)` on timeout,
    /// leaving the handle pending.
    pub async fn wait_with_timeout(
        &self,
        helper: &dyn ServerHelper,
        handle: &AsyncResult,
        timeout: Duration,
    ) -> ServerResult<Option<SampleResult>> {
        match tokio::time::timeout(timeout, self.wait(helper, handle)).await {
            Ok(result) => result.map(Some),
            Err(_) => {
                info!(job_id = %handle.job_id(), "Stopped waiting after {:?}", timeout);
                Ok(None)
            }
        }
    }

    /// Submit and wait.
    pub async fn execute(
        &self,
        helper: &dyn ServerHelper,
        executions: &[KernelExecution],
    ) -> ServerResult<SampleResult> {
        let handle = self.submit(helper, executions).await?;
        self.wait(helper, &handle).await
    }

    /// Wait on a dedicated task so jobs poll independently.
    pub fn spawn_wait(
        &self,
        helper: Arc<dyn ServerHelper>,
        handle: Arc<AsyncResult>,
    ) -> JoinHandle<ServerResult<SampleResult>> {
        let driver = self.clone();
        tokio::spawn(async move { driver.wait(helper.as_ref(), &handle).await })
    }

    /// One GET of the status path. The caller holds the handle's poll lock.
    #[instrument(skip_all, fields(backend = helper.name(), job_id = %handle.job_id()))]
    async fn status_check(
        &self,
        helper: &dyn ServerHelper,
        handle: &AsyncResult,
    ) -> ServerResult<PollState> {
        let response = self.authorized_get(helper, handle.status_path()).await?;

        let done = match helper.job_is_done(&response) {
            Ok(done) => done,
            Err(e) => return Err(fail(handle, e)),
        };

        if !done {
            let next = clamp_interval(helper.next_polling_interval(&response));
            debug!(phase = %JobPhase::Polling, "Not finished, next check in {:?}", next);
            return Ok(PollState::Pending(next));
        }

        let job_id = handle.job_id().as_str();
        let results = match helper.results_path(job_id) {
            Some(path) => {
                debug!(path = %path, "Fetching results");
                self.authorized_get(helper, &path).await?
            }
            None => response,
        };

        match helper.process_results(&results, job_id) {
            Ok(mut result) => {
                result.name_by_kernels(handle.kernel_names());
                handle.resolve(JobOutcome::Done {
                    result: result.clone(),
                });
                info!(phase = %JobPhase::Done, shots = result.total_shots(), "Job finished");
                Ok(PollState::Done(result))
            }
            Err(e) => Err(fail(handle, e)),
        }
    }

    /// GET with the helper's headers; an HTTP 401 forces one token refresh
    /// and one repeat with the new headers.
    async fn authorized_get(
        &self,
        helper: &dyn ServerHelper,
        path: &str,
    ) -> ServerResult<ServerMessage> {
        match self
            .transport
            .get(helper.base_url(), path, &helper.get_headers())
            .await
        {
            Err(ServerError::Transport {
                status: Some(401), ..
            }) => {
                info!("Token rejected, refreshing before retrying {}", path);
                helper.refresh_tokens(true).await?;
                self.transport
                    .get(helper.base_url(), path, &helper.get_headers())
                    .await
            }
            other => other,
        }
    }
}

impl std::fmt::Debug for JobDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobDriver")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

fn check_backend(helper: &dyn ServerHelper, handle: &AsyncResult) -> ServerResult<()> {
    if helper.name() == handle.backend() {
        Ok(())
    } else {
        Err(ServerError::InvalidState(format!(
            "job '{}' belongs to backend '{}', not '{}'",
            handle.job_id(),
            handle.backend(),
            helper.name()
        )))
    }
}

/// Record a terminal failure on the handle and hand the error back.
fn fail(handle: &AsyncResult, error: ServerError) -> ServerError {
    warn!(
        job_id = %handle.job_id(),
        phase = %JobPhase::Failed,
        "Job failed: {}",
        error
    );
    handle.resolve(JobOutcome::Failed {
        failure: JobFailure::from(&error),
    });
    error
}

fn clamp_interval(interval: Duration) -> Duration {
    interval.max(MIN_POLLING_INTERVAL)
}
