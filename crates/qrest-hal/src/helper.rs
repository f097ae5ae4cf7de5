//! The server helper contract.
//!
//! One [`ServerHelper`] implementation exists per remote backend. It knows
//! how to authenticate, build a job payload, find the job identifier in the
//! submission response, build the status-check path, decide completion,
//! and turn the vendor's result encoding into a [`SampleResult`]. The
//! [`JobDriver`](crate::driver::JobDriver) does all network I/O for job
//! submission and polling; helpers only build and interpret messages
//! (login exchanges excepted).
//!
//! ```text
//!   initialize() ──→ create_job() ──→ extract_job_id() ──→ status_path()
//!                                                             │
//!        process_results() ←── job_is_done() == true ←────────┘
//! ```
//!
//! | Method | Kind | Required |
//! |--------|------|----------|
//! | `name()` | sync | yes |
//! | `initialize()` | async | yes |
//! | `base_url()` | sync | yes |
//! | `get_headers()` | sync | yes |
//! | `create_job()` | sync | yes |
//! | `extract_job_id()` | sync | yes |
//! | `status_path()` | sync | yes |
//! | `status_path_from_response()` | sync | provided |
//! | `job_is_done()` | sync | yes |
//! | `results_path()` | sync | provided (`None`) |
//! | `process_results()` | sync | yes |
//! | `next_polling_interval()` | sync | yes |
//! | `refresh_tokens()` | async | provided (no-op) |
//! | `persisted_config()` | sync | yes |

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::BackendConfig;
use crate::error::ServerResult;
use crate::job::{KernelExecution, ServerJobPayload};
use crate::message::{RestHeaders, ServerMessage};
use crate::result::SampleResult;
use crate::transport::RestClient;

/// Smallest polling interval the driver will honour.
pub const MIN_POLLING_INTERVAL: Duration = Duration::from_millis(10);

/// Per-backend implementation of the job submission contract.
///
/// # Contract
///
/// - `initialize()` fails closed: a required key absent from both the
///   configuration and the environment is a `MissingConfiguration` error.
///   If the helper logs in eagerly, a login failure fails initialization.
/// - `get_headers()` reflects the current token; it never emits an empty
///   value for a header it sets.
/// - `create_job()` is deterministic for identical inputs apart from the
///   headers.
/// - `job_is_done()` is a pure function of its input. It returns `true`
///   only on unambiguous success, fails with `JobExecutionFailed` on
///   unambiguous failure, and returns `false` otherwise.
/// - `process_results()` never returns a silently empty result for a
///   response it could not parse.
/// - `next_polling_interval()` is strictly positive.
#[async_trait]
pub trait ServerHelper: Send + Sync {
    /// Registry key of this backend.
    fn name(&self) -> &str;

    /// Validate and normalize the configuration, resolving secrets from the
    /// environment where absent. `transport` is kept for login exchanges.
    async fn initialize(
        &mut self,
        config: BackendConfig,
        transport: Arc<dyn RestClient>,
    ) -> ServerResult<()>;

    /// Base URL all paths returned by this helper are relative to.
    fn base_url(&self) -> &str;

    /// Request headers for the current configuration and token.
    fn get_headers(&self) -> RestHeaders;

    /// Build one submission request for all `executions`.
    fn create_job(&self, executions: &[KernelExecution]) -> ServerResult<ServerJobPayload>;

    /// Read the job identifier from a submission response.
    fn extract_job_id(&self, response: &ServerMessage) -> ServerResult<String>;

    /// Status-check path for a bare job identifier.
    fn status_path(&self, job_id: &str) -> String;

    /// Status-check path derived from a submission response.
    fn status_path_from_response(&self, response: &ServerMessage) -> ServerResult<String> {
        let job_id = self.extract_job_id(response)?;
        Ok(self.status_path(&job_id))
    }

    /// Decide whether a status response describes a finished job.
    fn job_is_done(&self, response: &ServerMessage) -> ServerResult<bool>;

    /// Path of a separate results endpoint, for backends that do not embed
    /// results in the status response.
    fn results_path(&self, _job_id: &str) -> Option<String> {
        None
    }

    /// Normalize a completed job's response into a [`SampleResult`].
    fn process_results(&self, response: &ServerMessage, job_id: &str)
    -> ServerResult<SampleResult>;

    /// Wait before the next status check.
    fn next_polling_interval(&self, last_response: &ServerMessage) -> Duration;

    /// Exchange long-lived credentials for a fresh token.
    async fn refresh_tokens(&self, _force: bool) -> ServerResult<()> {
        Ok(())
    }

    /// Configuration subset stored in an async result so a later process can
    /// rebuild this helper. Secrets and runtime-derived values are excluded.
    fn persisted_config(&self) -> BackendConfig;
}
