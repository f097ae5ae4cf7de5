//! qrest Hardware Abstraction Layer
//!
//! This crate provides the client-side framework for submitting compiled
//! quantum circuits to remote execution services over REST and retrieving
//! their results asynchronously.
//!
//! # Overview
//!
//! - A [`ServerHelper`] trait, implemented once per backend, that builds and
//!   interprets the backend's wire messages
//! - A [`BackendRegistry`] mapping backend names to helper factories
//! - A [`JobDriver`] that owns all submission and polling I/O
//! - A serializable [`AsyncResult`] handle that survives process restarts
//! - A [`TokenCache`] for backends that exchange credentials for a bearer
//!   token
//! - A [`RestClient`] transport seam with a reqwest client ([`HttpClient`])
//!   and a scripted [`MockTransport`]
//!
//! # Supported Backends
//!
//! | Backend | Crate | Authentication |
//! |---------|-------|----------------|
//! | Fermioniq | `qrest-adapter-fermioniq` | `FERMIONIQ_ACCESS_TOKEN_ID` / `FERMIONIQ_ACCESS_TOKEN_SECRET` |
//!
//! # Example: Submitting and Resuming a Job
//!
//! ```ignore
//! use std::sync::Arc;
//! use qrest_hal::{AsyncResult, BackendConfig, BackendRegistry, HttpClient, JobDriver, KernelExecution};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut registry = BackendRegistry::new();
//!     qrest_adapter_fermioniq::register(&mut registry);
//!
//!     let driver = JobDriver::new(Arc::new(registry), Arc::new(HttpClient::new()?));
//!     let helper = driver.connect("fermioniq", BackendConfig::new()).await?;
//!
//!     let bell = KernelExecution::new("bell", std::fs::read_to_string("bell.qasm")?);
//!     let handle = driver.submit(helper.as_ref(), &[bell]).await?;
//!     handle.save("bell-job.json").await?;
//!
//!     // Possibly in another process:
//!     let handle = AsyncResult::load("bell-job.json").await?;
//!     let helper = driver.resume(&handle, &BackendConfig::new()).await?;
//!     let result = driver.wait(helper.as_ref(), &handle).await?;
//!
//!     if let Some((bitstring, count)) = result.counts().and_then(|c| c.most_frequent()) {
//!         println!("Most frequent: {} ({} times)", bitstring, count);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Implementing a Backend
//!
//! ```ignore
//! use qrest_hal::{
//!     BackendConfig, KernelExecution, MessageExt, RestClient, RestHeaders, SampleResult,
//!     ServerHelper, ServerJobPayload, ServerMessage, ServerResult,
//! };
//! use async_trait::async_trait;
//!
//! #[async_trait]
//! impl ServerHelper for MyHelper {
//!     fn name(&self) -> &str { "my_backend" }
//!
//!     fn job_is_done(&self, response: &ServerMessage) -> ServerResult<bool> {
//!         Ok(response.str_field("status")? == "completed")
//!     }
//!
//!     // ...
//! }
//! ```

pub mod async_result;
pub mod auth;
pub mod config;
pub mod driver;
pub mod error;
pub mod helper;
pub mod job;
pub mod message;
pub mod registry;
pub mod result;
pub mod transport;

pub use async_result::{AsyncResult, JobOutcome, RECORD_VERSION};
pub use auth::{AuthToken, TokenCache};
pub use config::BackendConfig;
pub use driver::{JobDriver, PollState};
pub use error::{FailureKind, JobFailure, ServerError, ServerResult};
pub use helper::{MIN_POLLING_INTERVAL, ServerHelper};
pub use job::{JobId, JobPhase, KernelExecution, ServerJobPayload};
pub use message::{MessageExt, RestHeaders, ServerMessage};
pub use registry::BackendRegistry;
pub use result::{Counts, ExecutionCounts, SampleResult};
pub use transport::{HttpClient, Method, MockTransport, RecordedRequest, RestClient, join_url};
