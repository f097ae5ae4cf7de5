//! qrest Adapter for the Fermioniq Emulator
//!
//! This crate provides a server helper for Fermioniq's tensor-network
//! quantum emulator, reached through its REST API.
//!
//! # Authentication
//!
//! Fermioniq issues an access-token id and secret. Pass them as
//! `access_token_id` / `access_token_secret` in the backend configuration, or
//! set the environment variables:
//!
//! ```bash
//! export FERMIONIQ_ACCESS_TOKEN_ID="..."
//! export FERMIONIQ_ACCESS_TOKEN_SECRET="..."
//! ```
//!
//! The helper exchanges them for a JWT during `initialize`. An optional
//! Azure functions key is read from `api_key` or `FERMIONIQ_API_KEY`.
//!
//! # Configuration
//!
//! | Key | Default | Meaning |
//! |-----|---------|---------|
//! | `base_url` | production API | API endpoint |
//! | `remote_config` | | Named emulator configuration |
//! | `noise_model` | | Named noise model |
//! | `bond_dim` | | Maximum MPS bond dimension (positive integer) |
//! | `project_id` | | Project to bill |
//! | `user_agent` | `qrest/<version>` | `User-Agent` header |
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use qrest_hal::{BackendConfig, BackendRegistry, HttpClient, JobDriver, KernelExecution};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut registry = BackendRegistry::new();
//!     qrest_adapter_fermioniq::register(&mut registry);
//!
//!     let driver = JobDriver::new(Arc::new(registry), Arc::new(HttpClient::new()?));
//!     let config = BackendConfig::new().with("bond_dim", "64");
//!     let helper = driver.connect("fermioniq", config).await?;
//!
//!     let ghz = KernelExecution::new("ghz", std::fs::read_to_string("ghz.qasm")?);
//!     let result = driver.execute(helper.as_ref(), &[ghz]).await?;
//!     println!("{:?}", result.counts());
//!     Ok(())
//! }
//! ```

mod api;
mod error;
mod helper;

pub use api::DEFAULT_BASE_URL;
pub use error::{FermioniqError, FermioniqResult};
pub use helper::{
    BACKEND_NAME, ENV_ACCESS_TOKEN_ID, ENV_ACCESS_TOKEN_SECRET, ENV_API_KEY,
    FermioniqServerHelper,
};

// Re-export common types for convenience.
pub use qrest_hal::{BackendConfig, BackendRegistry, ServerHelper};

/// Register the Fermioniq helper under [`BACKEND_NAME`].
pub fn register(registry: &mut BackendRegistry) {
    registry.register_default::<FermioniqServerHelper>(BACKEND_NAME);
}
