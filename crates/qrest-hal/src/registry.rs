//! Backend registry.
//!
//! The [`BackendRegistry`] maps backend names to zero-argument factories
//! producing uninitialized [`ServerHelper`]s. Adapter crates expose a
//! `register(&mut BackendRegistry)` function; callers build one registry
//! and hand it to the driver.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{ServerError, ServerResult};
use crate::helper::ServerHelper;

/// Factory function type for server helpers.
type HelperFactory = Box<dyn Fn() -> Box<dyn ServerHelper> + Send + Sync>;

/// Name-to-factory map for server helpers.
pub struct BackendRegistry {
    factories: FxHashMap<String, HelperFactory>,
}

impl BackendRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: FxHashMap::default(),
        }
    }

    /// Register a factory. Registering an existing name replaces it.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn ServerHelper> + Send + Sync + 'static,
    ) {
        let name = name.into();
        debug!("Registering backend: {}", name);
        self.factories.insert(name, Box::new(factory));
    }

    /// Register a helper type constructible with `Default`.
    pub fn register_default<H>(&mut self, name: impl Into<String>)
    where
        H: ServerHelper + Default + 'static,
    {
        self.register(name, || Box::new(H::default()));
    }

    /// Create a new, uninitialized helper.
    pub fn create(&self, name: &str) -> ServerResult<Box<dyn ServerHelper>> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| ServerError::UnknownBackend(name.to_string()))
    }

    /// List registered backend names, sorted.
    pub fn available_backends(&self) -> Vec<String> {
        let mut names: Vec<_> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a backend is registered.
    pub fn has_backend(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Number of registered backends.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.available_backends())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::config::BackendConfig;
    use crate::job::{KernelExecution, ServerJobPayload};
    use crate::message::{RestHeaders, ServerMessage};
    use crate::result::SampleResult;
    use crate::transport::RestClient;

    struct NamedHelper(&'static str);

    #[async_trait]
    impl ServerHelper for NamedHelper {
        fn name(&self) -> &str {
            self.0
        }

        async fn initialize(
            &mut self,
            _config: BackendConfig,
            _transport: Arc<dyn RestClient>,
        ) -> ServerResult<()> {
            Ok(())
        }

        fn base_url(&self) -> &str {
            "https://h"
        }

        fn get_headers(&self) -> RestHeaders {
            RestHeaders::new()
        }

        fn create_job(&self, _executions: &[KernelExecution]) -> ServerResult<ServerJobPayload> {
            Err(ServerError::InvalidState("test only".into()))
        }

        fn extract_job_id(&self, _response: &ServerMessage) -> ServerResult<String> {
            Err(ServerError::InvalidState("test only".into()))
        }

        fn status_path(&self, job_id: &str) -> String {
            format!("/jobs/{job_id}")
        }

        fn job_is_done(&self, _response: &ServerMessage) -> ServerResult<bool> {
            Ok(false)
        }

        fn process_results(
            &self,
            _response: &ServerMessage,
            _job_id: &str,
        ) -> ServerResult<SampleResult> {
            Ok(SampleResult::default())
        }

        fn next_polling_interval(&self, _last_response: &ServerMessage) -> Duration {
            Duration::from_secs(1)
        }

        fn persisted_config(&self) -> BackendConfig {
            BackendConfig::new()
        }
    }

    #[test]
    fn test_empty_registry() {
        let registry = BackendRegistry::new();
        assert!(registry.available_backends().is_empty());
        assert!(!registry.has_backend("fermioniq"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_create_unknown_backend() {
        let registry = BackendRegistry::new();
        let err = registry.create("nonexistent").err().unwrap();
        assert!(matches!(err, ServerError::UnknownBackend(name) if name == "nonexistent"));
    }

    #[test]
    fn test_register_and_create() {
        let mut registry = BackendRegistry::new();
        registry.register("alpha", || Box::new(NamedHelper("alpha")));

        let helper = registry.create("alpha").unwrap();
        assert_eq!(helper.name(), "alpha");
    }

    #[test]
    fn test_reregistering_overwrites() {
        let mut registry = BackendRegistry::new();
        registry.register("x", || Box::new(NamedHelper("first")));
        registry.register("x", || Box::new(NamedHelper("second")));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.create("x").unwrap().name(), "second");
    }

    #[test]
    fn test_available_backends_sorted() {
        let mut registry = BackendRegistry::new();
        registry.register("zebra", || Box::new(NamedHelper("zebra")));
        registry.register("alpha", || Box::new(NamedHelper("alpha")));

        assert_eq!(registry.available_backends(), vec!["alpha", "zebra"]);
    }
}
