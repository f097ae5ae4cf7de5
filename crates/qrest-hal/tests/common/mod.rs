//! Shared fixtures: a minimal backend registered as "X".
//!
//! Wire protocol of the fake:
//! - `POST /jobs` with `{"circuits": [...], "names": [...]}` answers `{"id": ...}`
//! - `GET /jobs/{id}` answers `{"status": ..., "status_code": ...}`
//! - a finished response may carry `"counts": {"00": n, ...}`

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use qrest_hal::{
    BackendConfig, BackendRegistry, Counts, ExecutionCounts, JobDriver, KernelExecution,
    MessageExt, MockTransport, RestClient, RestHeaders, SampleResult, ServerError, ServerHelper,
    ServerJobPayload, ServerMessage, ServerResult,
};

pub const BACKEND: &str = "X";
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Calls observed by `process_results`: (job id, response).
pub type ProcessCalls = Arc<Mutex<Vec<(String, ServerMessage)>>>;

pub struct FakeHelper {
    config: BackendConfig,
    base_url: String,
    api_key: String,
    calls: ProcessCalls,
}

impl FakeHelper {
    pub fn new(calls: ProcessCalls) -> Self {
        Self {
            config: BackendConfig::new(),
            base_url: String::new(),
            api_key: String::new(),
            calls,
        }
    }
}

#[async_trait]
impl ServerHelper for FakeHelper {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn initialize(
        &mut self,
        config: BackendConfig,
        _transport: Arc<dyn RestClient>,
    ) -> ServerResult<()> {
        self.base_url = config.require("base_url")?.to_string();
        self.api_key = config.value_or("api_key", "");
        self.config = config;
        Ok(())
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get_headers(&self) -> RestHeaders {
        let mut headers = RestHeaders::new();
        headers.insert("Content-Type".into(), "application/json".into());
        headers.insert("User-Agent".into(), "qrest-tests".into());
        if !self.api_key.is_empty() {
            headers.insert("x-api-key".into(), self.api_key.clone());
        }
        headers
    }

    fn create_job(&self, executions: &[KernelExecution]) -> ServerResult<ServerJobPayload> {
        let circuits: Vec<_> = executions.iter().map(|e| e.code.clone()).collect();
        let names: Vec<_> = executions.iter().map(|e| e.name.clone()).collect();
        Ok(ServerJobPayload {
            path: "/jobs".into(),
            headers: self.get_headers(),
            body: json!({ "circuits": circuits, "names": names }),
        })
    }

    fn extract_job_id(&self, response: &ServerMessage) -> ServerResult<String> {
        Ok(response.str_field("id")?.to_string())
    }

    fn status_path(&self, job_id: &str) -> String {
        format!("/jobs/{job_id}")
    }

    fn job_is_done(&self, response: &ServerMessage) -> ServerResult<bool> {
        if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
            return Err(ServerError::job_failed(None, error.to_string()));
        }
        if response.str_field("status")? != "finished" {
            return Ok(false);
        }
        match response.i64_field("status_code")? {
            0 => Ok(true),
            code => Err(ServerError::job_failed(
                Some(code),
                response
                    .opt_str_field("message")?
                    .unwrap_or("job finished with an error"),
            )),
        }
    }

    fn process_results(
        &self,
        response: &ServerMessage,
        job_id: &str,
    ) -> ServerResult<SampleResult> {
        self.calls
            .lock()
            .unwrap()
            .push((job_id.to_string(), response.clone()));

        let mut counts = Counts::new();
        if let Some(raw) = response.get("counts") {
            let raw = raw
                .as_object()
                .ok_or_else(|| ServerError::malformed("'counts' is not an object", response))?;
            for (bitstring, n) in raw {
                let n = n
                    .as_u64()
                    .ok_or_else(|| ServerError::malformed("count is not an integer", response))?;
                counts.insert(bitstring.as_str(), n);
            }
        }
        Ok(SampleResult::new(vec![ExecutionCounts {
            name: job_id.to_string(),
            counts,
        }]))
    }

    fn next_polling_interval(&self, _last_response: &ServerMessage) -> Duration {
        POLL_INTERVAL
    }

    fn persisted_config(&self) -> BackendConfig {
        self.config.without(&["api_key"])
    }
}

pub struct Harness {
    pub driver: JobDriver,
    pub transport: Arc<MockTransport>,
    pub calls: ProcessCalls,
}

pub fn harness() -> Harness {
    let calls: ProcessCalls = Arc::default();
    let mut registry = BackendRegistry::new();
    let factory_calls = Arc::clone(&calls);
    registry.register(BACKEND, move || {
        Box::new(FakeHelper::new(Arc::clone(&factory_calls)))
    });

    let transport = Arc::new(MockTransport::new());
    let driver = JobDriver::new(Arc::new(registry), transport.clone());
    Harness {
        driver,
        transport,
        calls,
    }
}

pub fn config() -> BackendConfig {
    BackendConfig::new()
        .with("base_url", "https://h")
        .with("api_key", "k")
}

pub fn two_circuits() -> Vec<KernelExecution> {
    vec![
        KernelExecution::new("bell", "OPENQASM 2.0; // bell"),
        KernelExecution::new("ghz", "OPENQASM 2.0; // ghz"),
    ]
}
