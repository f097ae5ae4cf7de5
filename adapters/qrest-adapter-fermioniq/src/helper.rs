//! Fermioniq server helper.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use qrest_hal::{
    AuthToken, BackendConfig, Counts, ExecutionCounts, KernelExecution, RestClient, RestHeaders,
    SampleResult, ServerError, ServerHelper, ServerJobPayload, ServerMessage, ServerResult,
    TokenCache,
};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use crate::api::{
    self, DEFAULT_BASE_URL, EmulatorConfig, JOBS_PATH, JobRequest, JobStatusResponse, LOGIN_PATH,
    LoginRequest, ResultsResponse,
};
use crate::error::{FermioniqError, FermioniqResult};

/// Registry name.
pub const BACKEND_NAME: &str = "fermioniq";

/// Environment variable holding the optional Azure functions key.
pub const ENV_API_KEY: &str = "FERMIONIQ_API_KEY";
/// Environment variable holding the access-token id, used when
/// `access_token_id` is not configured.
pub const ENV_ACCESS_TOKEN_ID: &str = "FERMIONIQ_ACCESS_TOKEN_ID";
/// Environment variable holding the access-token secret, used when
/// `access_token_secret` is not configured.
pub const ENV_ACCESS_TOKEN_SECRET: &str = "FERMIONIQ_ACCESS_TOKEN_SECRET";

/// Emulator jobs never finish in under a second.
const POLLING_INTERVAL: Duration = Duration::from_secs(1);

/// Keys whose values never leave the process.
const SECRET_KEYS: &[&str] = &["api_key", "access_token_id", "access_token_secret"];

const DEFAULT_USER_AGENT: &str = concat!("qrest/", env!("CARGO_PKG_VERSION"));

/// Validated Fermioniq settings.
struct Settings {
    base_url: String,
    api_key: String,
    access_token_id: String,
    access_token_secret: String,
    user_agent: String,
    remote_config: Option<String>,
    noise_model: Option<String>,
    project_id: Option<String>,
    bond_dim: Option<u32>,
    persisted: BackendConfig,
}

impl Settings {
    fn from_config(config: &BackendConfig) -> ServerResult<Self> {
        let access_token_id = config.resolve("access_token_id", ENV_ACCESS_TOKEN_ID)?;
        let access_token_secret = config.resolve("access_token_secret", ENV_ACCESS_TOKEN_SECRET)?;

        let bond_dim = config
            .get("bond_dim")
            .map(|raw| {
                raw.trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|d| *d > 0)
                    .ok_or_else(|| FermioniqError::InvalidBondDim(raw.to_string()))
            })
            .transpose()?;

        let base_url = config
            .value_or("base_url", DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            api_key: config
                .resolve_optional("api_key", ENV_API_KEY)
                .unwrap_or_default(),
            access_token_id,
            access_token_secret,
            user_agent: config
                .get("user_agent")
                .filter(|v| !v.is_empty())
                .unwrap_or(DEFAULT_USER_AGENT)
                .to_string(),
            remote_config: config.get("remote_config").map(str::to_string),
            noise_model: config.get("noise_model").map(str::to_string),
            project_id: config.get("project_id").map(str::to_string),
            bond_dim,
            persisted: config.without(SECRET_KEYS).merged(
                &BackendConfig::new().with("base_url", base_url.as_str()),
            ),
            base_url,
        })
    }

    /// Headers that do not depend on the login state.
    fn base_headers(&self) -> RestHeaders {
        let mut headers = RestHeaders::new();
        if !self.api_key.is_empty() {
            headers.insert("x-functions-key".into(), self.api_key.clone());
        }
        headers.insert("Content-Type".into(), "application/json".into());
        headers.insert("User-Agent".into(), self.user_agent.clone());
        headers
    }
}

/// Server helper for the Fermioniq tensor-network emulator.
///
/// `initialize` logs in eagerly; the resulting JWT and user id are held in
/// a [`TokenCache`] and every header set reflects the current token.
///
/// All circuits passed to one `create_job` call are submitted as a single
/// Fermioniq job, and results come back per circuit in submission order.
#[derive(Default)]
pub struct FermioniqServerHelper {
    settings: Option<Settings>,
    transport: Option<Arc<dyn RestClient>>,
    tokens: TokenCache,
}

impl std::fmt::Debug for FermioniqServerHelper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FermioniqServerHelper")
            .field("base_url", &self.base_url())
            .field("initialized", &self.settings.is_some())
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl FermioniqServerHelper {
    /// Create an uninitialized helper.
    pub fn new() -> Self {
        Self::default()
    }

    /// The user id from the last login, if any.
    pub fn user_id(&self) -> Option<String> {
        self.tokens.user_id()
    }

    fn settings(&self) -> FermioniqResult<&Settings> {
        self.settings.as_ref().ok_or(FermioniqError::NotInitialized)
    }

    /// Exchange the access token for a JWT.
    #[instrument(skip(self))]
    async fn login(&self) -> ServerResult<AuthToken> {
        let settings = self.settings()?;
        let transport = self
            .transport
            .as_ref()
            .ok_or(FermioniqError::NotInitialized)?;

        let body = serde_json::to_value(LoginRequest {
            access_token_id: &settings.access_token_id,
            access_token_secret: &settings.access_token_secret,
        })?;
        debug!("Logging in to Fermioniq at {}", settings.base_url);

        let response = transport
            .post(
                &settings.base_url,
                LOGIN_PATH,
                &body,
                &settings.base_headers(),
            )
            .await?;
        let token = AuthToken::from_login_response(&response, "jwt_token", Some("user_id"))?;

        debug!("Fermioniq login successful");
        Ok(token)
    }
}

fn parse<T: DeserializeOwned>(response: &ServerMessage, what: &str) -> FermioniqResult<T> {
    serde_json::from_value(response.clone())
        .map_err(|e| FermioniqError::unexpected(format!("invalid {what}: {e}"), response))
}

#[async_trait]
impl ServerHelper for FermioniqServerHelper {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    async fn initialize(
        &mut self,
        config: BackendConfig,
        transport: Arc<dyn RestClient>,
    ) -> ServerResult<()> {
        info!("Initializing Fermioniq backend");
        let settings = Settings::from_config(&config)?;
        debug!(config = ?settings.persisted, "Fermioniq configuration");

        self.settings = Some(settings);
        self.transport = Some(transport);
        self.tokens.clear();
        self.refresh_tokens(true).await
    }

    fn base_url(&self) -> &str {
        self.settings
            .as_ref()
            .map_or(DEFAULT_BASE_URL, |s| s.base_url.as_str())
    }

    fn get_headers(&self) -> RestHeaders {
        let Some(settings) = self.settings.as_ref() else {
            return RestHeaders::new();
        };
        let mut headers = settings.base_headers();
        if let Some(token) = self.tokens.token().filter(|t| !t.is_empty()) {
            headers.insert("Authorization".into(), format!("Bearer {token}"));
        }
        headers
    }

    fn create_job(&self, executions: &[KernelExecution]) -> ServerResult<ServerJobPayload> {
        let settings = self.settings()?;
        let user_id = self.tokens.user_id().ok_or(FermioniqError::NotLoggedIn)?;

        let request = JobRequest {
            circuit: executions.iter().map(|e| e.code.clone()).collect(),
            circuit_names: executions.iter().map(|e| e.name.clone()).collect(),
            user_id,
            remote_config: settings.remote_config.clone(),
            noise_model: settings.noise_model.clone(),
            project_id: settings.project_id.clone(),
            emulator_config: settings.bond_dim.map(|bond_dim| EmulatorConfig {
                bond_dim: Some(bond_dim),
            }),
        };
        debug!("Fermioniq job with {} circuit(s)", request.circuit.len());

        Ok(ServerJobPayload {
            path: JOBS_PATH.to_string(),
            headers: self.get_headers(),
            body: serde_json::to_value(&request)?,
        })
    }

    fn extract_job_id(&self, response: &ServerMessage) -> ServerResult<String> {
        match response.get("id") {
            Some(ServerMessage::String(id)) if !id.is_empty() => Ok(id.clone()),
            _ => Err(ServerError::malformed(
                "submission response has no 'id' string",
                response,
            )),
        }
    }

    fn status_path(&self, job_id: &str) -> String {
        api::job_path(job_id)
    }

    fn job_is_done(&self, response: &ServerMessage) -> ServerResult<bool> {
        let status: JobStatusResponse = parse(response, "job status")?;

        if status.status == "finished" {
            return match status.status_code {
                Some(0) => Ok(true),
                Some(code) => Err(FermioniqError::JobFailed {
                    code: Some(code),
                    message: status
                        .status_message
                        .clone()
                        .or_else(|| status.error_message())
                        .unwrap_or_else(|| format!("job finished with status code {code}")),
                }
                .into()),
                None => Err(ServerError::malformed(
                    "finished job has no 'status_code'",
                    response,
                )),
            };
        }

        if let Some(message) = status.error_message() {
            return Err(FermioniqError::JobFailed {
                code: status.status_code,
                message,
            }
            .into());
        }

        Ok(false)
    }

    fn results_path(&self, job_id: &str) -> Option<String> {
        Some(api::results_path(job_id))
    }

    fn process_results(
        &self,
        response: &ServerMessage,
        job_id: &str,
    ) -> ServerResult<SampleResult> {
        let results: ResultsResponse = parse(response, "job results")?;
        if results.emulator_output.is_empty() {
            return Err(FermioniqError::unexpected("no emulator output", response).into());
        }

        let executions = results
            .emulator_output
            .into_iter()
            .enumerate()
            .map(|(i, output)| ExecutionCounts {
                name: output.circuit_name.unwrap_or_else(|| format!("circuit_{i}")),
                counts: output.output.samples.into_iter().collect::<Counts>(),
            })
            .collect::<Vec<_>>();

        debug!(
            "Processed {} circuit result(s) for job {}",
            executions.len(),
            job_id
        );
        Ok(SampleResult::new(executions))
    }

    fn next_polling_interval(&self, _last_response: &ServerMessage) -> Duration {
        POLLING_INTERVAL
    }

    async fn refresh_tokens(&self, force: bool) -> ServerResult<()> {
        self.tokens.refresh(force, || self.login()).await.map(|_| ())
    }

    fn persisted_config(&self) -> BackendConfig {
        self.settings
            .as_ref()
            .map(|s| s.persisted.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qrest_hal::{Method, MockTransport};
    use serde_json::json;

    fn config() -> BackendConfig {
        BackendConfig::new()
            .with("base_url", "https://fq.test")
            .with("access_token_id", "id-1")
            .with("access_token_secret", "secret-1")
    }

    fn mock_login(mock: &MockTransport) {
        mock.on_post(
            LOGIN_PATH,
            json!({"jwt_token": "jwt-1", "user_id": "user-1"}),
        );
    }

    async fn initialized(config: BackendConfig) -> (FermioniqServerHelper, Arc<MockTransport>) {
        let mock = Arc::new(MockTransport::new());
        mock_login(&mock);
        let mut helper = FermioniqServerHelper::new();
        helper.initialize(config, mock.clone()).await.unwrap();
        (helper, mock)
    }

    #[tokio::test]
    async fn test_initialize_logs_in() {
        let (helper, mock) = initialized(config()).await;

        let logins = mock.requests_to(Method::Post, LOGIN_PATH);
        assert_eq!(logins.len(), 1);
        assert_eq!(logins[0].url, "https://fq.test/api/login");
        assert_eq!(
            logins[0].body,
            json!({"access_token_id": "id-1", "access_token_secret": "secret-1"})
        );
        assert_eq!(helper.user_id().as_deref(), Some("user-1"));
    }

    #[tokio::test]
    async fn test_initialize_fails_on_login_failure() {
        let mock = Arc::new(MockTransport::new());
        mock.fail(
            Method::Post,
            LOGIN_PATH,
            ServerError::Transport {
                status: Some(401),
                message: "bad credentials".into(),
            },
        );
        let mut helper = FermioniqServerHelper::new();
        let err = helper.initialize(config(), mock).await.unwrap_err();
        assert!(matches!(err, ServerError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_initialize_rejects_login_without_user_id() {
        let mock = Arc::new(MockTransport::new());
        mock.on_post(LOGIN_PATH, json!({"jwt_token": "jwt-1"}));
        let mut helper = FermioniqServerHelper::new();
        let err = helper.initialize(config(), mock).await.unwrap_err();
        assert!(matches!(err, ServerError::Authentication(msg) if msg.contains("user_id")));
    }

    #[tokio::test]
    async fn test_invalid_bond_dim_fails_before_login() {
        let mock = Arc::new(MockTransport::new());
        let mut helper = FermioniqServerHelper::new();
        let err = helper
            .initialize(config().with("bond_dim", "large"), mock.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidConfiguration { key, .. } if key == "bond_dim"));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_empty_secret_is_missing() {
        if std::env::var(ENV_ACCESS_TOKEN_SECRET).is_ok() {
            return;
        }
        let mock = Arc::new(MockTransport::new());
        let mut helper = FermioniqServerHelper::new();
        let err = helper
            .initialize(config().with("access_token_secret", ""), mock.clone())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServerError::MissingConfiguration { ref key, ref hint }
                if key == "access_token_secret" && hint.contains(ENV_ACCESS_TOKEN_SECRET)
        ));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_headers() {
        let (helper, _) = initialized(config().with("api_key", "fn-key")).await;
        let headers = helper.get_headers();
        assert_eq!(headers["x-functions-key"], "fn-key");
        assert_eq!(headers["Authorization"], "Bearer jwt-1");
        assert_eq!(headers["Content-Type"], "application/json");
        assert!(headers["User-Agent"].starts_with("qrest/"));
    }

    #[tokio::test]
    async fn test_empty_api_key_omits_header() {
        let (helper, _) = initialized(config().with("api_key", "")).await;
        let headers = helper.get_headers();
        assert!(!headers.contains_key("x-functions-key"));
        assert!(headers.values().all(|v| !v.is_empty()));
    }

    #[tokio::test]
    async fn test_create_job_single_request_for_all_circuits() {
        let (helper, _) = initialized(
            config()
                .with("remote_config", "rc-7")
                .with("project_id", "p-1")
                .with("bond_dim", "32"),
        )
        .await;

        let payload = helper
            .create_job(&[
                KernelExecution::new("bell", "qasm-bell"),
                KernelExecution::new("ghz", "qasm-ghz"),
            ])
            .unwrap();

        assert_eq!(payload.path, "/api/jobs");
        assert_eq!(
            payload.body,
            json!({
                "circuit": ["qasm-bell", "qasm-ghz"],
                "circuit_names": ["bell", "ghz"],
                "user_id": "user-1",
                "remote_config": "rc-7",
                "project_id": "p-1",
                "emulator_config": {"bond_dim": 32},
            })
        );
        assert_eq!(payload.headers["Authorization"], "Bearer jwt-1");
    }

    #[tokio::test]
    async fn test_create_job_is_deterministic() {
        let (helper, _) = initialized(config()).await;
        let executions = [KernelExecution::new("bell", "qasm")];
        let a = helper.create_job(&executions).unwrap();
        let b = helper.create_job(&executions).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_create_job_before_initialize() {
        let helper = FermioniqServerHelper::new();
        let err = helper
            .create_job(&[KernelExecution::new("bell", "qasm")])
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidState(_)));
    }

    #[test]
    fn test_extract_job_id() {
        let helper = FermioniqServerHelper::new();
        assert_eq!(helper.extract_job_id(&json!({"id": "j-1"})).unwrap(), "j-1");
        assert!(matches!(
            helper.extract_job_id(&json!({"job_id": "j-1"})),
            Err(ServerError::MalformedResponse { .. })
        ));
        assert_eq!(
            helper
                .status_path_from_response(&json!({"id": "j-1"}))
                .unwrap(),
            "/api/jobs/j-1"
        );
    }

    #[test]
    fn test_job_is_done_verdicts() {
        let helper = FermioniqServerHelper::new();
        assert!(!helper.job_is_done(&json!({"status": "queued"})).unwrap());
        assert!(!helper.job_is_done(&json!({"status": "running"})).unwrap());
        assert!(
            helper
                .job_is_done(&json!({"status": "finished", "status_code": 0}))
                .unwrap()
        );

        let err = helper
            .job_is_done(&json!({
                "status": "finished",
                "status_code": 7,
                "status_message": "bond dimension exceeded"
            }))
            .unwrap_err();
        assert!(matches!(
            err,
            ServerError::JobExecutionFailed { code: Some(7), message } if message == "bond dimension exceeded"
        ));
    }

    #[test]
    fn test_job_is_done_error_field_on_other_state() {
        let helper = FermioniqServerHelper::new();
        let err = helper
            .job_is_done(&json!({"status": "running", "error": "worker crashed"}))
            .unwrap_err();
        assert!(matches!(err, ServerError::JobExecutionFailed { .. }));
    }

    #[test]
    fn test_job_is_done_malformed() {
        let helper = FermioniqServerHelper::new();
        assert!(matches!(
            helper.job_is_done(&json!({"state": "running"})),
            Err(ServerError::MalformedResponse { .. })
        ));
        assert!(matches!(
            helper.job_is_done(&json!({"status": "finished"})),
            Err(ServerError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_process_results() {
        let helper = FermioniqServerHelper::new();
        let response = json!({
            "emulator_output": [
                {"circuit_name": "bell", "output": {"samples": {"00": 480, "11": 520}}},
                {"output": {"samples": {"000": 1000}}}
            ]
        });

        let result = helper.process_results(&response, "j-1").unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.get("bell").map(|c| c.get("11")), Some(520));
        assert_eq!(result.executions[1].name, "circuit_1");
        assert_eq!(result.total_shots(), 2000);
    }

    #[test]
    fn test_process_results_rejects_unparseable() {
        let helper = FermioniqServerHelper::new();
        for response in [
            json!({}),
            json!({"emulator_output": []}),
            json!({"emulator_output": [{"output": {}}]}),
            json!({"emulator_output": [{"output": {"samples": {"00": -1}}}]}),
        ] {
            assert!(matches!(
                helper.process_results(&response, "j-1"),
                Err(ServerError::MalformedResponse { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_persisted_config_excludes_secrets() {
        let (helper, _) = initialized(
            config()
                .with("api_key", "fn-key")
                .with("remote_config", "rc-7"),
        )
        .await;
        let persisted = helper.persisted_config();
        assert_eq!(persisted.get("base_url"), Some("https://fq.test"));
        assert_eq!(persisted.get("remote_config"), Some("rc-7"));
        for key in SECRET_KEYS {
            assert!(!persisted.contains_key(key), "{key} was persisted");
        }
    }

    #[test]
    fn test_polling_interval_positive() {
        let helper = FermioniqServerHelper::new();
        assert!(helper.next_polling_interval(&json!({})) >= Duration::from_secs(1));
    }
}
