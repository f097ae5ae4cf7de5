//! Fermioniq REST API wire types.
//!
//! Endpoints used:
//!
//! | Call | Path | Body |
//! |------|------|------|
//! | Login | `POST /api/login` | [`LoginRequest`] |
//! | Submit | `POST /api/jobs` | [`JobRequest`] |
//! | Status | `GET /api/jobs/{id}` | |
//! | Results | `GET /api/jobs/{id}/results` | |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Fermioniq production API base URL.
pub const DEFAULT_BASE_URL: &str = "https://fermioniq-api-fapp-prod.azurewebsites.net";

pub const LOGIN_PATH: &str = "/api/login";
pub const JOBS_PATH: &str = "/api/jobs";

/// Status-check path for a job.
pub fn job_path(job_id: &str) -> String {
    format!("{JOBS_PATH}/{job_id}")
}

/// Results path for a job.
pub fn results_path(job_id: &str) -> String {
    format!("{JOBS_PATH}/{job_id}/results")
}

/// Request body for `POST /api/login`.
#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub access_token_id: &'a str,
    pub access_token_secret: &'a str,
}

impl std::fmt::Debug for LoginRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("access_token_id", &self.access_token_id)
            .field("access_token_secret", &"[REDACTED]")
            .finish()
    }
}

/// Request body for `POST /api/jobs`.
///
/// Every circuit of a submission travels in one job.
#[derive(Debug, Serialize)]
pub struct JobRequest {
    /// Serialized circuits.
    pub circuit: Vec<String>,
    /// Kernel names, parallel to `circuit`.
    pub circuit_names: Vec<String>,
    /// User id returned by the login exchange.
    pub user_id: String,
    /// Named remote configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_config: Option<String>,
    /// Named noise model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_model: Option<String>,
    /// Project to bill.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Emulator tuning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emulator_config: Option<EmulatorConfig>,
}

/// Emulator tuning parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmulatorConfig {
    /// Maximum MPS bond dimension.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bond_dim: Option<u32>,
}

/// Response from `GET /api/jobs/{id}`.
#[derive(Debug, Deserialize)]
pub struct JobStatusResponse {
    /// `queued`, `running`, `finished`, ...
    pub status: String,
    /// Exit code of a finished job; zero on success.
    #[serde(default)]
    pub status_code: Option<i64>,
    /// Human-readable status detail.
    #[serde(default)]
    pub status_message: Option<String>,
    /// Error reported for the job, string or structured.
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl JobStatusResponse {
    /// The error field as text, if one is set.
    pub fn error_message(&self) -> Option<String> {
        match self.error.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Response from `GET /api/jobs/{id}/results`.
#[derive(Debug, Deserialize)]
pub struct ResultsResponse {
    /// One entry per submitted circuit, in submission order.
    pub emulator_output: Vec<EmulatorOutput>,
}

/// Emulator output for one circuit.
#[derive(Debug, Deserialize)]
pub struct EmulatorOutput {
    /// Kernel name echoed back from the submission.
    #[serde(default)]
    pub circuit_name: Option<String>,
    /// Measured data.
    pub output: CircuitOutput,
}

/// Measured data for one circuit.
#[derive(Debug, Deserialize)]
pub struct CircuitOutput {
    /// Bitstring histogram.
    pub samples: BTreeMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_request_omits_unset_options() {
        let request = JobRequest {
            circuit: vec!["OPENQASM 2.0;".into()],
            circuit_names: vec!["bell".into()],
            user_id: "u-1".into(),
            remote_config: None,
            noise_model: None,
            project_id: None,
            emulator_config: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({"circuit": ["OPENQASM 2.0;"], "circuit_names": ["bell"], "user_id": "u-1"})
        );
    }

    #[test]
    fn test_bond_dim_nested_under_emulator_config() {
        let request = JobRequest {
            circuit: vec![],
            circuit_names: vec![],
            user_id: "u".into(),
            remote_config: Some("rc".into()),
            noise_model: None,
            project_id: None,
            emulator_config: Some(EmulatorConfig { bond_dim: Some(16) }),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["emulator_config"]["bond_dim"], 16);
        assert_eq!(value["remote_config"], "rc");
    }

    #[test]
    fn test_status_error_message() {
        let status: JobStatusResponse =
            serde_json::from_value(json!({"status": "failed", "error": {"kind": "oom"}})).unwrap();
        assert_eq!(status.error_message().as_deref(), Some(r#"{"kind":"oom"}"#));

        let status: JobStatusResponse =
            serde_json::from_value(json!({"status": "running", "error": null})).unwrap();
        assert!(status.error_message().is_none());
    }

    #[test]
    fn test_login_request_debug_redacts_secret() {
        let request = LoginRequest {
            access_token_id: "id",
            access_token_secret: "hunter2",
        };
        assert!(!format!("{request:?}").contains("hunter2"));
    }

    #[test]
    fn test_paths() {
        assert_eq!(job_path("j1"), "/api/jobs/j1");
        assert_eq!(results_path("j1"), "/api/jobs/j1/results");
    }
}
