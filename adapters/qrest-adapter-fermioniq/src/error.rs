//! Error types for the Fermioniq adapter.

use qrest_hal::{ServerError, ServerMessage};
use thiserror::Error;

/// Result type for Fermioniq operations.
pub type FermioniqResult<T> = Result<T, FermioniqError>;

/// Errors that can occur when interacting with Fermioniq.
#[derive(Debug, Error)]
pub enum FermioniqError {
    /// `bond_dim` is not a positive integer.
    #[error("bond_dim must be a positive integer, got '{0}'")]
    InvalidBondDim(String),

    /// The helper was used before `initialize`.
    #[error("Fermioniq helper is not initialized")]
    NotInitialized,

    /// No user id is known; the login exchange has not completed.
    #[error("Not logged in to Fermioniq")]
    NotLoggedIn,

    /// The emulator reported the job as failed.
    #[error("Job failed: {message}")]
    JobFailed {
        /// Fermioniq status code.
        code: Option<i64>,
        /// Fermioniq status message.
        message: String,
    },

    /// A response did not have the documented shape.
    #[error("Unexpected response: {reason}")]
    UnexpectedResponse {
        /// What was wrong.
        reason: String,
        /// The response.
        response: ServerMessage,
    },

    /// JSON encoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FermioniqError {
    pub(crate) fn unexpected(reason: impl Into<String>, response: &ServerMessage) -> Self {
        FermioniqError::UnexpectedResponse {
            reason: reason.into(),
            response: response.clone(),
        }
    }
}

impl From<FermioniqError> for ServerError {
    fn from(e: FermioniqError) -> Self {
        match e {
            FermioniqError::InvalidBondDim(_) => ServerError::InvalidConfiguration {
                key: "bond_dim".into(),
                reason: e.to_string(),
            },
            FermioniqError::NotInitialized => ServerError::InvalidState(e.to_string()),
            FermioniqError::NotLoggedIn => ServerError::Authentication(e.to_string()),
            FermioniqError::JobFailed { code, message } => {
                ServerError::JobExecutionFailed { code, message }
            }
            FermioniqError::UnexpectedResponse { reason, response } => {
                ServerError::MalformedResponse { reason, response }
            }
            FermioniqError::Json(e) => ServerError::Serialization(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invalid_bond_dim_display() {
        let err = FermioniqError::InvalidBondDim("sixteen".into());
        assert!(err.to_string().contains("sixteen"));
    }

    // -- ServerError conversion tests --

    #[test]
    fn test_bond_dim_to_server_error() {
        let err: ServerError = FermioniqError::InvalidBondDim("x".into()).into();
        assert!(
            matches!(err, ServerError::InvalidConfiguration { key, .. } if key == "bond_dim")
        );
    }

    #[test]
    fn test_job_failed_to_server_error() {
        let err: ServerError = FermioniqError::JobFailed {
            code: Some(3),
            message: "diverged".into(),
        }
        .into();
        assert!(matches!(
            err,
            ServerError::JobExecutionFailed { code: Some(3), message } if message == "diverged"
        ));
    }

    #[test]
    fn test_unexpected_response_keeps_message() {
        let response = json!({"emulator_output": 1});
        let err: ServerError = FermioniqError::unexpected("bad shape", &response).into();
        assert!(matches!(
            err,
            ServerError::MalformedResponse { response: r, .. } if r == response
        ));
    }

    #[test]
    fn test_not_logged_in_to_server_error() {
        let err: ServerError = FermioniqError::NotLoggedIn.into();
        assert!(matches!(err, ServerError::Authentication(_)));
    }
}
