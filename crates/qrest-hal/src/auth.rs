//! Token handling for backends that require a login exchange.
//!
//! Long-lived credentials (an access-token id and secret) are exchanged for
//! a short-lived bearer token plus user identity. [`TokenCache`] holds the
//! current token and serializes refreshes: one exchange is in flight at a
//! time, and callers that queued behind it take its result instead of
//! issuing their own.
//!
//! # Example
//!
//! ```ignore
//! let token = cache
//!     .refresh(true, || async {
//!         let response = transport.post(base_url, "/api/login", &body, &headers).await?;
//!         AuthToken::from_login_response(&response, "jwt_token", Some("user_id"))
//!     })
//!     .await?;
//! ```

use std::future::Future;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{ServerError, ServerResult};
use crate::message::ServerMessage;

/// A short-lived token issued by a login exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    /// Bearer token.
    pub token: String,
    /// User identity returned alongside the token, if any.
    pub user_id: Option<String>,
    /// When the token was received.
    pub issued_at: DateTime<Utc>,
}

impl AuthToken {
    /// Create a token issued now.
    pub fn new(token: impl Into<String>, user_id: Option<String>) -> Self {
        Self {
            token: token.into(),
            user_id,
            issued_at: Utc::now(),
        }
    }

    /// Parse a login response.
    ///
    /// `token_field` must hold a non-empty string. When `user_field` is
    /// given it must hold a string as well.
    pub fn from_login_response(
        response: &ServerMessage,
        token_field: &str,
        user_field: Option<&str>,
    ) -> ServerResult<Self> {
        let token = response
            .get(token_field)
            .and_then(ServerMessage::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ServerError::Authentication(format!(
                    "login response has no '{token_field}' field"
                ))
            })?;

        let user_id = match user_field {
            Some(field) => Some(
                response
                    .get(field)
                    .and_then(ServerMessage::as_str)
                    .ok_or_else(|| {
                        ServerError::Authentication(format!(
                            "login response has no '{field}' field"
                        ))
                    })?
                    .to_string(),
            ),
            None => None,
        };

        Ok(Self::new(token, user_id))
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("token", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// Current token plus a single-flight refresh gate.
///
/// The gate holds the failure message of the last attempt, or `None` if it
/// succeeded.
#[derive(Default)]
pub struct TokenCache {
    current: RwLock<Option<AuthToken>>,
    refresh_gate: Mutex<Option<String>>,
    attempts: AtomicU64,
    generation: AtomicU64,
}

impl TokenCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current token, if any.
    pub fn current(&self) -> Option<AuthToken> {
        self.current
            .read()
            .expect("token cache lock poisoned")
            .clone()
    }

    /// The current bearer token string, if any.
    pub fn token(&self) -> Option<String> {
        self.current().map(|t| t.token)
    }

    /// The user id that came with the current token, if any.
    pub fn user_id(&self) -> Option<String> {
        self.current().and_then(|t| t.user_id)
    }

    /// Number of completed refreshes.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Run `login` under the refresh gate and store its token.
    ///
    /// If another attempt finished while this caller waited for the gate,
    /// its outcome is returned and `login` is not called: the new token on
    /// success, the same `Authentication` error on failure. `force` is
    /// accepted for callers that want to skip a freshness check; no freshness
    /// check exists yet, so every call that reaches an idle gate performs the
    /// exchange.
    ///
    /// On failure the previously held token is left in place.
    pub async fn refresh<F, Fut>(&self, force: bool, login: F) -> ServerResult<AuthToken>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ServerResult<AuthToken>>,
    {
        let observed = self.attempts.load(Ordering::Acquire);
        let mut last_failure = self.refresh_gate.lock().await;

        if self.attempts.load(Ordering::Acquire) != observed {
            match last_failure.as_ref() {
                Some(message) => {
                    debug!("Sharing failure of a refresh that finished while waiting");
                    return Err(ServerError::Authentication(message.clone()));
                }
                None => {
                    if let Some(token) = self.current() {
                        debug!("Reusing token from a refresh that completed while waiting");
                        return Ok(token);
                    }
                }
            }
        }

        debug!(force, "Refreshing token");
        let outcome = login().await;
        let result = match outcome {
            Ok(token) => {
                {
                    let mut current = self.current.write().expect("token cache lock poisoned");
                    *current = Some(token.clone());
                }
                self.generation.fetch_add(1, Ordering::AcqRel);
                *last_failure = None;
                Ok(token)
            }
            Err(e) => {
                warn!("Token refresh failed: {}", e);
                let message = match e {
                    ServerError::Authentication(message) => message,
                    other => other.to_string(),
                };
                *last_failure = Some(message.clone());
                Err(ServerError::Authentication(message))
            }
        };
        self.attempts.fetch_add(1, Ordering::AcqRel);
        result
    }

    /// Drop the current token.
    pub fn clear(&self) {
        let mut current = self.current.write().expect("token cache lock poisoned");
        *current = None;
    }
}
