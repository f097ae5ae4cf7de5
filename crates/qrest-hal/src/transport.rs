//! HTTP transport.
//!
//! The [`RestClient`] trait is the only way server helpers and the driver
//! reach the network. [`HttpClient`] is the reqwest implementation;
//! [`MockTransport`] is a scripted stand-in used by tests and dry runs.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rustc_hash::FxHashMap;
use tracing::{debug, instrument};

use crate::error::{ServerError, ServerResult};
use crate::message::{RestHeaders, ServerMessage};

/// JSON-over-HTTP client.
///
/// Implementations return a transport error on network failure or a
/// non-2xx status; a well-formed response describing a failed job is
/// returned as `Ok`.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// POST `body` to `base_url` + `path`.
    async fn post(
        &self,
        base_url: &str,
        path: &str,
        body: &ServerMessage,
        headers: &RestHeaders,
    ) -> ServerResult<ServerMessage>;

    /// GET `base_url` + `path`.
    async fn get(
        &self,
        base_url: &str,
        path: &str,
        headers: &RestHeaders,
    ) -> ServerResult<ServerMessage>;
}

/// Join a base URL and a path with exactly one slash.
pub fn join_url(base_url: &str, path: &str) -> String {
    if path.is_empty() {
        return base_url.trim_end_matches('/').to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// reqwest-backed [`RestClient`].
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a client with default timeouts.
    pub fn new() -> ServerResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client })
    }

    fn apply_headers(
        mut request: reqwest::RequestBuilder,
        headers: &RestHeaders,
    ) -> reqwest::RequestBuilder {
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        request
    }

    /// Deserialize a successful response or map the status to an error.
    async fn handle_response(response: reqwest::Response) -> ServerResult<ServerMessage> {
        let status = response.status();

        if status.is_success() {
            if status == StatusCode::NO_CONTENT {
                return Ok(ServerMessage::Null);
            }
            let text = response.text().await?;
            if text.trim().is_empty() {
                return Ok(ServerMessage::Null);
            }
            serde_json::from_str(&text).map_err(|e| ServerError::Transport {
                status: Some(status.as_u16()),
                message: format!("response is not valid JSON: {e}"),
            })
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(ServerError::Transport {
                status: Some(status.as_u16()),
                message,
            })
        }
    }
}

#[async_trait]
impl RestClient for HttpClient {
    #[instrument(skip(self, body, headers))]
    async fn post(
        &self,
        base_url: &str,
        path: &str,
        body: &ServerMessage,
        headers: &RestHeaders,
    ) -> ServerResult<ServerMessage> {
        let url = join_url(base_url, path);
        debug!("POST {}", url);
        let request = Self::apply_headers(self.client.post(&url), headers).json(body);
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    #[instrument(skip(self, headers))]
    async fn get(
        &self,
        base_url: &str,
        path: &str,
        headers: &RestHeaders,
    ) -> ServerResult<ServerMessage> {
        let url = join_url(base_url, path);
        debug!("GET {}", url);
        let request = Self::apply_headers(self.client.get(&url), headers);
        let response = request.send().await?;
        Self::handle_response(response).await
    }
}

/// HTTP verb of a recorded request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
}

/// A request observed by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// Verb.
    pub method: Method,
    /// Full URL.
    pub url: String,
    /// Path as passed by the caller.
    pub path: String,
    /// Headers.
    pub headers: RestHeaders,
    /// Body (`Null` for GET).
    pub body: ServerMessage,
}

type Scripted = ServerResult<ServerMessage>;

/// Scripted [`RestClient`].
///
/// Responses are queued per (verb, path) and handed out in order; the last
/// queued response for a route is repeated once the queue runs dry. Every
/// request is recorded.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<FxHashMap<(Method, String), VecDeque<Scripted>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    /// Create an empty transport; unscripted routes answer with HTTP 404.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a POST response.
    pub fn on_post(&self, path: &str, response: ServerMessage) -> &Self {
        self.push(Method::Post, path, Ok(response))
    }

    /// Queue a GET response.
    pub fn on_get(&self, path: &str, response: ServerMessage) -> &Self {
        self.push(Method::Get, path, Ok(response))
    }

    /// Queue a failure for a route.
    pub fn fail(&self, method: Method, path: &str, error: ServerError) -> &Self {
        self.push(method, path, Err(error))
    }

    fn push(&self, method: Method, path: &str, response: Scripted) -> &Self {
        self.routes
            .lock()
            .expect("mock transport lock poisoned")
            .entry((method, path.to_string()))
            .or_default()
            .push_back(response);
        self
    }

    /// All requests seen so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .expect("mock transport lock poisoned")
            .clone()
    }

    /// Requests seen for one (verb, path).
    pub fn requests_to(&self, method: Method, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    fn respond(
        &self,
        method: Method,
        base_url: &str,
        path: &str,
        headers: &RestHeaders,
        body: &ServerMessage,
    ) -> ServerResult<ServerMessage> {
        self.requests
            .lock()
            .expect("mock transport lock poisoned")
            .push(RecordedRequest {
                method,
                url: join_url(base_url, path),
                path: path.to_string(),
                headers: headers.clone(),
                body: body.clone(),
            });

        let mut routes = self.routes.lock().expect("mock transport lock poisoned");
        let Some(queue) = routes.get_mut(&(method, path.to_string())) else {
            return Err(ServerError::Transport {
                status: Some(404),
                message: format!("no scripted response for {method:?} {path}"),
            });
        };

        let next = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().map(clone_scripted)
        };
        next.unwrap_or_else(|| {
            Err(ServerError::Transport {
                status: Some(404),
                message: format!("no scripted response for {method:?} {path}"),
            })
        })
    }
}

fn clone_scripted(response: &Scripted) -> Scripted {
    match response {
        Ok(message) => Ok(message.clone()),
        Err(ServerError::Transport { status, message }) => Err(ServerError::Transport {
            status: *status,
            message: message.clone(),
        }),
        Err(ServerError::Authentication(msg)) => Err(ServerError::Authentication(msg.clone())),
        Err(other) => Err(ServerError::Transport {
            status: None,
            message: other.to_string(),
        }),
    }
}

#[async_trait]
impl RestClient for MockTransport {
    async fn post(
        &self,
        base_url: &str,
        path: &str,
        body: &ServerMessage,
        headers: &RestHeaders,
    ) -> ServerResult<ServerMessage> {
        self.respond(Method::Post, base_url, path, headers, body)
    }

    async fn get(
        &self,
        base_url: &str,
        path: &str,
        headers: &RestHeaders,
    ) -> ServerResult<ServerMessage> {
        self.respond(Method::Get, base_url, path, headers, &ServerMessage::Null)
    }
}
