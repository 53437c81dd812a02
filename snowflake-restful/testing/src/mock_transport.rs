//! Scripted implementation of [`Transport`] for testing.
//!
//! Responses are scripted per HTTP method and path. For each route the mock
//! first hands out queued responses in FIFO order, then falls back to the
//! route's responder if one was installed. A request with nothing scripted
//! fails with a transport error naming the route, so unexpected calls show
//! up in test output.
//!
//! # Examples
//!
//! ```
//! use serde_json::json;
//! use snowflake_restful_testing::MockTransport;
//!
//! let transport = MockTransport::new()
//!     .with_post_json("/queries/v1/query-request", json!({"success": true, "code": "0"}))
//!     .with_post_status("/session", 503, "unavailable");
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use snowflake_restful::{
    HttpRequest, RawResponse, RestfulError, RestfulResult, Transport, REQUEST_GUID_KEY,
    REQUEST_ID_KEY,
};

/// HTTP method of a recorded or scripted call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// POST
    Post,
    /// GET
    Get,
}

type Responder = Box<dyn Fn(&HttpRequest) -> RestfulResult<RawResponse> + Send + Sync>;

/// Record of one request sent through the mock.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// The HTTP method
    pub method: Method,
    /// The request as the client prepared it
    pub request: HttpRequest,
}

impl RecordedCall {
    /// Path of the request URL.
    pub fn path(&self) -> &str {
        self.request.url.path()
    }

    /// Token from the Authorization header, without the scheme prefix.
    pub fn token(&self) -> Option<String> {
        let header = self.request.header("Authorization")?;
        header
            .strip_prefix("Snowflake Token=\"")
            .and_then(|rest| rest.strip_suffix('"'))
            .map(str::to_string)
    }

    /// The `requestId` query parameter.
    pub fn request_id(&self) -> Option<String> {
        self.request.query_param(REQUEST_ID_KEY)
    }

    /// The `request_guid` query parameter.
    pub fn request_guid(&self) -> Option<String> {
        self.request.query_param(REQUEST_GUID_KEY)
    }

    /// The request body parsed as JSON, or `Value::Null` if it is not JSON.
    pub fn body_json(&self) -> Value {
        serde_json::from_slice(&self.request.body).unwrap_or(Value::Null)
    }
}

/// Mock implementation of [`Transport`].
///
/// The mock uses internal mutexes, so one instance can serve concurrent
/// requests from many tasks.
pub struct MockTransport {
    /// Queued responses per route
    queued: Mutex<HashMap<(Method, String), VecDeque<RestfulResult<RawResponse>>>>,
    /// Responders used once a route's queue is empty
    responders: Mutex<HashMap<(Method, String), Responder>>,
    /// Record of every call made
    calls: Mutex<Vec<RecordedCall>>,
    /// Simulated network latency applied to every call
    latency: Option<Duration>,
}

impl MockTransport {
    /// Creates a mock with nothing scripted.
    pub fn new() -> Self {
        Self {
            queued: Mutex::new(HashMap::new()),
            responders: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            latency: None,
        }
    }

    /// Queues a response for POST requests to `path`.
    pub fn with_post_response(self, path: &str, response: RestfulResult<RawResponse>) -> Self {
        self.enqueue(Method::Post, path, response);
        self
    }

    /// Queues a response for GET requests to `path`.
    pub fn with_get_response(self, path: &str, response: RestfulResult<RawResponse>) -> Self {
        self.enqueue(Method::Get, path, response);
        self
    }

    /// Queues an OK response with a JSON body for POST requests to `path`.
    pub fn with_post_json(self, path: &str, body: Value) -> Self {
        self.with_post_response(path, Ok(json_response(&body)))
    }

    /// Queues an OK response with a JSON body for GET requests to `path`.
    pub fn with_get_json(self, path: &str, body: Value) -> Self {
        self.with_get_response(path, Ok(json_response(&body)))
    }

    /// Queues a response with the given status and raw body for POST requests to `path`.
    ///
    /// # Panics
    ///
    /// Panics if `status` is not a valid HTTP status code.
    pub fn with_post_status(self, path: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        let status = StatusCode::from_u16(status).expect("valid HTTP status");
        self.with_post_response(path, Ok(RawResponse::new(status, body.into())))
    }

    /// Queues a transport failure for POST requests to `path`.
    pub fn with_post_error(self, path: &str, message: impl Into<String>) -> Self {
        self.with_post_response(path, Err(RestfulError::transport(message)))
    }

    /// Installs a responder for POST requests to `path`.
    ///
    /// The responder answers every request to the route once its queue is
    /// empty, and can look at the request (for example at its token).
    pub fn with_post_responder<F>(self, path: &str, responder: F) -> Self
    where
        F: Fn(&HttpRequest) -> RestfulResult<RawResponse> + Send + Sync + 'static,
    {
        self.responders
            .lock()
            .unwrap()
            .insert((Method::Post, path.to_string()), Box::new(responder));
        self
    }

    /// Installs a responder for GET requests to `path`.
    pub fn with_get_responder<F>(self, path: &str, responder: F) -> Self
    where
        F: Fn(&HttpRequest) -> RestfulResult<RawResponse> + Send + Sync + 'static,
    {
        self.responders
            .lock()
            .unwrap()
            .insert((Method::Get, path.to_string()), Box::new(responder));
        self
    }

    /// Delays every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Gets all calls made to this mock, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Gets all calls made to `path`, in order.
    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.path() == path)
            .collect()
    }

    /// Gets all POST calls made to this mock.
    pub fn post_calls(&self) -> Vec<RecordedCall> {
        self.calls_with(Method::Post)
    }

    /// Gets all GET calls made to this mock.
    pub fn get_calls(&self) -> Vec<RecordedCall> {
        self.calls_with(Method::Get)
    }

    /// Returns the number of calls made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Clears all recorded calls.
    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn calls_with(&self, method: Method) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.method == method)
            .collect()
    }

    fn enqueue(&self, method: Method, path: &str, response: RestfulResult<RawResponse>) {
        self.queued
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(response);
    }

    async fn respond(&self, method: Method, request: HttpRequest) -> RestfulResult<RawResponse> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let key = (method, request.url.path().to_string());
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            request: request.clone(),
        });

        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front);
        if let Some(response) = queued {
            return response;
        }

        match self.responders.lock().unwrap().get(&key) {
            Some(responder) => responder(&request),
            None => Err(RestfulError::transport(format!(
                "no response scripted for {:?} {}",
                key.0, key.1
            ))),
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queued: usize = self.queued.lock().unwrap().values().map(VecDeque::len).sum();
        f.debug_struct("MockTransport")
            .field("queued_responses", &queued)
            .field("responders", &self.responders.lock().unwrap().len())
            .field("calls_count", &self.calls.lock().unwrap().len())
            .finish()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post(&self, request: HttpRequest) -> RestfulResult<RawResponse> {
        self.respond(Method::Post, request).await
    }

    async fn get(&self, request: HttpRequest) -> RestfulResult<RawResponse> {
        self.respond(Method::Get, request).await
    }
}

/// Builds an OK response with `body` serialized as JSON.
pub fn json_response(body: &Value) -> RawResponse {
    RawResponse::new(StatusCode::OK, body.to_string().into_bytes())
}
