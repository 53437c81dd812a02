//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use snowflake_restful::{
    CallConfig, Endpoint, ExecResponse, QueryPoster, QueryRequest, RequestId, RestfulClient,
    RestfulError, RestfulResult, SessionRenewer, SessionTokens, SharedTransport,
    SESSION_EXPIRED_CODE,
};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};

pub const TEST_HOST: &str = "testaccount.snowflakecomputing.com";
pub const SESSION_TOKEN: &str = "session-token-0";
pub const MASTER_TOKEN: &str = "master-token-0";
pub const SESSION_ID: i64 = 1001;

pub fn initial_tokens() -> SessionTokens {
    SessionTokens::new(SESSION_TOKEN, MASTER_TOKEN, SESSION_ID)
}

pub fn session_token(generation: u32) -> String {
    format!("session-token-{generation}")
}

pub fn master_token(generation: u32) -> String {
    format!("master-token-{generation}")
}

pub fn create_client(transport: SharedTransport) -> RestfulClient {
    RestfulClient::new(Endpoint::new(TEST_HOST), initial_tokens()).with_transport(transport)
}

/// Config with a poll interval short enough for tests on the real clock.
pub fn test_config() -> CallConfig {
    CallConfig::default().with_poll_interval(Duration::from_millis(1))
}

pub fn success_body() -> Value {
    json!({"data": {}, "message": "", "code": "0", "success": true})
}

/// A successful response with an empty code.
pub fn after_renew_body() -> Value {
    json!({"data": {}, "message": "", "code": "", "success": true})
}

/// The session-expired response, as sent by the service with `success: true`.
pub fn session_expired_body() -> Value {
    json!({"data": {}, "message": "", "code": SESSION_EXPIRED_CODE, "success": true})
}

pub fn renewal_body(generation: u32) -> Value {
    json!({
        "data": {
            "sessionToken": session_token(generation),
            "validityInSecondsST": 3600,
            "masterToken": master_token(generation),
            "validityInSecondsMT": 14400,
            "sessionId": SESSION_ID
        },
        "message": null,
        "code": null,
        "success": true
    })
}

/// Bytes that are not a JSON document.
pub const GARBAGE: [u8; 2] = [0x12, 0x34];

// =============================================================================
// Strategy doubles
// =============================================================================

/// Renewer that installs the next token generation without network I/O.
#[derive(Debug, Default)]
pub struct CountingRenewer {
    calls: AtomicUsize,
    fail: bool,
}

impl CountingRenewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionRenewer for CountingRenewer {
    async fn renew(&self, client: &RestfulClient, _timeout: Option<Duration>) -> RestfulResult<()> {
        let generation = self.calls.fetch_add(1, Ordering::SeqCst) as u32 + 1;
        if self.fail {
            return Err(RestfulError::transport("failed to renew session in tests"));
        }
        client
            .token_store()
            .replace(SessionTokens::new(
                session_token(generation),
                master_token(generation),
                SESSION_ID,
            ))
            .await;
        Ok(())
    }
}

/// Query poster that records the request ids it was asked to send.
#[derive(Debug, Default)]
pub struct RecordingPoster {
    request_ids: Mutex<Vec<RequestId>>,
    tokens: Mutex<Vec<String>>,
}

impl RecordingPoster {
    pub fn request_ids(&self) -> Vec<RequestId> {
        self.request_ids.lock().unwrap().clone()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryPoster for RecordingPoster {
    async fn post_query(
        &self,
        client: &RestfulClient,
        request: &QueryRequest,
        _timeout: Option<Duration>,
    ) -> RestfulResult<ExecResponse> {
        self.request_ids.lock().unwrap().push(request.request_id);
        let token = client.token_store().current().await.session_token;
        self.tokens.lock().unwrap().push(token);
        Ok(ExecResponse::success(json!({})))
    }
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}

// =============================================================================
// Tracing capture
// =============================================================================

/// Fields of one captured event, including its `message`.
pub type CapturedEvent = HashMap<String, String>;

#[derive(Debug, Default)]
struct FieldCapture {
    fields: HashMap<String, String>,
}

impl Visit for FieldCapture {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.fields
            .insert(field.name().to_string(), format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }
}

/// A test layer that captures every event.
pub struct EventCaptureLayer {
    pub events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S: Subscriber> tracing_subscriber::Layer<S> for EventCaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut capture = FieldCapture::default();
        event.record(&mut capture);
        self.events.lock().unwrap().push(capture.fields);
    }
}
