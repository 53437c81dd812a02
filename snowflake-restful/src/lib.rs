//! # Snowflake REST Execution Layer
//!
//! Authenticated request execution for a Snowflake database client. This
//! crate sits between the driver API and the HTTP transport: it submits
//! queries with a stable request id, renews the session when the service
//! reports it expired, polls queries that are still running, and closes
//! sessions and cancels queries on request.
//!
//! ## Overview
//!
//! - **Single renewal**: when a query comes back session-expired, the
//!   session is renewed once and the same request (same request id) is
//!   resubmitted once. Concurrent requests that hit the same expiry share a
//!   single renewal.
//! - **Classified errors**: every failure is a [`RestfulError`] whose
//!   [`recovery`](RestfulError::recovery) tells the calling layer whether to
//!   retry, re-authenticate or give up.
//! - **Pluggable strategies**: the HTTP [`Transport`], the [`QueryPoster`]
//!   and the [`SessionRenewer`] can be replaced, which is how the tests drive
//!   the client without a network.
//!
//! The login handshake that first produces the tokens, result-set decoding
//! and SQL binding live elsewhere.
//!
//! ## Getting Started
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use snowflake_restful::{CallConfig, Endpoint, RequestId, RestfulClient, SessionTokens};
//!
//! # async fn run() -> snowflake_restful::RestfulResult<()> {
//! // Tokens come from the login flow.
//! let client = Arc::new(RestfulClient::new(
//!     Endpoint::new("myaccount.snowflakecomputing.com"),
//!     SessionTokens::new("session-token", "master-token", 1),
//! ));
//!
//! let request_id = RequestId::new();
//! let body = br#"{"sqlText": "select 1", "asyncExec": false}"#.to_vec();
//! let response = client
//!     .execute_with_retry(request_id, body, Some(Duration::from_secs(60)), &CallConfig::default())
//!     .await?;
//! println!("query {:?} finished", response.query_id());
//!
//! client.close(Some(Duration::from_secs(5))).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! The crate emits `tracing` events and installs no subscriber. Tokens are
//! never logged.

pub mod cancellation;
pub mod classify;
pub mod config;
pub mod error;
pub mod query;
pub mod renew;
pub mod request_id;
pub mod response;
pub mod restful;
pub mod retry;
pub mod session;
pub mod tokens;
pub mod transport;

pub use cancellation::cancellable;
pub use classify::{classify, Outcome};
pub use config::{CallConfig, Endpoint, RetryPolicy, DEFAULT_POLL_INTERVAL, DEFAULT_RENEW_TIMEOUT};
pub use error::{Recovery, RestfulError, RestfulResult};
pub use query::{DefaultQueryPoster, QueryPoster, QueryRequest, QUERY_REQUEST_PATH};
pub use renew::{DefaultSessionRenewer, SessionRenewer, TOKEN_REQUEST_PATH};
pub use request_id::RequestId;
pub use response::{
    ExecResponse, RenewSessionData, QUERY_IN_PROGRESS_ASYNC_CODE, QUERY_IN_PROGRESS_CODE,
    SESSION_EXPIRED_CODE,
};
pub use restful::{RestfulClient, ACCEPT_JSON, ACCEPT_SNOWFLAKE, REQUEST_GUID_KEY, REQUEST_ID_KEY};
pub use retry::retry_transient;
pub use session::{ABORT_REQUEST_PATH, SESSION_REQUEST_PATH};
pub use tokens::{SessionTokens, TokenStore};
pub use transport::{HttpRequest, RawResponse, ReqwestTransport, SharedTransport, Transport};
