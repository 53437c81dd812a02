//! Testing utilities for snowflake-restful
//!
//! This crate provides a [`MockTransport`] that stands in for the network:
//! responses are scripted per route and every request is recorded for
//! later inspection.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use snowflake_restful::{CallConfig, Endpoint, RequestId, RestfulClient, SessionTokens};
//! use snowflake_restful_testing::MockTransport;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let transport = Arc::new(
//!     MockTransport::new()
//!         .with_post_json("/queries/v1/query-request", json!({"success": true, "code": "0"})),
//! );
//! let client = RestfulClient::new(
//!     Endpoint::new("acct.snowflakecomputing.com"),
//!     SessionTokens::new("st", "mt", 1),
//! )
//! .with_transport(transport.clone());
//!
//! client
//!     .execute(RequestId::new(), "{}", None, &CallConfig::default())
//!     .await
//!     .unwrap();
//! assert_eq!(transport.post_calls().len(), 1);
//! # }
//! ```

pub mod mock_transport;

pub use mock_transport::{json_response, Method, MockTransport, RecordedCall};
