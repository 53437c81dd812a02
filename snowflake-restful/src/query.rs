//! Query submission.
//!
//! [`execute`] sends a query once and, if the session turns out to have
//! expired, renews it and resubmits the same request exactly once through
//! the client's [`QueryPoster`]. A query the service reports as still
//! running is then polled until it finishes.
//!
//! One renewal is allowed per execution. Any later session-expired response,
//! whether to the resubmission or to a poll, is returned to the caller as
//! [`RestfulError::SessionExpired`].

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use url::Url;

use crate::classify::{classify, Outcome};
use crate::config::CallConfig;
use crate::error::{RestfulError, RestfulResult};
use crate::request_id::RequestId;
use crate::response::ExecResponse;
use crate::restful::{request_guid, RestfulClient, ACCEPT_SNOWFLAKE, REQUEST_GUID_KEY, REQUEST_ID_KEY};
use crate::transport::HttpRequest;

/// Path of the query submission endpoint.
pub const QUERY_REQUEST_PATH: &str = "/queries/v1/query-request";

/// One logical query request.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    /// Identifier shared by every submission of this request
    pub request_id: RequestId,
    /// Serialized request body
    pub body: Bytes,
}

impl QueryRequest {
    /// Creates a new query request.
    pub fn new(request_id: RequestId, body: impl Into<Bytes>) -> Self {
        Self {
            request_id,
            body: body.into(),
        }
    }
}

/// Trait for the query POST primitive.
///
/// Implementations send `request` with the client's current session token,
/// propagate its request id, and parse the structured response. They must
/// not renew the session: a session-expired response is returned as
/// [`RestfulError::SessionExpired`].
#[async_trait]
pub trait QueryPoster: Send + Sync {
    /// Submits the query and returns the parsed response.
    async fn post_query(
        &self,
        client: &RestfulClient,
        request: &QueryRequest,
        timeout: Option<Duration>,
    ) -> RestfulResult<ExecResponse>;
}

/// The query POST primitive used unless the client is given another one.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultQueryPoster;

#[async_trait]
impl QueryPoster for DefaultQueryPoster {
    async fn post_query(
        &self,
        client: &RestfulClient,
        request: &QueryRequest,
        timeout: Option<Duration>,
    ) -> RestfulResult<ExecResponse> {
        let session_token = client.token_store().current().await.session_token;
        let (url, outcome) = send_query(client, request, &session_token, timeout).await?;
        outcome.into_result(&url)
    }
}

/// Sends `request` once and classifies the response.
async fn send_query(
    client: &RestfulClient,
    request: &QueryRequest,
    session_token: &str,
    timeout: Option<Duration>,
) -> RestfulResult<(Url, Outcome<Value>)> {
    let url = client.endpoint().url(
        QUERY_REQUEST_PATH,
        &[
            (REQUEST_ID_KEY, request.request_id.to_string()),
            (REQUEST_GUID_KEY, request_guid()),
        ],
    )?;

    let response = client
        .post(HttpRequest {
            url: url.clone(),
            headers: client.auth_headers(session_token, ACCEPT_SNOWFLAKE),
            body: request.body.clone(),
            timeout,
            raise_on_empty_body: true,
        })
        .await?;

    Ok((url, classify(response.status, &response.body)))
}

/// Executes a query, renewing the session at most once.
pub(crate) async fn execute(
    client: &RestfulClient,
    request: &QueryRequest,
    timeout: Option<Duration>,
    config: &CallConfig,
) -> RestfulResult<ExecResponse> {
    let observed = client.token_store().current().await;
    let (url, outcome) = send_query(client, request, &observed.session_token, timeout).await?;

    let mut renewed = false;
    let response = match outcome {
        Outcome::SessionExpired(_) => {
            tracing::debug!(
                request_id = %request.request_id,
                "Session expired, renewing before resubmitting"
            );
            client.renew_session(&observed, config.renew_timeout).await?;
            renewed = true;
            client
                .query_poster()
                .post_query(client, request, timeout)
                .await?
        }
        other => other.into_result(&url)?,
    };

    if !config.wait_for_completion {
        return Ok(response);
    }
    wait_for_completion(client, request, response, timeout, config, renewed).await
}

/// Polls the result URL of a query until it is no longer in progress.
async fn wait_for_completion(
    client: &RestfulClient,
    request: &QueryRequest,
    mut response: ExecResponse,
    timeout: Option<Duration>,
    config: &CallConfig,
    mut renewed: bool,
) -> RestfulResult<ExecResponse> {
    let mut poll = 0u32;
    while response.is_in_progress() {
        let result_url = response
            .result_url()
            .ok_or_else(|| {
                RestfulError::protocol(format!(
                    "request {} is in progress but has no result URL",
                    request.request_id
                ))
            })?
            .to_string();

        poll += 1;
        tracing::debug!(
            request_id = %request.request_id,
            query_id = ?response.query_id(),
            poll = poll,
            "Query in progress, polling for result"
        );
        tokio::time::sleep(config.poll_interval).await;

        let observed = client.token_store().current().await;
        let url = client
            .endpoint()
            .url(&result_url, &[(REQUEST_GUID_KEY, request_guid())])?;
        let raw = client
            .get(HttpRequest {
                url: url.clone(),
                headers: client.auth_headers(&observed.session_token, ACCEPT_SNOWFLAKE),
                body: Bytes::new(),
                timeout,
                raise_on_empty_body: true,
            })
            .await?;

        match classify(raw.status, &raw.body) {
            Outcome::SessionExpired(_) if !renewed => {
                tracing::debug!(
                    request_id = %request.request_id,
                    "Session expired while polling, renewing"
                );
                client.renew_session(&observed, config.renew_timeout).await?;
                renewed = true;
            }
            other => response = other.into_result(&url)?,
        }
    }
    Ok(response)
}
