//! Session termination and query cancellation.
//!
//! Neither call renews the session. Both are sent with the current session
//! token and classified like any other response.

use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::classify::{classify, Outcome};
use crate::error::RestfulResult;
use crate::request_id::RequestId;
use crate::restful::{request_guid, RestfulClient, ACCEPT_JSON, REQUEST_GUID_KEY, REQUEST_ID_KEY};
use crate::transport::{HttpRequest, RawResponse};

/// Path of the session endpoint.
pub const SESSION_REQUEST_PATH: &str = "/session";

/// Path of the query abort endpoint.
pub const ABORT_REQUEST_PATH: &str = "/queries/v1/abort-request";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AbortRequest {
    request_id: RequestId,
}

/// Sends the session termination request.
pub(crate) async fn close_session(client: &RestfulClient, timeout: Option<Duration>) -> RestfulResult<()> {
    let url = client.endpoint().url(
        SESSION_REQUEST_PATH,
        &[
            ("delete", "true".to_string()),
            (REQUEST_ID_KEY, RequestId::new().to_string()),
            (REQUEST_GUID_KEY, request_guid()),
        ],
    )?;
    let raw = send(client, url.clone(), Bytes::new(), timeout).await?;

    match classify::<Value>(raw.status, &raw.body) {
        Outcome::SessionExpired(_) => {
            tracing::debug!("Session already expired on the server, nothing to close");
            Ok(())
        }
        other => other.into_result(&url).map(|_| ()),
    }
}

/// Sends a request to abort the query submitted under `target`.
pub(crate) async fn cancel_query(
    client: &RestfulClient,
    target: RequestId,
    timeout: Option<Duration>,
) -> RestfulResult<()> {
    let url = client.endpoint().url(
        ABORT_REQUEST_PATH,
        &[
            (REQUEST_ID_KEY, RequestId::new().to_string()),
            (REQUEST_GUID_KEY, request_guid()),
        ],
    )?;
    let body = serde_json::to_vec(&AbortRequest { request_id: target })?;

    tracing::debug!(request_id = %target, "Cancelling query");
    let raw = send(client, url.clone(), body.into(), timeout).await?;
    classify::<Value>(raw.status, &raw.body)
        .into_result(&url)
        .map(|_| ())
}

async fn send(
    client: &RestfulClient,
    url: url::Url,
    body: Bytes,
    timeout: Option<Duration>,
) -> RestfulResult<RawResponse> {
    let session_token = client.token_store().current().await.session_token;
    client
        .post(HttpRequest {
            url,
            headers: client.auth_headers(&session_token, ACCEPT_JSON),
            body,
            timeout,
            raise_on_empty_body: false,
        })
        .await
}
