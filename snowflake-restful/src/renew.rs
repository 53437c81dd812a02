//! Session renewal.
//!
//! The renewal request trades the master token for a fresh session token.
//! On success the whole token snapshot is replaced; on any failure the
//! store is left exactly as it was.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::classify::classify;
use crate::error::{RestfulError, RestfulResult};
use crate::request_id::RequestId;
use crate::response::RenewSessionData;
use crate::restful::{request_guid, RestfulClient, ACCEPT_JSON, REQUEST_GUID_KEY, REQUEST_ID_KEY};
use crate::tokens::SessionTokens;
use crate::transport::HttpRequest;

/// Path of the session renewal endpoint.
pub const TOKEN_REQUEST_PATH: &str = "/session/token-request";

/// Trait for the session renewal primitive.
///
/// Implementations exchange the client's master token for new tokens and
/// install them in its token store. The store must not be touched unless
/// the renewal succeeded.
#[async_trait]
pub trait SessionRenewer: Send + Sync {
    /// Renews the client's session.
    async fn renew(&self, client: &RestfulClient, timeout: Option<Duration>) -> RestfulResult<()>;
}

/// The renewal primitive used unless the client is given another one.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSessionRenewer;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenewRequest<'a> {
    old_session_token: &'a str,
    request_type: &'static str,
}

#[async_trait]
impl SessionRenewer for DefaultSessionRenewer {
    async fn renew(&self, client: &RestfulClient, timeout: Option<Duration>) -> RestfulResult<()> {
        let current = client.token_store().current().await;

        let body = serde_json::to_vec(&RenewRequest {
            old_session_token: &current.session_token,
            request_type: "RENEW",
        })?;
        let url = client.endpoint().url(
            TOKEN_REQUEST_PATH,
            &[
                (REQUEST_ID_KEY, RequestId::new().to_string()),
                (REQUEST_GUID_KEY, request_guid()),
            ],
        )?;

        let raw = client
            .post(HttpRequest {
                url: url.clone(),
                headers: client.auth_headers(&current.master_token, ACCEPT_JSON),
                body: body.into(),
                timeout,
                raise_on_empty_body: false,
            })
            .await?;

        let response = classify::<RenewSessionData>(raw.status, &raw.body).into_result(&url)?;
        let data = response.data.ok_or_else(|| {
            RestfulError::transient("renewal response carried no tokens", Some(raw.status.as_u16()))
        })?;

        // Some deployments omit the session id on renewal; it does not change.
        let session_id = if data.session_id == 0 {
            current.session_id
        } else {
            data.session_id
        };
        client
            .token_store()
            .replace(SessionTokens::new(data.session_token, data.master_token, session_id))
            .await;

        tracing::debug!(
            session_id = session_id,
            validity_secs = data.validity_in_seconds_st,
            "Session renewed"
        );
        Ok(())
    }
}
