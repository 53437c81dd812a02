//! The restful client.
//!
//! A [`RestfulClient`] is created once per database connection and shared by
//! every request on it. It owns the [`TokenStore`] and the strategies used to
//! talk to the service: the low-level [`Transport`](crate::Transport), the [`QueryPoster`] used
//! to resubmit a query after renewal, and the [`SessionRenewer`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::{CallConfig, Endpoint};
use crate::error::{RestfulError, RestfulResult};
use crate::query::{self, DefaultQueryPoster, QueryPoster, QueryRequest};
use crate::renew::{DefaultSessionRenewer, SessionRenewer};
use crate::request_id::RequestId;
use crate::response::ExecResponse;
use crate::retry;
use crate::session;
use crate::tokens::{SessionTokens, TokenStore};
use crate::transport::{HttpRequest, RawResponse, ReqwestTransport, SharedTransport};

/// Query parameter carrying the stable id of a logical request.
pub const REQUEST_ID_KEY: &str = "requestId";

/// Query parameter carrying the per-attempt trace id.
pub const REQUEST_GUID_KEY: &str = "request_guid";

/// Accept header value of the query endpoints.
pub const ACCEPT_SNOWFLAKE: &str = "application/snowflake";

/// Accept header value of the session endpoints.
pub const ACCEPT_JSON: &str = "application/json";

const DEFAULT_USER_AGENT: &str = concat!("snowflake-restful/", env!("CARGO_PKG_VERSION"));

/// Returns a fresh per-attempt trace id.
pub(crate) fn request_guid() -> String {
    Uuid::new_v4().to_string()
}

/// Client for the authenticated endpoints of the query service.
///
/// # Examples
///
/// ```no_run
/// use snowflake_restful::{CallConfig, Endpoint, RequestId, RestfulClient, SessionTokens};
///
/// # async fn run() -> snowflake_restful::RestfulResult<()> {
/// let client = RestfulClient::new(
///     Endpoint::new("acct.snowflakecomputing.com"),
///     SessionTokens::new("session-token", "master-token", 1),
/// );
///
/// let request_id = RequestId::new();
/// let body = br#"{"sqlText": "select 1", "asyncExec": false}"#.to_vec();
/// let response = client
///     .execute(request_id, body, None, &CallConfig::default())
///     .await?;
/// println!("query id: {:?}", response.query_id());
///
/// client.close(None).await?;
/// # Ok(())
/// # }
/// ```
pub struct RestfulClient {
    endpoint: Endpoint,
    token_store: TokenStore,
    transport: SharedTransport,
    query_poster: Arc<dyn QueryPoster>,
    renewer: Arc<dyn SessionRenewer>,
    /// Held for the whole of a renewal so only one renewal is in effect
    renew_lock: Mutex<()>,
    user_agent: String,
}

impl RestfulClient {
    /// Creates a client using the reqwest transport and the default strategies.
    pub fn new(endpoint: Endpoint, tokens: SessionTokens) -> Self {
        Self {
            endpoint,
            token_store: TokenStore::new(tokens),
            transport: Arc::new(ReqwestTransport::new()),
            query_poster: Arc::new(DefaultQueryPoster),
            renewer: Arc::new(DefaultSessionRenewer),
            renew_lock: Mutex::new(()),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Replaces the low-level transport.
    pub fn with_transport(mut self, transport: SharedTransport) -> Self {
        self.transport = transport;
        self
    }

    /// Replaces the primitive used to resubmit a query after renewal.
    pub fn with_query_poster(mut self, query_poster: Arc<dyn QueryPoster>) -> Self {
        self.query_poster = query_poster;
        self
    }

    /// Replaces the session renewal primitive.
    pub fn with_renewer(mut self, renewer: Arc<dyn SessionRenewer>) -> Self {
        self.renewer = renewer;
        self
    }

    /// Sets the User-Agent sent with every request.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Returns the endpoint requests are sent to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns the token store.
    pub fn token_store(&self) -> &TokenStore {
        &self.token_store
    }

    /// Returns the query resubmission primitive.
    pub fn query_poster(&self) -> &Arc<dyn QueryPoster> {
        &self.query_poster
    }

    /// Executes a query.
    ///
    /// `payload` is the serialized query request body. `request_id` is sent
    /// unchanged on the first attempt and on the one resubmission made after
    /// a session renewal. Transient and fatal failures are returned at once;
    /// see [`RestfulClient::execute_with_retry`] for a retrying variant.
    pub async fn execute(
        &self,
        request_id: RequestId,
        payload: impl Into<Bytes>,
        timeout: Option<Duration>,
        config: &CallConfig,
    ) -> RestfulResult<ExecResponse> {
        let request = QueryRequest::new(request_id, payload);
        query::execute(self, &request, timeout, config).await
    }

    /// Executes a query, retrying transient failures under `config.retry_policy`.
    ///
    /// Every attempt reuses `request_id`, so the server can deduplicate work
    /// that reached it before a failure.
    pub async fn execute_with_retry(
        &self,
        request_id: RequestId,
        payload: impl Into<Bytes>,
        timeout: Option<Duration>,
        config: &CallConfig,
    ) -> RestfulResult<ExecResponse> {
        let request = &QueryRequest::new(request_id, payload);
        retry::retry_transient(&config.retry_policy, request_id, move || {
            query::execute(self, request, timeout, config)
        })
        .await
    }

    /// Terminates the server-side session.
    ///
    /// Failure means the server-side cleanup is unconfirmed; local state is
    /// not affected.
    pub async fn close(&self, timeout: Option<Duration>) -> RestfulResult<()> {
        session::close_session(self, timeout).await
    }

    /// Asks the server to cancel the query submitted under `request_id`.
    pub async fn cancel(&self, request_id: RequestId, timeout: Option<Duration>) -> RestfulResult<()> {
        session::cancel_query(self, request_id, timeout).await
    }

    /// Renews the session, unless a concurrent request already has.
    ///
    /// `observed` is the snapshot the caller used for the request that came
    /// back expired. Renewals are serialized; if the session token changed
    /// while waiting, the concurrent renewal's result is reused and no
    /// request is sent. Failures are returned as [`RestfulError::Renewal`].
    pub async fn renew_session(
        &self,
        observed: &SessionTokens,
        timeout: Option<Duration>,
    ) -> RestfulResult<()> {
        let _guard = self.renew_lock.lock().await;

        let current = self.token_store.current().await;
        if current.session_token != observed.session_token {
            tracing::debug!(
                session_id = current.session_id,
                "Session already renewed by a concurrent request"
            );
            return Ok(());
        }

        tracing::debug!(session_id = current.session_id, "Renewing session");
        self.renewer.renew(self, timeout).await.map_err(|error| {
            tracing::warn!(session_id = current.session_id, error = %error, "Session renewal failed");
            RestfulError::renewal(error)
        })
    }

    /// Builds the headers of an authenticated request.
    pub fn auth_headers(&self, token: &str, accept: &str) -> Vec<(String, String)> {
        vec![
            ("Content-Type".to_string(), ACCEPT_JSON.to_string()),
            ("Accept".to_string(), accept.to_string()),
            ("User-Agent".to_string(), self.user_agent.clone()),
            (
                "Authorization".to_string(),
                format!("Snowflake Token=\"{token}\""),
            ),
        ]
    }

    /// Sends a POST through the transport, bounded by the request's timeout.
    pub async fn post(&self, request: HttpRequest) -> RestfulResult<RawResponse> {
        let timeout = request.timeout;
        bounded(timeout, self.transport.post(request)).await
    }

    /// Sends a GET through the transport, bounded by the request's timeout.
    pub async fn get(&self, request: HttpRequest) -> RestfulResult<RawResponse> {
        let timeout = request.timeout;
        bounded(timeout, self.transport.get(request)).await
    }
}

impl std::fmt::Debug for RestfulClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestfulClient")
            .field("endpoint", &self.endpoint)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

// Transports are expected to honour the timeout themselves; this also
// covers the ones that don't.
async fn bounded<T>(
    timeout: Option<Duration>,
    future: impl Future<Output = RestfulResult<T>>,
) -> RestfulResult<T> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, future)
            .await
            .map_err(|_| RestfulError::timeout(format!("request timed out after {limit:?}")))?,
        None => future.await,
    }
}
