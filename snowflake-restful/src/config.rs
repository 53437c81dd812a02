//! Configuration types.
//!
//! [`Endpoint`] is fixed for the life of a client. [`CallConfig`] and
//! [`RetryPolicy`] are passed with each call and never shared or mutated
//! behind the caller's back.

use std::time::Duration;

use url::Url;

use crate::error::{RestfulError, RestfulResult};

/// Default timeout for session renewal requests.
pub const DEFAULT_RENEW_TIMEOUT: Duration = Duration::from_secs(30);

/// Default delay between polls of a query that is still running.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Location of the query service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// URL scheme, `https` unless testing against a local server
    pub protocol: String,
    /// Host name of the account
    pub host: String,
    /// TCP port
    pub port: u16,
}

impl Endpoint {
    /// Creates an https endpoint on port 443.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            protocol: "https".to_string(),
            host: host.into(),
            port: 443,
        }
    }

    /// Parses an endpoint from a base URL such as `https://acct.snowflakecomputing.com`.
    ///
    /// ```
    /// use snowflake_restful::Endpoint;
    ///
    /// let endpoint = Endpoint::parse("http://127.0.0.1:8080").unwrap();
    /// assert_eq!(endpoint.protocol, "http");
    /// assert_eq!(endpoint.port, 8080);
    /// ```
    pub fn parse(base_url: &str) -> RestfulResult<Self> {
        let url = Url::parse(base_url)?;
        let host = url
            .host_str()
            .ok_or_else(|| RestfulError::invalid_url(format!("no host in {base_url}")))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| RestfulError::invalid_url(format!("no port for {base_url}")))?;
        Ok(Self {
            protocol: url.scheme().to_string(),
            host: host.to_string(),
            port,
        })
    }

    /// Builds the URL of `path` on this endpoint with the given query parameters.
    ///
    /// `path` may also be a full URL, as returned in `getResultUrl`; it is
    /// then resolved against the endpoint and must share its scheme, host and
    /// port, since the request will carry the session token.
    pub fn url(&self, path: &str, params: &[(&str, String)]) -> RestfulResult<Url> {
        let base = Url::parse(&format!("{}://{}:{}", self.protocol, self.host, self.port))?;
        let mut url = base.join(path)?;
        if url.origin() != base.origin() {
            return Err(RestfulError::protocol(format!(
                "URL {} is not on endpoint {}",
                url.origin().ascii_serialization(),
                base.origin().ascii_serialization()
            )));
        }
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(key, value)| (*key, value.as_str())));
        }
        Ok(url)
    }
}

/// Per-call configuration of an execution.
#[derive(Debug, Clone)]
pub struct CallConfig {
    /// Timeout of the renewal request made when the session has expired
    pub renew_timeout: Option<Duration>,
    /// Delay between polls of a query that is still running
    pub poll_interval: Duration,
    /// Poll in-progress queries until they finish; when false the
    /// in-progress response is returned as is
    pub wait_for_completion: bool,
    /// Policy used by `execute_with_retry`
    pub retry_policy: RetryPolicy,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            renew_timeout: Some(DEFAULT_RENEW_TIMEOUT),
            poll_interval: DEFAULT_POLL_INTERVAL,
            wait_for_completion: true,
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl CallConfig {
    /// Returns a config that submits queries without waiting for them.
    pub fn asynchronous() -> Self {
        Self {
            wait_for_completion: false,
            ..Self::default()
        }
    }

    /// Returns this config with a different renewal timeout.
    pub fn with_renew_timeout(mut self, timeout: Duration) -> Self {
        self.renew_timeout = Some(timeout);
        self
    }

    /// Returns this config with a different poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Returns this config with a different retry policy.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }
}

/// Exponential backoff for retrying transient failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Upper bound on any single delay
    pub max_backoff: Duration,
    /// Factor applied to the delay after each retry
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Returns the delay to wait after the given failed attempt (1-based).
    ///
    /// ```
    /// use std::time::Duration;
    /// use snowflake_restful::RetryPolicy;
    ///
    /// let policy = RetryPolicy::default();
    /// assert_eq!(policy.backoff(1), Duration::from_millis(100));
    /// assert_eq!(policy.backoff(2), Duration::from_millis(200));
    /// assert_eq!(policy.backoff(30), Duration::from_secs(10));
    /// ```
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .max(1)
            .saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}
