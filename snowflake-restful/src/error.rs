//! Error types for the Snowflake REST execution layer.
//!
//! Every failure path in this crate returns a [`RestfulError`]. The variants
//! mirror how the calling layer is expected to react: transport and transient
//! failures may be retried, session failures need re-authentication, and
//! everything else should be reported to the end user.

use thiserror::Error;

/// Result type for restful operations.
///
/// ```rust
/// use snowflake_restful::{RestfulError, RestfulResult};
///
/// fn require_host(host: &str) -> RestfulResult<&str> {
///     if host.is_empty() {
///         Err(RestfulError::invalid_url("host cannot be empty"))
///     } else {
///         Ok(host)
///     }
/// }
/// ```
pub type RestfulResult<T> = Result<T, RestfulError>;

/// The main error type for restful operations.
///
/// # Examples
///
/// ```
/// use snowflake_restful::{Recovery, RestfulError};
///
/// let err = RestfulError::transient("service unavailable", Some(503));
/// assert!(err.is_retriable());
/// assert_eq!(err.recovery(), Recovery::Retry);
///
/// let err = RestfulError::fatal("002003", "Object does not exist", Some(200));
/// assert!(!err.is_retriable());
/// assert_eq!(err.code(), Some("002003"));
/// ```
#[derive(Debug, Error)]
pub enum RestfulError {
    /// The HTTP call itself failed (DNS, connection reset, timeout).
    #[error("Transport error: {message}")]
    Transport {
        /// Error message describing what went wrong
        message: String,
        /// Whether the call exceeded its timeout
        is_timeout: bool,
    },

    /// An infra-availability status, or an OK status whose body could not be decoded.
    #[error("Transient error: {message}")]
    Transient {
        /// Error message describing what went wrong
        message: String,
        /// The HTTP status, when the failure came from a status code
        status: Option<u16>,
    },

    /// The session token has expired and was not (or could no longer be) renewed.
    #[error("Session expired: {message}")]
    SessionExpired {
        /// Message reported by the server
        message: String,
    },

    /// Renewing the session failed; the token store was left unchanged.
    #[error("Session renewal failed: {source}")]
    Renewal {
        /// The classified failure of the renewal request
        #[source]
        source: Box<RestfulError>,
    },

    /// The server rejected the request, or denied permission.
    #[error("Request rejected: {message}")]
    Fatal {
        /// Response code reported by the server, if any
        code: Option<String>,
        /// Message reported by the server
        message: String,
        /// The HTTP status the rejection arrived with
        status: Option<u16>,
    },

    /// Any non-OK status outside the known families.
    #[error("Unexpected HTTP status {status} from {url}")]
    Unexpected {
        /// The raw HTTP status
        status: u16,
        /// The URL that produced it
        url: String,
    },

    /// A well-formed response that breaks the protocol.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Error message describing the violation
        message: String,
    },

    /// A request body could not be serialized.
    #[error("Serialization error: {message}")]
    SerDes {
        /// Error message describing the serialization failure
        message: String,
    },

    /// A request URL could not be built.
    #[error("Invalid URL: {message}")]
    InvalidUrl {
        /// Error message describing the bad URL
        message: String,
    },

    /// The caller's cancellation signal fired before the call completed.
    #[error("Request cancelled")]
    Cancelled,
}

/// What the calling layer should do about an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Try the same logical request again, with the same request id.
    Retry,
    /// Establish a new session before going on.
    Reauthenticate,
    /// Stop and report the failure to the end user.
    Abort,
}

impl RestfulError {
    /// Creates a new Transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            is_timeout: false,
        }
    }

    /// Creates a new Transport error for a call that ran out of time.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            is_timeout: true,
        }
    }

    /// Creates a new Transient error.
    pub fn transient(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Transient {
            message: message.into(),
            status,
        }
    }

    /// Creates a new SessionExpired error.
    pub fn session_expired(message: impl Into<String>) -> Self {
        Self::SessionExpired {
            message: message.into(),
        }
    }

    /// Wraps a failure of the renewal request.
    ///
    /// Errors that are already renewal errors are returned unchanged.
    pub fn renewal(source: RestfulError) -> Self {
        match source {
            Self::Renewal { .. } => source,
            other => Self::Renewal {
                source: Box::new(other),
            },
        }
    }

    /// Creates a new Fatal error carrying a server response code.
    pub fn fatal(code: impl Into<String>, message: impl Into<String>, status: Option<u16>) -> Self {
        let code = code.into();
        Self::Fatal {
            code: (!code.is_empty()).then_some(code),
            message: message.into(),
            status,
        }
    }

    /// Creates a new Protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a new SerDes error.
    pub fn serdes(message: impl Into<String>) -> Self {
        Self::SerDes {
            message: message.into(),
        }
    }

    /// Creates a new InvalidUrl error.
    pub fn invalid_url(message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            message: message.into(),
        }
    }

    /// Returns true if a retry of the same request may succeed.
    ///
    /// Transport failures and transient errors are retriable; everything
    /// else is not.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Transient { .. })
    }

    /// Returns true if this is a Transport error caused by a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport { is_timeout: true, .. })
    }

    /// Returns true if this is a SessionExpired error.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }

    /// Returns true if this is a Renewal error.
    pub fn is_renewal(&self) -> bool {
        matches!(self, Self::Renewal { .. })
    }

    /// Returns true if this is a Fatal error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }

    /// Returns true if the caller's cancellation signal ended the call.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transient { status, .. } | Self::Fatal { status, .. } => *status,
            Self::Unexpected { status, .. } => Some(*status),
            Self::Renewal { source } => source.status(),
            _ => None,
        }
    }

    /// Returns the server response code attached to this error, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Fatal { code, .. } => code.as_deref(),
            Self::Renewal { source } => source.code(),
            _ => None,
        }
    }

    /// Maps this error onto the action the calling layer should take.
    pub fn recovery(&self) -> Recovery {
        match self {
            Self::Transport { .. } | Self::Transient { .. } => Recovery::Retry,
            Self::SessionExpired { .. } | Self::Renewal { .. } => Recovery::Reauthenticate,
            _ => Recovery::Abort,
        }
    }
}

impl From<serde_json::Error> for RestfulError {
    fn from(error: serde_json::Error) -> Self {
        Self::SerDes {
            message: error.to_string(),
        }
    }
}

impl From<url::ParseError> for RestfulError {
    fn from(error: url::ParseError) -> Self {
        Self::InvalidUrl {
            message: error.to_string(),
        }
    }
}
