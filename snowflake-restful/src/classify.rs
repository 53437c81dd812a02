//! Response classification.
//!
//! [`classify`] maps an HTTP status and a raw body onto exactly one
//! [`Outcome`]. It is pure and total: every input produces an outcome and
//! nothing is logged or mutated.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{RestfulError, RestfulResult};
use crate::response::ExecResponse;

/// Longest body excerpt carried into error messages.
const BODY_EXCERPT_LEN: usize = 256;

/// Classification of one HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The service accepted the request.
    Success(ExecResponse<T>),
    /// An infra-availability status, or an OK status with an undecodable body.
    Transient {
        /// The HTTP status
        status: u16,
        /// What made the response unusable
        message: String,
    },
    /// The session token has expired.
    SessionExpired(ExecResponse<T>),
    /// The service refused the request, or denied permission.
    Fatal {
        /// The HTTP status
        status: u16,
        /// Response code, empty when the status itself was the refusal
        code: String,
        /// Message reported by the service
        message: String,
    },
    /// A status outside the known families.
    Unexpected {
        /// The HTTP status
        status: u16,
    },
}

impl<T> Outcome<T> {
    /// Returns true for [`Outcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns true for [`Outcome::SessionExpired`].
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired(_))
    }

    /// Converts this outcome into a result; every non-success becomes an error.
    ///
    /// `url` is only used to annotate unexpected statuses.
    pub fn into_result(self, url: &Url) -> RestfulResult<ExecResponse<T>> {
        match self {
            Self::Success(response) => Ok(response),
            Self::Transient { status, message } => {
                Err(RestfulError::transient(message, Some(status)))
            }
            Self::SessionExpired(response) => Err(RestfulError::session_expired(response.message)),
            Self::Fatal {
                status,
                code,
                message,
            } => Err(RestfulError::fatal(code, message, Some(status))),
            Self::Unexpected { status } => Err(RestfulError::Unexpected {
                status,
                url: redacted_url(url),
            }),
        }
    }
}

/// Returns true for the statuses of a server that is temporarily unreachable.
pub fn is_availability_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Classifies a response by status and body.
///
/// The session-expired code is checked before `success`, so a response
/// carrying it always leads to renewal.
///
/// # Examples
///
/// ```
/// use reqwest::StatusCode;
/// use snowflake_restful::classify::{classify, Outcome};
///
/// let body = br#"{"success": true, "code": "0", "message": "", "data": {}}"#;
/// let outcome = classify::<serde_json::Value>(StatusCode::OK, body);
/// assert!(outcome.is_success());
///
/// let outcome = classify::<serde_json::Value>(StatusCode::BAD_GATEWAY, b"");
/// assert!(matches!(outcome, Outcome::Transient { status: 502, .. }));
/// ```
pub fn classify<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Outcome<T> {
    if status != StatusCode::OK {
        let code = status.as_u16();
        if is_availability_status(status) {
            return Outcome::Transient {
                status: code,
                message: format!("service unavailable ({status}): {}", excerpt(body)),
            };
        }
        if status == StatusCode::FORBIDDEN {
            return Outcome::Fatal {
                status: code,
                code: String::new(),
                message: format!("permission denied ({status}): {}", excerpt(body)),
            };
        }
        return Outcome::Unexpected { status: code };
    }

    let response: ExecResponse<T> = match serde_json::from_slice(body) {
        Ok(response) => response,
        Err(e) => {
            return Outcome::Transient {
                status: status.as_u16(),
                message: format!("failed to decode response body: {e}"),
            }
        }
    };

    if response.is_session_expired() {
        Outcome::SessionExpired(response)
    } else if response.success {
        Outcome::Success(response)
    } else {
        Outcome::Fatal {
            status: status.as_u16(),
            code: response.code,
            message: response.message,
        }
    }
}

fn excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    match text.char_indices().nth(BODY_EXCERPT_LEN) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.into_owned(),
    }
}

// Error messages reach end users; keep the query string out of them.
fn redacted_url(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}
