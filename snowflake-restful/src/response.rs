//! Response bodies returned by the query service.

use serde::{Deserialize, Deserializer, Serialize};

/// Response code telling the client its session token has expired.
pub const SESSION_EXPIRED_CODE: &str = "390112";

/// Response code of a query that is still running.
pub const QUERY_IN_PROGRESS_CODE: &str = "333333";

/// Response code of an asynchronously submitted query that is still running.
pub const QUERY_IN_PROGRESS_ASYNC_CODE: &str = "333334";

/// The envelope every service endpoint answers with.
///
/// `data` is opaque to this crate; for queries it is left as JSON for the
/// result-decoding layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecResponse<T = serde_json::Value> {
    /// Endpoint-specific payload
    pub data: Option<T>,

    /// Human-readable message, empty on success
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,

    /// Response code; empty or a numeric string
    #[serde(default, deserialize_with = "null_as_empty")]
    pub code: String,

    /// Whether the request succeeded
    pub success: bool,
}

impl<T> ExecResponse<T> {
    /// Creates a successful response carrying `data`.
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            message: String::new(),
            code: String::new(),
            success: true,
        }
    }

    /// Creates a failed response with the given code and message.
    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            data: None,
            message: message.into(),
            code: code.into(),
            success: false,
        }
    }

    /// Returns true if `code` is the session-expired sentinel.
    pub fn is_session_expired(&self) -> bool {
        self.code == SESSION_EXPIRED_CODE
    }

    /// Returns true if the query behind this response is still running.
    pub fn is_in_progress(&self) -> bool {
        self.code == QUERY_IN_PROGRESS_CODE || self.code == QUERY_IN_PROGRESS_ASYNC_CODE
    }
}

impl ExecResponse<serde_json::Value> {
    /// The server-assigned query id, when present.
    pub fn query_id(&self) -> Option<&str> {
        self.data_str("queryId")
    }

    /// The path to poll for the outcome of a query still in progress.
    pub fn result_url(&self) -> Option<&str> {
        self.data_str("getResultUrl")
    }

    fn data_str(&self, key: &str) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|data| data.get(key))
            .and_then(|value| value.as_str())
            .filter(|value| !value.is_empty())
    }
}

/// Payload of a successful session renewal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewSessionData {
    /// The new session token
    pub session_token: String,
    /// Lifetime of the session token, in seconds
    #[serde(default, rename = "validityInSecondsST")]
    pub validity_in_seconds_st: i64,
    /// The new master token
    pub master_token: String,
    /// Lifetime of the master token, in seconds
    #[serde(default, rename = "validityInSecondsMT")]
    pub validity_in_seconds_mt: i64,
    /// Server-assigned session id
    #[serde(default)]
    pub session_id: i64,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
