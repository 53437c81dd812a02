//! Session token storage.
//!
//! The [`TokenStore`] is the only piece of mutable state shared between
//! concurrent requests on one client. Reads and writes go through a single
//! `RwLock` so a reader always sees a complete snapshot.

use std::fmt;

use tokio::sync::RwLock;

/// A snapshot of the credentials of one server-side session.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionTokens {
    /// Short-lived token that authorizes requests
    pub session_token: String,
    /// Longer-lived token used only to renew the session token
    pub master_token: String,
    /// Server-assigned session id
    pub session_id: i64,
}

impl SessionTokens {
    /// Creates a new token snapshot.
    pub fn new(
        session_token: impl Into<String>,
        master_token: impl Into<String>,
        session_id: i64,
    ) -> Self {
        Self {
            session_token: session_token.into(),
            master_token: master_token.into(),
            session_id,
        }
    }
}

// Tokens are bearer credentials; keep them out of logs and panic messages.
impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokens")
            .field("session_token", &"<redacted>")
            .field("master_token", &"<redacted>")
            .field("session_id", &self.session_id)
            .finish()
    }
}

/// Holds the current [`SessionTokens`] of a client.
///
/// The store does not decide who may renew; callers that renew must
/// serialize themselves (see `RestfulClient::renew_session`).
#[derive(Debug, Default)]
pub struct TokenStore {
    tokens: RwLock<SessionTokens>,
}

impl TokenStore {
    /// Creates a store holding the given tokens.
    pub fn new(tokens: SessionTokens) -> Self {
        Self {
            tokens: RwLock::new(tokens),
        }
    }

    /// Returns the latest snapshot.
    pub async fn current(&self) -> SessionTokens {
        self.tokens.read().await.clone()
    }

    /// Installs a new snapshot, replacing the whole previous one.
    pub async fn replace(&self, tokens: SessionTokens) {
        let mut guard = self.tokens.write().await;
        *guard = tokens;
    }
}
