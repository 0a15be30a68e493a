//! Token storage and session state

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Stored access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: String,
    /// Unix seconds. `None` when the redirect carried no usable `expires_in`;
    /// such a token is still kept, its expiry is simply unknown.
    pub expires_at: Option<i64>,
}

impl StoredToken {
    /// Build a token expiring `expires_in_secs` from now.
    pub fn new(token: String, expires_in_secs: Option<i64>) -> Self {
        let expires_at =
            expires_in_secs.and_then(|secs| chrono::Utc::now().timestamp().checked_add(secs));

        Self { token, expires_at }
    }

    /// An unknown expiry counts as expired.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(exp) => chrono::Utc::now().timestamp() >= exp,
            None => true,
        }
    }
}

/// What to do with a stored token whose expiry has passed (or is unknown)
/// when deciding whether the user is signed in and whether to send it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryPolicy {
    /// Send whatever is stored and let the server reject it.
    #[default]
    PassThrough,
    /// Treat an expired token as if none were stored.
    DropExpired,
}

impl ExpiryPolicy {
    pub fn admits(&self, token: &StoredToken) -> bool {
        match self {
            ExpiryPolicy::PassThrough => true,
            ExpiryPolicy::DropExpired => !token.is_expired(),
        }
    }

    /// The token to use for requests, if any.
    pub fn usable(&self, token: Option<StoredToken>) -> Option<StoredToken> {
        token.filter(|t| self.admits(t))
    }
}

/// Derived session state. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthSession {
    Anonymous,
    Authenticated { expires_at: Option<i64> },
    Expired,
}

impl AuthSession {
    pub fn from_token(token: Option<&StoredToken>) -> Self {
        match token {
            None => AuthSession::Anonymous,
            Some(t) if t.is_expired() => AuthSession::Expired,
            Some(t) => AuthSession::Authenticated {
                expires_at: t.expires_at,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthSession::Anonymous => "signed out",
            AuthSession::Authenticated { .. } => "signed in",
            AuthSession::Expired => "expired",
        }
    }
}

/// Token store trait for different storage backends
pub trait TokenStore {
    fn get_token(&self) -> Option<StoredToken>;
    fn set_token(&mut self, token: StoredToken) -> Result<()>;
    fn delete_token(&mut self) -> Result<()>;
}

/// Store handle shared by the auth flow and the API client.
pub type SharedTokenStore = Arc<Mutex<dyn TokenStore + Send>>;

pub fn shared<S: TokenStore + Send + 'static>(store: S) -> SharedTokenStore {
    Arc::new(Mutex::new(store))
}

/// Lock the store, recovering from a poisoned mutex.
pub fn lock(store: &SharedTokenStore) -> MutexGuard<'_, dyn TokenStore + Send + 'static> {
    store.lock().unwrap_or_else(|e| e.into_inner())
}
