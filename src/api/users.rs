//! Users endpoint, used to check that the stored token is accepted

use anyhow::{Context, Result};
use serde_json::Value;

use super::client::ApiClient;

/// Fetch `/users` and log what came back.
pub async fn list_users(client: &ApiClient) -> Result<Value> {
    let resp = client.get("/users").await?;
    let users: Value = resp.json().await.context("Failed to parse /users response")?;
    tracing::info!("Fetched /users");
    tracing::debug!("{}", users);
    Ok(users)
}

/// Like [`list_users`], but returns `None` without calling the API when the
/// expiry policy leaves no token to send.
pub async fn list_users_if_signed_in(client: &ApiClient) -> Result<Option<Value>> {
    if client.current_token().is_none() {
        tracing::info!("No usable token, skipping /users");
        return Ok(None);
    }
    list_users(client).await.map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_server;
    use crate::auth::testing::{Journal, MemoryTokenStore};
    use crate::auth::tokens::shared;
    use crate::auth::{ExpiryPolicy, StoredToken};

    #[tokio::test]
    async fn test_list_users_returns_body() {
        let (base, _request) = test_server::serve_once(200, r#"[{"id":"u1"}]"#).await;
        let journal = Journal::default();
        let token = StoredToken::new("t".to_string(), Some(60));
        let client = ApiClient::new(
            &base,
            shared(MemoryTokenStore::new(&journal, Some(token))),
            ExpiryPolicy::PassThrough,
        );

        let users = list_users(&client).await.unwrap();
        assert_eq!(users[0]["id"], "u1");
    }

    #[tokio::test]
    async fn test_expired_token_skips_request_under_drop_expired() {
        let journal = Journal::default();
        let expired = StoredToken {
            token: "old".to_string(),
            expires_at: Some(0),
        };
        // Nothing listens here; a request would fail instead of returning None.
        let client = ApiClient::new(
            "http://127.0.0.1:9",
            shared(MemoryTokenStore::new(&journal, Some(expired))),
            ExpiryPolicy::DropExpired,
        );

        assert!(list_users_if_signed_in(&client).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_signed_in_lists_users() {
        let (base, request) = test_server::serve_once(200, r#"[]"#).await;
        let journal = Journal::default();
        let token = StoredToken::new("t".to_string(), Some(60));
        let client = ApiClient::new(
            &base,
            shared(MemoryTokenStore::new(&journal, Some(token))),
            ExpiryPolicy::DropExpired,
        );

        let users = list_users_if_signed_in(&client).await.unwrap();
        assert_eq!(users, Some(serde_json::json!([])));
        assert!(request.await.unwrap().contains("Bearer t"));
    }
}
