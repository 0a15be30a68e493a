//! Authenticated HTTP client for the Voyage API
//!
//! Wraps reqwest::Client. The bearer token is read from the token store when
//! each request is built, so a token captured mid-session is picked up by the
//! next request without any shared default headers.

use anyhow::{bail, Context, Result};
use reqwest::Method;

use crate::auth::tokens::{self, ExpiryPolicy, SharedTokenStore, StoredToken};

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: SharedTokenStore,
    policy: ExpiryPolicy,
}

impl ApiClient {
    pub fn new(base_url: &str, store: SharedTokenStore, policy: ExpiryPolicy) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            store,
            policy,
        }
    }

    /// Token to send right now, after applying the expiry policy.
    pub fn current_token(&self) -> Option<StoredToken> {
        let stored = tokens::lock(&self.store).get_token();
        self.policy.usable(stored)
    }

    /// `Authorization` header value for the next request, if any.
    pub fn authorization(&self) -> Option<String> {
        self.current_token()
            .map(|token| format!("Bearer {}", token.token))
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Start a request against the API, carrying the bearer token if one is usable.
    pub fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = self.url(path);
        tracing::debug!("{} {}", method, url);

        let builder = self.http.request(method, &url);
        match self.current_token() {
            Some(token) => builder.bearer_auth(token.token),
            None => builder,
        }
    }

    /// GET request to the API.
    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        let url = self.url(path);
        let resp = self
            .request(Method::GET, path)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        check_response(resp, &url).await
    }
}

/// Check HTTP response status code and return a clear error on failure.
async fn check_response(resp: reqwest::Response, url: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        bail!(
            "401 Unauthorized for {}. Token may be invalid -- run 'voyage-cli login'.",
            url
        );
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("HTTP {} for {}: {}", status.as_u16(), url, body);
    }
    Ok(resp)
}
