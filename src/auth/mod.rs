//! Authentication module for Voyage
//!
//! Implements the OAuth2 implicit grant: the authorization server hands the
//! access token straight back on the redirect URI, either to the app URL
//! (web) or to an embedded browser we watch (mobile shell).

pub mod error;
pub mod oauth;
pub mod params;
pub mod platform;
pub mod tokens;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

use anyhow::Result;
use oauth2::{AuthUrl, ClientId, CsrfToken, RedirectUrl};
use url::Url;

pub use error::AuthError;
pub use oauth::{AuthFlow, LoginOutcome, LoginStarted};
pub use platform::Platform;
pub use tokens::{AuthSession, ExpiryPolicy, StoredToken, TokenStore};

const CLIENT_ID: &str = "client-super";
const REDIRECT_URI: &str = "http://localhost:3000/#/?fix=1";
const RESPONSE_TYPE: &str = "token";
const LOGIN_STATE_VALUE: &str = "voyage-login";

/// OAuth2 client configuration for the Voyage authorization server
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub client_id: ClientId,
    pub redirect_uri: RedirectUrl,
    /// `<SERVER_URL>/oauth/authorize`
    pub authorize_url: AuthUrl,
    /// Static `state` sent by the embedded login form
    pub state: CsrfToken,
}

impl AuthConfig {
    pub fn new(server_url: &str) -> Result<Self> {
        Ok(Self {
            client_id: ClientId::new(CLIENT_ID.to_string()),
            redirect_uri: RedirectUrl::new(REDIRECT_URI.to_string())?,
            authorize_url: AuthUrl::new(format!(
                "{}/oauth/authorize",
                server_url.trim_end_matches('/')
            ))?,
            state: CsrfToken::new(LOGIN_STATE_VALUE.to_string()),
        })
    }

    /// Full-page authorize URL used by the web redirect.
    pub fn authorize_redirect_url(&self) -> Url {
        let mut url = self.authorize_url.url().clone();
        url.query_pairs_mut()
            .append_pair("client_id", self.client_id.as_str())
            .append_pair("redirect_uri", self.redirect_uri.url().as_str())
            .append_pair("response_type", RESPONSE_TYPE);
        url
    }

    /// Parameters posted by the embedded login form.
    pub fn form_fields(&self) -> [(&'static str, &str); 4] {
        [
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", self.redirect_uri.url().as_str()),
            ("response_type", RESPONSE_TYPE),
            ("state", self.state.secret().as_str()),
        ]
    }

    /// Page that immediately POSTs the login form to the authorize endpoint.
    pub fn login_form_html(&self) -> String {
        let inputs: String = self
            .form_fields()
            .iter()
            .map(|(name, value)| {
                format!(
                    "    <input type=\"hidden\" name=\"{}\" value=\"{}\">\n",
                    name,
                    escape_attr(value)
                )
            })
            .collect();

        format!(
            "<!DOCTYPE html>\n<html>\n<body onload=\"document.forms[0].submit()\">\n  \
             <form method=\"post\" action=\"{}\">\n{}  </form>\n</body>\n</html>\n",
            escape_attr(self.authorize_url.url().as_str()),
            inputs
        )
    }
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
