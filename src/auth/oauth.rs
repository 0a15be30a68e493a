//! OAuth2 implicit-grant flow: startup check, login start, token capture

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use super::params::RedirectParams;
use super::tokens::{self, AuthSession, SharedTokenStore, StoredToken};
use super::transport::{Launch, LoadStartEvent, LoginTransport};
use super::AuthConfig;
use crate::api::{self, ApiClient, RegistrationFailure};
use crate::models::Registration;
use crate::router::{Navigator, LOGIN_STATE};

/// Result of starting a login.
pub enum LoginStarted {
    /// Left the app for the authorize page. The token arrives on the
    /// redirect and is picked up by the next [`AuthFlow::initialize`].
    Redirected { url: String },
    /// Embedded browser open; await [`PendingLogin::wait`].
    Pending(PendingLogin),
}

/// How an embedded login ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Completed(StoredToken),
    /// Cancelled by logout or by a newer login.
    Cancelled,
    /// The browser stopped reporting navigations without a token.
    Abandoned,
}

/// State shared between the flow and its pending embedded logins.
struct Shared {
    store: SharedTokenStore,
    navigator: Arc<dyn Navigator>,
    transport: Arc<dyn LoginTransport>,
    api: ApiClient,
    pending: Mutex<Option<(u64, oneshot::Sender<()>)>>,
}

impl Shared {
    fn capture(&self, params: &RedirectParams) -> Result<StoredToken> {
        let token = StoredToken::new(params.access_token.clone(), params.expires_in);
        if token.expires_at.is_none() {
            tracing::warn!("expires_in missing or malformed, storing token with unknown expiry");
        }
        tokens::lock(&self.store)
            .set_token(token.clone())
            .context("Failed to store access token")?;
        tracing::info!("Access token stored");
        Ok(token)
    }

    fn attach_bearer(&self) -> bool {
        match self.api.authorization() {
            Some(_) => {
                tracing::debug!("Bearer token attached to outgoing requests");
                true
            }
            None => {
                tracing::debug!("No usable token for outgoing requests");
                false
            }
        }
    }

    /// Token capture for one embedded browser navigation. Persisting and
    /// attaching happen before the browser closes; the route change is last.
    fn on_load_start(&self, event: &LoadStartEvent) -> Result<Option<StoredToken>> {
        tracing::debug!("Embedded browser navigation started");
        let Some(params) = RedirectParams::from_url(&event.url) else {
            return Ok(None);
        };

        let token = self.capture(&params)?;
        self.attach_bearer();
        self.transport
            .dismiss()
            .context("Failed to close embedded browser")?;
        self.navigator
            .clear_history()
            .context("Failed to clear navigation history")?;
        self.navigator.set_url("/")?;
        Ok(Some(token))
    }

    fn cancel_pending(&self) -> bool {
        let pending = self.pending.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some((id, cancel)) = pending else {
            return false;
        };
        tracing::debug!("Cancelling login #{}", id);
        let _ = cancel.send(());
        if let Err(e) = self.transport.dismiss() {
            tracing::warn!("Failed to dismiss login surface: {:#}", e);
        }
        true
    }

    fn release(&self, id: u64) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if pending.as_ref().is_some_and(|(current, _)| *current == id) {
            pending.take();
        }
    }
}

/// Owns the access token lifecycle and decides when navigation must change.
pub struct AuthFlow {
    config: AuthConfig,
    shared: Arc<Shared>,
    /// Last token value taken from a redirect URL; the same redirect is not
    /// consumed twice.
    consumed: Mutex<Option<String>>,
    next_login: AtomicU64,
}

impl AuthFlow {
    pub fn new(
        config: AuthConfig,
        store: SharedTokenStore,
        navigator: Arc<dyn Navigator>,
        transport: Arc<dyn LoginTransport>,
        api: ApiClient,
    ) -> Self {
        Self {
            config,
            shared: Arc::new(Shared {
                store,
                navigator,
                transport,
                api,
                pending: Mutex::new(None),
            }),
            consumed: Mutex::new(None),
            next_login: AtomicU64::new(1),
        }
    }

    /// Run on startup. Sends the user to login when there is neither a token
    /// nor a redirect carrying one, and stores the token from a redirect.
    pub fn initialize(&self) -> Result<AuthSession> {
        let url = self.shared.navigator.current_url();
        let redirect = RedirectParams::from_url(&url);

        if redirect.is_none() && self.shared.api.current_token().is_none() {
            tracing::info!("No token found, redirecting to login");
            self.shared.navigator.go(LOGIN_STATE)?;
        }

        if let Some(params) = redirect {
            let mut consumed = self.consumed.lock().unwrap_or_else(|e| e.into_inner());
            if consumed.as_deref() == Some(params.access_token.as_str()) {
                tracing::debug!("Redirect token already captured");
            } else {
                tracing::info!("Entered from OAuth redirect");
                self.shared.capture(&params)?;
                *consumed = Some(params.access_token);
            }
        }

        self.shared.attach_bearer();
        Ok(self.session())
    }

    /// Begin the implicit grant on whichever transport this platform uses.
    /// Any unfinished embedded login is cancelled first.
    pub fn start_login(&self) -> Result<LoginStarted> {
        if self.shared.cancel_pending() {
            tracing::info!("Replacing unfinished login");
        }

        tracing::info!("Starting login via {}", self.shared.transport.name());
        match self.shared.transport.launch(&self.config)? {
            Launch::Redirected { url } => Ok(LoginStarted::Redirected { url }),
            Launch::Opened(events) => {
                let id = self.next_login.fetch_add(1, Ordering::Relaxed);
                let (cancel_tx, cancel_rx) = oneshot::channel();
                *self.shared.pending.lock().unwrap_or_else(|e| e.into_inner()) =
                    Some((id, cancel_tx));
                tracing::debug!("Login #{} waiting on embedded browser", id);

                Ok(LoginStarted::Pending(PendingLogin {
                    id,
                    events,
                    cancelled: cancel_rx,
                    shared: Arc::clone(&self.shared),
                }))
            }
        }
    }

    /// Cancel an unfinished embedded login. Returns false if there was none.
    pub fn cancel_login(&self) -> bool {
        self.shared.cancel_pending()
    }

    pub async fn register(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<Value, RegistrationFailure> {
        let registration = Registration {
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            password: password.to_string(),
            confirm_password: confirm_password.to_string(),
        };
        api::register(&self.shared.api, &registration).await
    }

    /// Delete the token and go to login, whatever the current state.
    pub fn logout(&self) -> Result<()> {
        if self.shared.cancel_pending() {
            tracing::info!("Cancelled pending login");
        }
        tokens::lock(&self.shared.store)
            .delete_token()
            .context("Failed to delete access token")?;
        tracing::info!("Access token deleted");
        self.shared.navigator.go(LOGIN_STATE)
    }

    pub fn session(&self) -> AuthSession {
        let token = tokens::lock(&self.shared.store).get_token();
        AuthSession::from_token(token.as_ref())
    }

    pub fn stored_token(&self) -> Option<StoredToken> {
        tokens::lock(&self.shared.store).get_token()
    }
}

/// An embedded login waiting for the browser to reach the redirect URI.
pub struct PendingLogin {
    id: u64,
    events: mpsc::UnboundedReceiver<LoadStartEvent>,
    cancelled: oneshot::Receiver<()>,
    shared: Arc<Shared>,
}

impl PendingLogin {
    /// Watch browser navigations until one carries a token. There is no
    /// timeout: if the browser never navigates, this never resolves.
    pub async fn wait(mut self) -> Result<LoginOutcome> {
        loop {
            tokio::select! {
                biased;
                _ = &mut self.cancelled => {
                    tracing::info!("Login #{} cancelled", self.id);
                    return Ok(LoginOutcome::Cancelled);
                }
                event = self.events.recv() => {
                    let Some(event) = event else {
                        tracing::info!("Embedded browser closed before login completed");
                        self.shared.release(self.id);
                        return Ok(LoginOutcome::Abandoned);
                    };
                    match self.shared.on_load_start(&event) {
                        Ok(None) => {}
                        Ok(Some(token)) => {
                            self.shared.release(self.id);
                            tracing::info!("Login #{} complete", self.id);
                            return Ok(LoginOutcome::Completed(token));
                        }
                        Err(e) => {
                            self.shared.release(self.id);
                            return Err(e);
                        }
                    }
                }
            }
        }
    }
}
