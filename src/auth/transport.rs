//! Login surfaces: full-page redirect or an embedded browser

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use super::platform::PlatformDetector;
use super::{AuthConfig, AuthError};
use crate::router::Navigator;

/// Navigation started inside the embedded browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadStartEvent {
    pub url: String,
}

/// Page the embedded browser is opened on.
#[derive(Debug, Clone)]
pub struct LoginPage {
    /// Endpoint the form posts to
    pub action: String,
    pub html: String,
}

/// In-process browser hosted by a packaged mobile shell.
pub trait EmbeddedBrowser: Send + Sync {
    /// Open the browser on `page`. Every navigation it starts is reported on
    /// the returned channel until the browser closes.
    fn open(&self, page: &LoginPage) -> Result<mpsc::UnboundedReceiver<LoadStartEvent>>;
    fn close(&self) -> Result<()>;
}

/// What launching a login surface produced.
pub enum Launch {
    /// The app navigated away; the token comes back on the next start.
    Redirected { url: String },
    /// An embedded browser is open and reporting navigations.
    Opened(mpsc::UnboundedReceiver<LoadStartEvent>),
}

/// A way of showing the authorization server's login page.
pub trait LoginTransport: Send + Sync {
    fn name(&self) -> &'static str;
    fn launch(&self, config: &AuthConfig) -> Result<Launch>;
    /// Dismiss the login surface, if there is one to dismiss.
    fn dismiss(&self) -> Result<()>;
}

/// Ordinary web context: send the whole page to the authorize endpoint.
pub struct RedirectTransport {
    navigator: Arc<dyn Navigator>,
}

impl RedirectTransport {
    pub fn new(navigator: Arc<dyn Navigator>) -> Self {
        Self { navigator }
    }
}

impl LoginTransport for RedirectTransport {
    fn name(&self) -> &'static str {
        "redirect"
    }

    fn launch(&self, config: &AuthConfig) -> Result<Launch> {
        let url = config.authorize_redirect_url().to_string();
        tracing::info!("Redirecting to {}", url);
        self.navigator
            .redirect(&url)
            .context("Failed to redirect to the authorize endpoint")?;
        Ok(Launch::Redirected { url })
    }

    fn dismiss(&self) -> Result<()> {
        Ok(())
    }
}

/// Mobile shell: host an auto-submitting login form in the embedded browser.
pub struct EmbeddedBrowserTransport {
    browser: Arc<dyn EmbeddedBrowser>,
}

impl EmbeddedBrowserTransport {
    pub fn new(browser: Arc<dyn EmbeddedBrowser>) -> Self {
        Self { browser }
    }
}

impl LoginTransport for EmbeddedBrowserTransport {
    fn name(&self) -> &'static str {
        "embedded_browser"
    }

    fn launch(&self, config: &AuthConfig) -> Result<Launch> {
        let page = LoginPage {
            action: config.authorize_url.url().to_string(),
            html: config.login_form_html(),
        };
        tracing::info!("Opening embedded browser on {}", page.action);
        let events = self
            .browser
            .open(&page)
            .context("Failed to open embedded browser")?;
        Ok(Launch::Opened(events))
    }

    fn dismiss(&self) -> Result<()> {
        tracing::debug!("Closing embedded browser");
        self.browser.close()
    }
}

/// Pick the login transport for this platform. Done once at startup.
pub fn select_transport(
    detector: &dyn PlatformDetector,
    navigator: Arc<dyn Navigator>,
    browser: Option<Arc<dyn EmbeddedBrowser>>,
) -> Result<Arc<dyn LoginTransport>> {
    if detector.is_mobile_app() {
        let browser = browser.ok_or(AuthError::NoEmbeddedBrowser)?;
        return Ok(Arc::new(EmbeddedBrowserTransport::new(browser)));
    }
    Ok(Arc::new(RedirectTransport::new(navigator)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing::{Journal, RecordingBrowser, RecordingNavigator};
    use crate::auth::Platform;

    #[test]
    fn test_select_transport_by_platform() {
        let journal = Journal::default();
        let navigator: Arc<dyn Navigator> = Arc::new(RecordingNavigator::new(&journal, "/"));
        let browser: Arc<dyn EmbeddedBrowser> = Arc::new(RecordingBrowser::new(&journal));

        let web = select_transport(&Platform::Web, navigator.clone(), Some(browser.clone()))
            .unwrap();
        assert_eq!(web.name(), "redirect");

        let mobile = select_transport(&Platform::MobileApp, navigator.clone(), Some(browser))
            .unwrap();
        assert_eq!(mobile.name(), "embedded_browser");

        let err = select_transport(&Platform::MobileApp, navigator, None).err().unwrap();
        assert!(err.downcast_ref::<AuthError>().is_some());
    }

    #[test]
    fn test_redirect_transport_navigates_away() {
        let journal = Journal::default();
        let navigator = Arc::new(RecordingNavigator::new(&journal, "/"));
        let transport = RedirectTransport::new(navigator);
        let config = AuthConfig::new("https://auth.example.com").unwrap();

        match transport.launch(&config).unwrap() {
            Launch::Redirected { url } => {
                assert!(url.starts_with("https://auth.example.com/oauth/authorize?"));
            }
            Launch::Opened(_) => panic!("web login must not open a browser"),
        }
        assert_eq!(
            journal.entries(),
            vec![format!("redirect {}", config.authorize_redirect_url())]
        );
    }

    #[test]
    fn test_embedded_transport_opens_form() {
        let journal = Journal::default();
        let browser = Arc::new(RecordingBrowser::new(&journal));
        let transport = EmbeddedBrowserTransport::new(browser.clone());
        let config = AuthConfig::new("https://auth.example.com").unwrap();

        assert!(matches!(transport.launch(&config).unwrap(), Launch::Opened(_)));
        let page = browser.opened_page().unwrap();
        assert_eq!(page.action, "https://auth.example.com/oauth/authorize");
        assert!(page.html.contains("response_type"));

        transport.dismiss().unwrap();
        assert_eq!(journal.entries(), vec!["browser open", "browser close"]);
    }
}
