//! Terminal stand-ins for the app shell: navigation and the embedded browser

mod browser;

pub use browser::TerminalBrowser;

use std::sync::Mutex;

use anyhow::{bail, Result};

use crate::router::{Navigator, RouterHelper, LOGIN_STATE};

/// Navigator that prints where the app would go.
pub struct ConsoleNavigator {
    router: RouterHelper,
    current: Mutex<String>,
    history: Mutex<Vec<String>>,
}

impl ConsoleNavigator {
    pub fn new(router: RouterHelper, url: &str) -> Self {
        Self {
            router,
            current: Mutex::new(url.to_string()),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn router(&self) -> &RouterHelper {
        &self.router
    }

    /// State the current URL resolves to.
    pub fn current_state(&self) -> Option<String> {
        self.router
            .resolve(&self.current_url())
            .map(|s| s.name.clone())
    }

    fn push(&self, url: String) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        let previous = std::mem::replace(&mut *current, url);
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(previous);
    }
}

impl Navigator for ConsoleNavigator {
    fn go(&self, state: &str) -> Result<()> {
        let Some(target) = self.router.get(state) else {
            bail!("Unknown state: {}", state);
        };
        let Some(url) = target.config.url.clone() else {
            bail!("State {} is abstract", state);
        };
        tracing::debug!("Navigating to state {} ({})", state, url);
        self.push(url);

        if state == LOGIN_STATE {
            println!("Not signed in. Run 'voyage-cli login' to authenticate.");
        } else if let Some(title) = &target.config.title {
            println!("-> {}", title);
        }
        Ok(())
    }

    fn current_url(&self) -> String {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set_url(&self, url: &str) -> Result<()> {
        tracing::debug!("Navigating to {}", url);
        self.push(url.to_string());
        if let Some(state) = self.router.resolve(url) {
            if let Some(title) = &state.config.title {
                println!("-> {}", title);
            }
        }
        Ok(())
    }

    fn redirect(&self, href: &str) -> Result<()> {
        println!();
        println!("To sign in, visit: {}", href);
        println!();
        println!("When the browser lands back on the app, run:");
        println!("  voyage-cli callback '<address bar URL>'");
        Ok(())
    }

    fn clear_history(&self) -> Result<()> {
        let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        tracing::debug!("Clearing {} history entries", history.len());
        history.clear();
        Ok(())
    }
}
