//! Recording collaborators for auth tests

use std::sync::{Arc, Mutex};

use anyhow::Result;
use tokio::sync::mpsc;

use super::tokens::{StoredToken, TokenStore};
use super::transport::{EmbeddedBrowser, LoadStartEvent, LoginPage};
use crate::router::Navigator;

/// Ordered log of side effects shared by the fakes below.
#[derive(Clone, Default)]
pub struct Journal {
    inner: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.inner.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.inner.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| e.as_str() == entry).count()
    }
}

pub struct MemoryTokenStore {
    token: Option<StoredToken>,
    journal: Journal,
    writable: bool,
}

impl MemoryTokenStore {
    pub fn new(journal: &Journal, token: Option<StoredToken>) -> Self {
        Self {
            token,
            journal: journal.clone(),
            writable: true,
        }
    }

    /// Store whose `set_token` always fails, like a read-only config file.
    pub fn read_only(journal: &Journal, token: Option<StoredToken>) -> Self {
        Self {
            writable: false,
            ..Self::new(journal, token)
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get_token(&self) -> Option<StoredToken> {
        self.token.clone()
    }

    fn set_token(&mut self, token: StoredToken) -> Result<()> {
        if !self.writable {
            anyhow::bail!("token store is read-only");
        }
        self.journal.record(format!("store set {}", token.token));
        self.token = Some(token);
        Ok(())
    }

    fn delete_token(&mut self) -> Result<()> {
        self.journal.record("store delete");
        self.token = None;
        Ok(())
    }
}

pub struct RecordingNavigator {
    current: Mutex<String>,
    journal: Journal,
}

impl RecordingNavigator {
    pub fn new(journal: &Journal, url: &str) -> Self {
        Self {
            current: Mutex::new(url.to_string()),
            journal: journal.clone(),
        }
    }
}

impl Navigator for RecordingNavigator {
    fn go(&self, state: &str) -> Result<()> {
        self.journal.record(format!("go {}", state));
        Ok(())
    }

    fn current_url(&self) -> String {
        self.current.lock().unwrap().clone()
    }

    fn set_url(&self, url: &str) -> Result<()> {
        self.journal.record(format!("set_url {}", url));
        *self.current.lock().unwrap() = url.to_string();
        Ok(())
    }

    fn redirect(&self, href: &str) -> Result<()> {
        self.journal.record(format!("redirect {}", href));
        Ok(())
    }

    fn clear_history(&self) -> Result<()> {
        self.journal.record("clear_history");
        Ok(())
    }
}

pub struct RecordingBrowser {
    events: Mutex<Option<mpsc::UnboundedSender<LoadStartEvent>>>,
    page: Mutex<Option<LoginPage>>,
    journal: Journal,
}

impl RecordingBrowser {
    pub fn new(journal: &Journal) -> Self {
        Self {
            events: Mutex::new(None),
            page: Mutex::new(None),
            journal: journal.clone(),
        }
    }

    pub fn opened_page(&self) -> Option<LoginPage> {
        self.page.lock().unwrap().clone()
    }

    /// Simulate the browser starting to load `url`.
    pub fn navigate(&self, url: &str) {
        let guard = self.events.lock().unwrap();
        let tx = guard.as_ref().expect("browser not open");
        tx.send(LoadStartEvent {
            url: url.to_string(),
        })
        .expect("listener gone");
    }

    /// Simulate the user closing the browser without finishing.
    pub fn abandon(&self) {
        self.events.lock().unwrap().take();
    }
}

impl EmbeddedBrowser for RecordingBrowser {
    fn open(&self, page: &LoginPage) -> Result<mpsc::UnboundedReceiver<LoadStartEvent>> {
        self.journal.record("browser open");
        let (tx, rx) = mpsc::unbounded_channel();
        *self.events.lock().unwrap() = Some(tx);
        *self.page.lock().unwrap() = Some(page.clone());
        Ok(rx)
    }

    fn close(&self) -> Result<()> {
        self.journal.record("browser close");
        Ok(())
    }
}
