//! Embedded browser stand-in for the terminal
//!
//! The login page is written to disk for the user to open; every address the
//! browser then shows is pasted back on stdin and reported as a navigation.

use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use crate::auth::transport::{EmbeddedBrowser, LoadStartEvent, LoginPage};

pub struct TerminalBrowser {
    dir: PathBuf,
    /// Run flag of the current reader thread. The thread itself is detached:
    /// a blocked stdin read cannot be interrupted, so nothing may join it.
    reader: Mutex<Option<Arc<AtomicBool>>>,
}

impl TerminalBrowser {
    /// `dir` receives the generated login page.
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            reader: Mutex::new(None),
        }
    }

    /// Start forwarding lines from `input` as navigations, replacing any
    /// previous reader.
    fn listen<R>(&self, input: R) -> Result<mpsc::UnboundedReceiver<LoadStartEvent>>
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let active = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&active);

        std::thread::Builder::new()
            .name("browser-input".to_string())
            .spawn(move || pump_lines(input, tx, &flag))
            .context("Failed to start browser input reader")?;

        if let Some(old) = self
            .reader
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(active)
        {
            old.store(false, Ordering::Release);
        }
        Ok(rx)
    }

    #[cfg(test)]
    fn is_listening(&self) -> bool {
        self.reader
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

impl EmbeddedBrowser for TerminalBrowser {
    fn open(&self, page: &LoginPage) -> Result<mpsc::UnboundedReceiver<LoadStartEvent>> {
        let path = write_page(&self.dir, page)?;

        println!();
        println!("Open this file in a browser to sign in:");
        println!("  {}", path.display());
        println!();
        println!("Paste each address the browser shows (Ctrl+C to give up):");

        self.listen(std::io::BufReader::new(std::io::stdin()))
    }

    fn close(&self) -> Result<()> {
        if let Some(active) = self.reader.lock().unwrap_or_else(|e| e.into_inner()).take() {
            active.store(false, Ordering::Release);
        }
        Ok(())
    }
}

fn write_page(dir: &Path, page: &LoginPage) -> Result<PathBuf> {
    fs::create_dir_all(dir).context("Failed to create login page directory")?;
    let path = dir.join("login.html");
    fs::write(&path, &page.html).context("Failed to write login page")?;
    tracing::debug!("Wrote login page for {} to {}", page.action, path.display());
    Ok(path)
}

/// Forward non-empty lines as navigations until input ends, the browser is
/// closed or nobody listens. Runs on its own thread.
fn pump_lines<R: BufRead>(reader: R, tx: mpsc::UnboundedSender<LoadStartEvent>, active: &AtomicBool) {
    for line in reader.lines() {
        if !active.load(Ordering::Acquire) {
            break;
        }
        match line {
            Ok(line) => {
                let url = line.trim();
                if url.is_empty() {
                    continue;
                }
                if tx.send(LoadStartEvent { url: url.to_string() }).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!("Failed to read browser address: {}", e);
                break;
            }
        }
    }
}
