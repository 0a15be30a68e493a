//! Execution context detection

use serde::{Deserialize, Serialize};

/// Reports where the client is running.
pub trait PlatformDetector {
    /// True inside a packaged mobile shell with an embedded browser.
    fn is_mobile_app(&self) -> bool;
}

/// Configured execution context.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Ordinary web page: login is a full-page redirect.
    #[default]
    Web,
    /// Packaged mobile shell: login runs in an embedded browser.
    MobileApp,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Web => "web",
            Platform::MobileApp => "mobile_app",
        }
    }
}

impl PlatformDetector for Platform {
    fn is_mobile_app(&self) -> bool {
        matches!(self, Platform::MobileApp)
    }
}
