//! Typed auth errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("running as a mobile app but no embedded browser is available")]
    NoEmbeddedBrowser,
}
