//! Account endpoints

use reqwest::Method;
use serde_json::Value;
use thiserror::Error;

use super::client::ApiClient;
use crate::models::Registration;

/// Registration was refused or never reached the server.
///
/// `payload` is the server's response body, or `None` when the request
/// failed before any body arrived. Validation and transport failures share
/// this one shape; callers branch on the payload.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("registration failed: {}", describe(.payload))]
pub struct RegistrationFailure {
    pub payload: Option<Value>,
}

fn describe(payload: &Option<Value>) -> String {
    match payload {
        Some(Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
        None => "no response from server".to_string(),
    }
}

/// Create an account. Resolves with the response body.
pub async fn register(
    client: &ApiClient,
    registration: &Registration,
) -> Result<Value, RegistrationFailure> {
    tracing::info!("Registering account for {}", registration.email);

    let resp = match client
        .request(Method::POST, "/account/register")
        .json(registration)
        .send()
        .await
    {
        Ok(resp) => resp,
        Err(e) => {
            tracing::warn!("Registration request failed: {}", e);
            return Err(RegistrationFailure { payload: None });
        }
    };

    let status = resp.status();
    let body = match resp.text().await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!("Failed to read registration response: {}", e);
            return Err(RegistrationFailure { payload: None });
        }
    };
    let payload = parse_payload(&body);

    if status.is_success() {
        Ok(payload.unwrap_or(Value::Null))
    } else {
        tracing::debug!("Registration rejected (HTTP {})", status.as_u16());
        Err(RegistrationFailure { payload })
    }
}

/// JSON if it parses, the raw text otherwise, nothing for an empty body.
fn parse_payload(body: &str) -> Option<Value> {
    if body.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string())))
}
