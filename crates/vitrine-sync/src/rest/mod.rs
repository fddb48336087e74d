//! # REST Adapter
//!
//! Adapts the managed identity and document services' public REST
//! endpoints to the capability traits in [`crate::provider`].
//!
//! ## Components
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  RestIdentity ──── accounts:signUp / accounts:signInWithPassword       │
//! │        │                                                                │
//! │        │ starts session (id + refresh token, expiry)                    │
//! │        ▼                                                                │
//! │   SessionTokens (shared) ──── /token refresh before expiry              │
//! │        │                                                                │
//! │        │ bearer() (Authorization: Bearer)                               │
//! │        ▼                                                                │
//! │  RestStore ──► RestConnection ── list / documents:commit / poll task   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No request is retried. Transport failures map to `unavailable`.

mod firestore;
mod identity;
#[cfg(test)]
mod stub;
mod token;

pub use firestore::{RestConnection, RestStore};
pub use identity::RestIdentity;
pub use token::{SessionTokens, TokenInfo};

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use vitrine_core::Credentials;

use crate::config::BackendSettings;
use crate::provider::{ProviderError, PERMISSION_DENIED, UNAVAILABLE};

const IDENTITY_BASE: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_BASE: &str = "https://securetoken.googleapis.com/v1";
const FIRESTORE_BASE: &str = "https://firestore.googleapis.com/v1";

/// Base URLs of the three services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub identity: String,
    pub secure_token: String,
    pub firestore: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            identity: IDENTITY_BASE.to_string(),
            secure_token: SECURE_TOKEN_BASE.to_string(),
            firestore: FIRESTORE_BASE.to_string(),
        }
    }
}

impl Endpoints {
    /// Production endpoints, with emulator hosts substituted when configured.
    ///
    /// The auth emulator serves both identity APIs under their host names.
    pub fn from_settings(settings: &BackendSettings) -> Self {
        let mut endpoints = Endpoints::default();
        if let Some(host) = settings.auth_emulator_host.as_deref() {
            endpoints.identity = format!("http://{}/identitytoolkit.googleapis.com/v1", host);
            endpoints.secure_token = format!("http://{}/securetoken.googleapis.com/v1", host);
        }
        if let Some(host) = settings.firestore_emulator_host.as_deref() {
            endpoints.firestore = format!("http://{}/v1", host);
        }
        endpoints
    }
}

/// Builds an identity provider and a store sharing one HTTP client and session.
pub fn backend(
    credentials: &Credentials,
    settings: &BackendSettings,
) -> (Arc<RestIdentity>, Arc<RestStore>) {
    let endpoints = Endpoints::from_settings(settings);
    if endpoints != Endpoints::default() {
        info!(?endpoints, "Using emulator endpoints");
    }

    let http = reqwest::Client::new();
    let tokens = SessionTokens::new(
        http.clone(),
        credentials.api_key.clone(),
        endpoints.secure_token,
    );
    let identity = RestIdentity::new(http.clone(), credentials, tokens.clone(), endpoints.identity);
    let store = RestStore::new(
        http,
        tokens,
        Duration::from_secs(settings.poll_interval_secs),
        endpoints.firestore,
    );
    (Arc::new(identity), Arc::new(store))
}

// =============================================================================
// Error Mapping
// =============================================================================

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// `PERMISSION_DENIED` -> `permission-denied`
fn kebab(code: &str) -> String {
    code.trim().to_ascii_lowercase().replace('_', "-")
}

fn is_upper_snake(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_uppercase() || c == '_')
}

fn code_for_http_status(status: u16) -> &'static str {
    match status {
        401 | 403 => PERMISSION_DENIED,
        429 | 502 | 503 | 504 => UNAVAILABLE,
        404 => "not-found",
        400 => "invalid-argument",
        _ => "unknown",
    }
}

/// Maps an error response to a provider error.
///
/// The store reports a canonical `status`; the identity service puts an
/// upper-snake code at the start of `message`.
pub(crate) fn parse_error(http_status: u16, body: &str) -> ProviderError {
    let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) else {
        let message = if body.trim().is_empty() {
            format!("HTTP {}", http_status)
        } else {
            body.trim().to_string()
        };
        return ProviderError::new(code_for_http_status(http_status), message);
    };

    let ErrorBody { message, status } = envelope.error;
    if let Some(status) = status.filter(|s| !s.is_empty()) {
        return ProviderError::new(kebab(&status), message);
    }

    let head = message.split([' ', ':']).next().unwrap_or_default();
    if is_upper_snake(head) {
        return ProviderError::new(kebab(head), message);
    }

    ProviderError::new(code_for_http_status(http_status), message)
}

pub(crate) async fn error_from_response(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    parse_error(status, &body)
}

pub(crate) fn transport_error(err: reqwest::Error) -> ProviderError {
    ProviderError::unavailable(err.to_string())
}
