//! Identity service over REST (`accounts:*` endpoints).
//!
//! The API key is checked locally before every call: a placeholder key
//! (unconfigured or pending) is never put on the wire.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use url::Url;

use vitrine_core::credentials::{CredentialField, FieldState};
use vitrine_core::{Credentials, User};

use super::{error_from_response, transport_error, SessionTokens, TokenInfo};
use crate::provider::{AuthCallback, IdentityProvider, ProviderError, ProviderResult, Registration};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    id_token: String,
    local_id: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

impl AuthResponse {
    fn token(&self) -> TokenInfo {
        TokenInfo::new(
            self.id_token.clone(),
            self.refresh_token.clone(),
            TokenInfo::expires_in(self.expires_in.as_deref()),
        )
    }

    fn into_user(self) -> User {
        User {
            uid: self.local_id,
            email: self.email.filter(|e| !e.is_empty()),
            display_name: self.display_name.filter(|n| !n.is_empty()),
            photo_url: None,
        }
    }
}

/// Identity provider backed by the public identity REST API.
pub struct RestIdentity {
    http: reqwest::Client,
    api_key: String,
    key_state: FieldState,
    base: String,
    tokens: SessionTokens,
}

impl RestIdentity {
    pub fn new(
        http: reqwest::Client,
        credentials: &Credentials,
        tokens: SessionTokens,
        base: impl Into<String>,
    ) -> Self {
        RestIdentity {
            http,
            api_key: credentials.api_key.clone(),
            key_state: credentials.field_state(CredentialField::ApiKey),
            base: base.into(),
            tokens,
        }
    }

    fn endpoint(&self, method: &str) -> ProviderResult<Url> {
        let env_var = CredentialField::ApiKey.env_var();
        match self.key_state {
            FieldState::Resolved if !self.api_key.trim().is_empty() => {}
            FieldState::Pending => {
                return Err(ProviderError::new(
                    "invalid-api-key",
                    format!("{} is still pending (service-account-only deployment)", env_var),
                ));
            }
            _ => {
                return Err(ProviderError::new(
                    "invalid-api-key",
                    format!("{} is not configured", env_var),
                ));
            }
        }
        Url::parse_with_params(
            &format!("{}/accounts:{}", self.base, method),
            &[("key", self.api_key.as_str())],
        )
        .map_err(|e| ProviderError::new("invalid-argument", e.to_string()))
    }

    async fn call(&self, method: &str, body: Value) -> ProviderResult<User> {
        let url = self.endpoint(method)?;
        debug!(method, "Identity request");

        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let auth: AuthResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::new("invalid-response", e.to_string()))?;

        self.tokens.start(auth.token()).await;
        let user = auth.into_user();
        info!(uid = %user.uid, method, "Identity session started");
        self.tokens.notify(Some(user.clone()));
        Ok(user)
    }
}

#[async_trait]
impl IdentityProvider for RestIdentity {
    async fn sign_in_anonymously(&self) -> ProviderResult<User> {
        self.call("signUp", json!({ "returnSecureToken": true }))
            .await
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> ProviderResult<User> {
        self.call(
            "signInWithPassword",
            json!({ "email": email, "password": password, "returnSecureToken": true }),
        )
        .await
    }

    async fn register(&self, email: &str, password: &str) -> ProviderResult<User> {
        self.call(
            "signUp",
            json!({ "email": email, "password": password, "returnSecureToken": true }),
        )
        .await
    }

    /// Sessions are bearer tokens; signing out just forgets them.
    async fn sign_out(&self) -> ProviderResult<()> {
        self.tokens.clear().await;
        self.tokens.notify(None);
        Ok(())
    }

    fn on_auth_state_changed(&self, callback: AuthCallback) -> Registration {
        self.tokens.subscribe(callback)
    }
}
