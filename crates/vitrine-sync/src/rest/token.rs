//! # Session Tokens
//!
//! ID token lifecycle shared by the identity adapter and the store.
//!
//! ## Token Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  sign-in ──► start(TokenInfo { id, refresh, expires_at })              │
//! │                                                                         │
//! │  bearer() ──► still fresh? ──► yes ──► id token                         │
//! │                    │                                                    │
//! │                    no (inside the 5 minute margin)                      │
//! │                    ▼                                                    │
//! │              POST /token (refresh_token grant)                          │
//! │                    │                                                    │
//! │      ┌─────────────┼──────────────────────┐                             │
//! │      ▼             ▼                      ▼                             │
//! │   ok: swap    unavailable: keep      rejected: session ends,           │
//! │   tokens      old token, no notify   listeners get None                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A rejected refresh means the session was revoked or expired elsewhere;
//! the auth gateway learns about it through the same notification path as
//! a local sign-out.

use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use vitrine_core::User;

use super::{error_from_response, transport_error};
use crate::provider::{AuthCallback, ProviderError, ProviderResult, Registration, UNAVAILABLE};

/// Margin before token expiration to trigger refresh (5 minutes)
const REFRESH_MARGIN_SECS: u64 = 300;

/// Lifetime assumed when the service omits or garbles `expiresIn`.
const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

/// Tokens issued for one session.
#[derive(Debug, Clone)]
pub struct TokenInfo {
    /// Bearer token for store requests
    pub id_token: String,
    /// Long-lived token used to mint new ID tokens
    pub refresh_token: String,
    /// When the ID token expires (local time)
    pub expires_at: Instant,
}

impl TokenInfo {
    pub fn new(id_token: String, refresh_token: String, expires_in_secs: u64) -> Self {
        TokenInfo {
            id_token,
            refresh_token,
            expires_at: Instant::now() + Duration::from_secs(expires_in_secs),
        }
    }

    /// Parses the service's string-encoded lifetime.
    pub fn expires_in(raw: Option<&str>) -> u64 {
        raw.and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_EXPIRES_IN_SECS)
    }

    /// Check if the token is expired or about to expire
    pub fn needs_refresh(&self) -> bool {
        let margin = Duration::from_secs(REFRESH_MARGIN_SECS);
        Instant::now() + margin >= self.expires_at
    }

    /// Get remaining valid time
    pub fn remaining_secs(&self) -> u64 {
        self.expires_at
            .saturating_duration_since(Instant::now())
            .as_secs()
    }
}

/// Refresh endpoint response (snake_case, unlike the accounts API).
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Default)]
struct Listeners {
    next: u64,
    callbacks: BTreeMap<u64, AuthCallback>,
}

struct Inner {
    http: reqwest::Client,
    api_key: String,
    refresh_base: String,
    token: RwLock<Option<TokenInfo>>,
    listeners: Mutex<Listeners>,
}

/// Shared session state: the current tokens plus auth-state listeners.
#[derive(Clone)]
pub struct SessionTokens {
    inner: Arc<Inner>,
}

impl SessionTokens {
    pub fn new(http: reqwest::Client, api_key: String, refresh_base: impl Into<String>) -> Self {
        SessionTokens {
            inner: Arc::new(Inner {
                http,
                api_key,
                refresh_base: refresh_base.into(),
                token: RwLock::new(None),
                listeners: Mutex::new(Listeners::default()),
            }),
        }
    }

    /// Stores the tokens of a new session.
    pub async fn start(&self, token: TokenInfo) {
        debug!(expires_in_secs = token.remaining_secs(), "Session tokens stored");
        *self.inner.token.write().await = Some(token);
    }

    /// Forgets the session.
    pub async fn clear(&self) {
        *self.inner.token.write().await = None;
    }

    /// A valid ID token, refreshing it first when it is about to expire.
    ///
    /// Returns `None` when signed out or when the refresh was rejected
    /// (listeners are then notified that the session ended).
    pub async fn bearer(&self) -> Option<String> {
        {
            let guard = self.inner.token.read().await;
            match guard.as_ref() {
                None => return None,
                Some(token) if !token.needs_refresh() => return Some(token.id_token.clone()),
                Some(_) => {}
            }
        }

        let mut guard = self.inner.token.write().await;

        // Double-check after acquiring write lock
        let current = match guard.as_ref() {
            None => return None,
            Some(token) if !token.needs_refresh() => return Some(token.id_token.clone()),
            Some(token) => token.clone(),
        };

        match self.refresh(&current.refresh_token).await {
            Ok(fresh) => {
                info!(expires_in_secs = fresh.remaining_secs(), "ID token refreshed");
                let id_token = fresh.id_token.clone();
                *guard = Some(fresh);
                Some(id_token)
            }
            Err(err) if err.code == UNAVAILABLE => {
                warn!(error = %err, "Token refresh unreachable, keeping current token");
                Some(current.id_token)
            }
            Err(err) => {
                warn!(code = %err.code, "Token refresh rejected, ending session: {}", err.message);
                *guard = None;
                drop(guard);
                self.notify(None);
                None
            }
        }
    }

    /// Registers an auth-state callback.
    pub fn subscribe(&self, callback: AuthCallback) -> Registration {
        let id = {
            let mut listeners = self.listeners();
            let id = listeners.next;
            listeners.next += 1;
            listeners.callbacks.insert(id, callback);
            id
        };
        let inner = self.inner.clone();
        Registration::new(move || {
            let mut guard = inner
                .listeners
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            guard.callbacks.remove(&id);
        })
    }

    /// Calls every registered callback, outside the listener lock.
    pub fn notify(&self, user: Option<User>) {
        let callbacks: Vec<AuthCallback> = self.listeners().callbacks.values().cloned().collect();
        for callback in callbacks {
            callback(user.clone());
        }
    }

    fn listeners(&self) -> MutexGuard<'_, Listeners> {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn refresh(&self, refresh_token: &str) -> ProviderResult<TokenInfo> {
        if refresh_token.is_empty() {
            return Err(ProviderError::new(
                "missing-refresh-token",
                "The session was issued without a refresh token",
            ));
        }

        let url = Url::parse_with_params(
            &format!("{}/token", self.inner.refresh_base),
            &[("key", self.inner.api_key.as_str())],
        )
        .map_err(|e| ProviderError::new("invalid-argument", e.to_string()))?;

        let response = self
            .inner
            .http
            .post(url)
            .json(&json!({ "grant_type": "refresh_token", "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::new("invalid-response", e.to_string()))?;
        Ok(TokenInfo::new(
            body.id_token,
            body.refresh_token,
            TokenInfo::expires_in(body.expires_in.as_deref()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::stub::{test_client, StubServer};

    const REFRESHED: &str =
        r#"{"id_token":"fresh","refresh_token":"r2","expires_in":"3600","user_id":"u1"}"#;

    fn recorded_users(tokens: &SessionTokens) -> (Arc<Mutex<Vec<Option<User>>>>, Registration) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let registration = tokens.subscribe(Arc::new(move |user| {
            sink.lock().unwrap().push(user);
        }));
        (seen, registration)
    }

    #[test]
    fn test_token_needs_refresh() {
        let token = TokenInfo::new("id".into(), "r".into(), 60);
        assert!(token.needs_refresh());

        let token = TokenInfo::new("id".into(), "r".into(), 3600);
        assert!(!token.needs_refresh());
        assert!(token.remaining_secs() > 3500);
    }

    #[test]
    fn test_expires_in_parsing() {
        assert_eq!(TokenInfo::expires_in(Some("1800")), 1800);
        assert_eq!(TokenInfo::expires_in(Some("soon")), 3600);
        assert_eq!(TokenInfo::expires_in(None), 3600);
    }

    #[tokio::test]
    async fn test_fresh_token_is_used_as_is() {
        let server = StubServer::start(vec![(200, REFRESHED.into())]).await;
        let tokens = SessionTokens::new(test_client(), "AIzaKey".into(), &server.base);

        assert_eq!(tokens.bearer().await, None);
        tokens.start(TokenInfo::new("id1".into(), "r1".into(), 3600)).await;
        assert_eq!(tokens.bearer().await.as_deref(), Some("id1"));
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn test_expiring_token_is_refreshed_once() {
        let server = StubServer::start(vec![(200, REFRESHED.into())]).await;
        let tokens = SessionTokens::new(test_client(), "AIzaKey".into(), &server.base);
        tokens.start(TokenInfo::new("old".into(), "r1".into(), 0)).await;

        assert_eq!(tokens.bearer().await.as_deref(), Some("fresh"));
        assert_eq!(tokens.bearer().await.as_deref(), Some("fresh"));

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].target, "/token?key=AIzaKey");
        assert!(requests[0].body.contains("\"refresh_token\":\"r1\""));
    }

    #[tokio::test]
    async fn test_rejected_refresh_ends_session() {
        let body = r#"{"error":{"code":400,"message":"TOKEN_EXPIRED"}}"#;
        let server = StubServer::start(vec![(400, body.into())]).await;
        let tokens = SessionTokens::new(test_client(), "AIzaKey".into(), &server.base);
        let (seen, _registration) = recorded_users(&tokens);
        tokens.start(TokenInfo::new("old".into(), "r1".into(), 0)).await;

        assert_eq!(tokens.bearer().await, None);
        assert_eq!(*seen.lock().unwrap(), vec![None]);

        // Signed out now: no further refresh attempts.
        assert_eq!(tokens.bearer().await, None);
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_refresh_keeps_session() {
        let server = StubServer::start(vec![(503, String::new())]).await;
        let tokens = SessionTokens::new(test_client(), "AIzaKey".into(), &server.base);
        let (seen, _registration) = recorded_users(&tokens);
        tokens.start(TokenInfo::new("old".into(), "r1".into(), 0)).await;

        assert_eq!(tokens.bearer().await.as_deref(), Some("old"));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_released_listener_is_not_notified() {
        let tokens = SessionTokens::new(test_client(), "k".into(), "http://127.0.0.1:9");
        let (seen, registration) = recorded_users(&tokens);

        tokens.notify(None);
        registration.release();
        tokens.notify(None);

        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
