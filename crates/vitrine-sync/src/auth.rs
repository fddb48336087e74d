//! # Auth Gateway
//!
//! Wraps an [`IdentityProvider`], keeps a snapshot of the current auth state
//! and relays provider notifications to a single observer.
//!
//! ## Notification Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   provider event (local sign-in, restored session, revoked session)    │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   GatewayShared::apply ──► state = SignedIn(user) | SignedOut          │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   observer(Some(&user) | None)      (most recently registered only)    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Local calls update the snapshot on success but do not notify the
//! observer themselves: the provider's own notification does, so each
//! provider event produces exactly one observer call.

use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info, warn};

use vitrine_core::User;

use crate::error::AuthError;
use crate::provider::{IdentityProvider, ProviderResult, Registration};

/// Observer for auth-state changes.
pub type AuthObserver = Arc<dyn Fn(Option<&User>) + Send + Sync>;

/// Current authentication state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthState {
    #[default]
    SignedOut,
    SignedIn(User),
}

impl AuthState {
    /// The signed-in user, if any.
    pub fn user(&self) -> Option<&User> {
        match self {
            AuthState::SignedIn(user) => Some(user),
            AuthState::SignedOut => None,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(self, AuthState::SignedIn(_))
    }
}

impl From<Option<User>> for AuthState {
    fn from(user: Option<User>) -> Self {
        match user {
            Some(user) => AuthState::SignedIn(user),
            None => AuthState::SignedOut,
        }
    }
}

#[derive(Default)]
struct GatewayShared {
    state: RwLock<AuthState>,
    observer: Mutex<Option<AuthObserver>>,
}

impl GatewayShared {
    fn set_state(&self, state: AuthState) {
        match self.state.write() {
            Ok(mut guard) => *guard = state,
            Err(poisoned) => *poisoned.into_inner() = state,
        }
    }

    fn state(&self) -> AuthState {
        match self.state.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn observer(&self) -> Option<AuthObserver> {
        match self.observer.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn apply(&self, user: Option<User>) {
        let state = AuthState::from(user);
        match state.user() {
            Some(user) => info!(uid = %user.uid, anonymous = user.is_anonymous(), "Auth state: signed in"),
            None => info!("Auth state: signed out"),
        }
        self.set_state(state.clone());

        // Called without holding any gateway lock.
        if let Some(observer) = self.observer() {
            observer(state.user());
        }
    }
}

/// Auth facade over an [`IdentityProvider`].
pub struct AuthGateway {
    provider: Arc<dyn IdentityProvider>,
    shared: Arc<GatewayShared>,
    _registration: Registration,
}

impl AuthGateway {
    /// Creates a gateway and registers for provider notifications.
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let shared = Arc::new(GatewayShared::default());
        let sink = shared.clone();
        let registration = provider.on_auth_state_changed(Arc::new(move |user| sink.apply(user)));

        AuthGateway {
            provider,
            shared,
            _registration: registration,
        }
    }

    /// Installs the observer, replacing any previous one.
    pub fn set_observer(&self, observer: AuthObserver) {
        let previous = match self.shared.observer.lock() {
            Ok(mut guard) => guard.replace(observer),
            Err(poisoned) => poisoned.into_inner().replace(observer),
        };
        if previous.is_some() {
            debug!("Replaced auth observer");
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> AuthState {
        self.shared.state()
    }

    /// Snapshot of the current user.
    pub fn current_user(&self) -> Option<User> {
        self.shared.state().user().cloned()
    }

    pub async fn sign_in_anonymously(&self) -> Result<User, AuthError> {
        let result = self.provider.sign_in_anonymously().await;
        self.complete("anonymous", result)
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let result = self.provider.sign_in_with_password(email, password).await;
        self.complete("password", result)
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let result = self.provider.register(email, password).await;
        self.complete("register", result)
    }

    /// Ends the session. A no-op when already signed out.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        if !self.shared.state().is_signed_in() {
            debug!("sign_out while signed out, ignoring");
            return Ok(());
        }

        match self.provider.sign_out().await {
            Ok(()) => {
                self.shared.set_state(AuthState::SignedOut);
                Ok(())
            }
            Err(err) => {
                warn!(code = %err.code, "Sign-out failed: {}", err.message);
                Err(err.into())
            }
        }
    }

    fn complete(&self, method: &str, result: ProviderResult<User>) -> Result<User, AuthError> {
        match result {
            Ok(user) => {
                debug!(method, uid = %user.uid, "Sign-in succeeded");
                self.shared.set_state(AuthState::SignedIn(user.clone()));
                Ok(user)
            }
            Err(err) => {
                warn!(method, code = %err.code, "Sign-in failed: {}", err.message);
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryIdentity;
    use crate::provider::ProviderError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn gateway() -> (MemoryIdentity, AuthGateway) {
        let identity = MemoryIdentity::new();
        let gateway = AuthGateway::new(Arc::new(identity.clone()));
        (identity, gateway)
    }

    #[tokio::test]
    async fn test_sign_in_updates_state() {
        let (_identity, gateway) = gateway();
        assert!(gateway.current_user().is_none());

        let user = gateway.sign_in_anonymously().await.unwrap();
        assert!(user.is_anonymous());
        assert_eq!(gateway.current_user(), Some(user));
    }

    #[tokio::test]
    async fn test_failure_leaves_state_unchanged() {
        let (identity, gateway) = gateway();
        let user = gateway.sign_in_anonymously().await.unwrap();

        identity.fail_next(ProviderError::new("network-request-failed", "offline"));
        let err = gateway.sign_in_with_password("a@b.com", "secret1").await.unwrap_err();
        assert_eq!(err.code, "network-request-failed");
        assert_eq!(gateway.current_user(), Some(user));
    }

    #[tokio::test]
    async fn test_sign_out_when_signed_out_is_noop() {
        let (identity, gateway) = gateway();
        identity.fail_next(ProviderError::new("internal", "should not be called"));
        assert!(gateway.sign_out().await.is_ok());
    }

    #[tokio::test]
    async fn test_external_notifications_reach_observer() {
        let (identity, gateway) = gateway();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        gateway.set_observer(Arc::new(move |user| {
            s.lock().unwrap().push(user.map(|u| u.uid.clone()));
        }));

        identity.restore_session(User::anonymous("restored"));
        assert_eq!(gateway.current_user().unwrap().uid, "restored");
        identity.revoke_session();
        assert!(gateway.current_user().is_none());

        assert_eq!(
            *seen.lock().unwrap(),
            vec![Some("restored".to_string()), None]
        );
    }

    #[tokio::test]
    async fn test_one_notification_per_local_sign_in() {
        let (_identity, gateway) = gateway();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        gateway.set_observer(Arc::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        gateway.sign_in_anonymously().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_only_latest_observer_is_notified() {
        let (identity, gateway) = gateway();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let f = first.clone();
        gateway.set_observer(Arc::new(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        }));
        let s = second.clone();
        gateway.set_observer(Arc::new(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        }));

        identity.restore_session(User::anonymous("u1"));
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_drop_unregisters_from_provider() {
        let (identity, gateway) = gateway();
        assert_eq!(identity.listener_count(), 1);
        drop(gateway);
        assert_eq!(identity.listener_count(), 0);
    }
}
