//! # Capability Boundary
//!
//! Narrow traits over the managed identity provider and document store.
//! The gateway and controller only ever see these traits; concrete vendor
//! clients are adapted to them at the edge ([`crate::rest`], [`crate::memory`]).
//!
//! ## Capability Sets
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Provider Capabilities                           │
//! │                                                                         │
//! │  IdentityProvider                    DocumentStore                      │
//! │  ────────────────                    ─────────────                      │
//! │  • sign_in_anonymously               • open(credentials)               │
//! │  • sign_in_with_password                  │                             │
//! │  • register                               ▼                             │
//! │  • sign_out                          StoreConnection                    │
//! │  • on_auth_state_changed(cb)         ───────────────                    │
//! │         │                            • listen(collection, cb)           │
//! │         ▼                            • add(collection, record) -> id    │
//! │    Registration                      • get(collection) -> list          │
//! │   (release = unsubscribe)                 │                             │
//! │                                           ▼                             │
//! │                                      Registration                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Callbacks may fire at any time, including synchronously from inside
//! `listen` / `on_auth_state_changed` (an initial snapshot or a restored
//! session). Implementations must deliver callbacks in emission order.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use vitrine_core::{Credentials, NewProduct, Product, User};

// =============================================================================
// Provider Error
// =============================================================================

/// Well-known provider error code: the caller lacks permission.
pub const PERMISSION_DENIED: &str = "permission-denied";

/// Well-known provider error code: the service cannot be reached.
pub const UNAVAILABLE: &str = "unavailable";

/// An error reported by a provider, reduced to a code and a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    /// Short machine-readable code (`permission-denied`, `unavailable`, ...).
    pub code: String,

    /// Human-readable message from the provider.
    pub message: String,
}

impl ProviderError {
    /// Creates an error with an arbitrary code.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        ProviderError {
            code: code.into(),
            message: message.into(),
        }
    }

    /// `permission-denied` error.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(PERMISSION_DENIED, message)
    }

    /// `unavailable` error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(UNAVAILABLE, message)
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl std::error::Error for ProviderError {}

/// Result type for provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

// =============================================================================
// Callbacks & Registrations
// =============================================================================

/// Auth-state notification callback: `Some(user)` when signed in.
pub type AuthCallback = Arc<dyn Fn(Option<User>) + Send + Sync>;

/// One delivery from a live collection listener: the complete current list,
/// or the error that interrupted listening.
pub type SnapshotEvent = Result<Vec<Product>, ProviderError>;

/// Snapshot callback.
pub type SnapshotCallback = Arc<dyn Fn(SnapshotEvent) + Send + Sync>;

/// Handle to a registered callback.
///
/// Releasing (explicitly or by dropping) unsubscribes exactly once.
pub struct Registration {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Registration {
    /// Wraps an unsubscribe action.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Registration {
            release: Some(Box::new(release)),
        }
    }

    /// A registration with nothing to release.
    pub fn noop() -> Self {
        Registration { release: None }
    }

    /// Unsubscribes now.
    pub fn release(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("live", &self.release.is_some())
            .finish()
    }
}

// =============================================================================
// Capability Traits
// =============================================================================

/// Identity provider capabilities.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Starts an anonymous session.
    async fn sign_in_anonymously(&self) -> ProviderResult<User>;

    /// Signs in with email and password.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> ProviderResult<User>;

    /// Creates an account and signs it in.
    async fn register(&self, email: &str, password: &str) -> ProviderResult<User>;

    /// Ends the current session.
    async fn sign_out(&self) -> ProviderResult<()>;

    /// Registers for auth-state notifications.
    ///
    /// Providers notify on every change, whether caused by a local call or
    /// not (restored or revoked sessions).
    fn on_auth_state_changed(&self, callback: AuthCallback) -> Registration;
}

/// Document store entry point.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Opens a connection with the given credentials.
    async fn open(&self, credentials: &Credentials) -> ProviderResult<Arc<dyn StoreConnection>>;
}

/// An open document store connection.
#[async_trait]
pub trait StoreConnection: Send + Sync {
    /// Starts a push-based listener delivering full snapshots.
    fn listen(&self, collection: &str, callback: SnapshotCallback) -> Registration;

    /// Adds a record; the store assigns the id and creation time.
    async fn add(&self, collection: &str, record: NewProduct) -> ProviderResult<String>;

    /// Reads the collection once.
    async fn get(&self, collection: &str) -> ProviderResult<Vec<Product>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_registration_releases_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let registration = Registration::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        registration.release();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_registration_releases_on_drop() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        {
            let _registration = Registration::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::permission_denied("Missing or insufficient permissions.");
        assert_eq!(
            err.to_string(),
            "Missing or insufficient permissions. (permission-denied)"
        );
    }
}
