//! # In-Memory Providers
//!
//! In-process implementations of [`IdentityProvider`] and [`DocumentStore`].
//! Used by the `memory` backend of the CLI and as instrumented mocks in
//! tests (open/listen counters, active listener count, failure injection).
//!
//! ## Behavior
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        MemoryStore                                      │
//! │                                                                         │
//! │  open()    ──► open_calls += 1 ──► connection (shares the same state)  │
//! │  listen()  ──► listen_calls += 1, registers callback, delivers the     │
//! │               current snapshot immediately                              │
//! │  add()     ──► assigns id + monotonic timestamp, notifies listeners    │
//! │               of that collection with the full list                     │
//! │  release   ──► removes the callback (active_listeners -= 1)            │
//! │                                                                         │
//! │                        MemoryIdentity                                   │
//! │                                                                         │
//! │  sign-in / register / sign-out ──► notify every auth callback          │
//! │  restore_session / revoke_session ──► notify WITHOUT a local call      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Callbacks are always invoked after the internal lock is released, so a
//! callback may call back into the provider.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

use vitrine_core::{Credentials, NewProduct, Product, User};

use crate::provider::{
    AuthCallback, DocumentStore, IdentityProvider, ProviderError, ProviderResult, Registration,
    SnapshotCallback, SnapshotEvent, StoreConnection,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// Memory Identity
// =============================================================================

#[derive(Default)]
struct IdentityState {
    current: Option<User>,
    /// email -> (password, uid)
    accounts: HashMap<String, (String, String)>,
    listeners: BTreeMap<u64, AuthCallback>,
    next_listener: u64,
    fail_next: Option<ProviderError>,
}

/// In-process identity provider.
#[derive(Clone, Default)]
pub struct MemoryIdentity {
    state: Arc<Mutex<IdentityState>>,
}

impl MemoryIdentity {
    /// Creates a provider with no accounts and no session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next sign-in / register / sign-out call fail.
    pub fn fail_next(&self, err: ProviderError) {
        lock(&self.state).fail_next = Some(err);
    }

    /// Simulates a session restored by the provider (no local call).
    pub fn restore_session(&self, user: User) {
        debug!(uid = %user.uid, "Restoring session");
        self.set_current(Some(user));
    }

    /// Simulates a session revoked by the provider (no local call).
    pub fn revoke_session(&self) {
        debug!("Revoking session");
        self.set_current(None);
    }

    /// Number of registered auth callbacks.
    pub fn listener_count(&self) -> usize {
        lock(&self.state).listeners.len()
    }

    /// The provider's own view of the session.
    pub fn current(&self) -> Option<User> {
        lock(&self.state).current.clone()
    }

    fn take_failure(&self) -> ProviderResult<()> {
        match lock(&self.state).fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn set_current(&self, user: Option<User>) {
        let callbacks: Vec<AuthCallback> = {
            let mut state = lock(&self.state);
            state.current = user.clone();
            state.listeners.values().cloned().collect()
        };
        for callback in callbacks {
            callback(user.clone());
        }
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn sign_in_anonymously(&self) -> ProviderResult<User> {
        self.take_failure()?;
        let user = User::anonymous(Uuid::new_v4().simple().to_string());
        self.set_current(Some(user.clone()));
        Ok(user)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> ProviderResult<User> {
        self.take_failure()?;
        let uid = {
            let state = lock(&self.state);
            match state.accounts.get(email) {
                None => {
                    return Err(ProviderError::new(
                        "user-not-found",
                        "There is no account for this email",
                    ))
                }
                Some((stored, _)) if stored != password => {
                    return Err(ProviderError::new("wrong-password", "The password is invalid"))
                }
                Some((_, uid)) => uid.clone(),
            }
        };
        let user = User::with_email(uid, email);
        self.set_current(Some(user.clone()));
        Ok(user)
    }

    async fn register(&self, email: &str, password: &str) -> ProviderResult<User> {
        self.take_failure()?;
        if password.chars().count() < 6 {
            return Err(ProviderError::new(
                "weak-password",
                "Password should be at least 6 characters",
            ));
        }
        let uid = {
            let mut state = lock(&self.state);
            if state.accounts.contains_key(email) {
                return Err(ProviderError::new(
                    "email-already-in-use",
                    "The email address is already in use",
                ));
            }
            let uid = Uuid::new_v4().simple().to_string();
            state
                .accounts
                .insert(email.to_string(), (password.to_string(), uid.clone()));
            uid
        };
        let user = User::with_email(uid, email);
        self.set_current(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> ProviderResult<()> {
        self.take_failure()?;
        self.set_current(None);
        Ok(())
    }

    fn on_auth_state_changed(&self, callback: AuthCallback) -> Registration {
        let id = {
            let mut state = lock(&self.state);
            let id = state.next_listener;
            state.next_listener += 1;
            state.listeners.insert(id, callback);
            id
        };
        let state = self.state.clone();
        Registration::new(move || {
            lock(&state).listeners.remove(&id);
        })
    }
}

// =============================================================================
// Memory Store
// =============================================================================

#[derive(Default)]
struct StoreState {
    collections: HashMap<String, Vec<Product>>,
    listeners: BTreeMap<u64, (String, SnapshotCallback)>,
    next_listener: u64,
    open_calls: usize,
    listen_calls: usize,
    writes: Vec<NewProduct>,
    last_timestamp: Option<DateTime<Utc>>,
    fail_open: Option<ProviderError>,
    fail_add: Option<ProviderError>,
    fail_get: Option<ProviderError>,
}

/// In-process document store; also serves as its own connection.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a collection's contents and notifies its listeners.
    pub fn seed(&self, collection: &str, products: Vec<Product>) {
        lock(&self.state)
            .collections
            .insert(collection.to_string(), products);
        self.notify(collection);
    }

    /// Delivers an error to every listener of a collection.
    pub fn emit_error(&self, collection: &str, err: ProviderError) {
        for callback in self.callbacks_for(collection) {
            callback(Err(err.clone()));
        }
    }

    /// Makes the next `open` fail.
    pub fn fail_next_open(&self, err: ProviderError) {
        lock(&self.state).fail_open = Some(err);
    }

    /// Makes the next `add` fail.
    pub fn fail_next_add(&self, err: ProviderError) {
        lock(&self.state).fail_add = Some(err);
    }

    /// Makes the next `get` fail.
    pub fn fail_next_get(&self, err: ProviderError) {
        lock(&self.state).fail_get = Some(err);
    }

    /// Number of `open` calls so far.
    pub fn open_calls(&self) -> usize {
        lock(&self.state).open_calls
    }

    /// Number of `listen` calls so far.
    pub fn listen_calls(&self) -> usize {
        lock(&self.state).listen_calls
    }

    /// Number of listeners not yet released.
    pub fn active_listeners(&self) -> usize {
        lock(&self.state).listeners.len()
    }

    /// Every record passed to `add`, in order.
    pub fn writes(&self) -> Vec<NewProduct> {
        lock(&self.state).writes.clone()
    }

    /// Current contents of a collection.
    pub fn documents(&self, collection: &str) -> Vec<Product> {
        lock(&self.state)
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    fn callbacks_for(&self, collection: &str) -> Vec<SnapshotCallback> {
        lock(&self.state)
            .listeners
            .values()
            .filter(|(c, _)| c == collection)
            .map(|(_, cb)| cb.clone())
            .collect()
    }

    fn notify(&self, collection: &str) {
        let snapshot = self.documents(collection);
        for callback in self.callbacks_for(collection) {
            callback(Ok(snapshot.clone()));
        }
    }

    fn next_timestamp(state: &mut StoreState) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = state.last_timestamp {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        state.last_timestamp = Some(now);
        now
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn open(&self, _credentials: &Credentials) -> ProviderResult<Arc<dyn StoreConnection>> {
        let failure = {
            let mut state = lock(&self.state);
            state.open_calls += 1;
            state.fail_open.take()
        };
        match failure {
            Some(err) => Err(err),
            None => Ok(Arc::new(self.clone())),
        }
    }
}

#[async_trait]
impl StoreConnection for MemoryStore {
    fn listen(&self, collection: &str, callback: SnapshotCallback) -> Registration {
        let (id, initial): (u64, SnapshotEvent) = {
            let mut state = lock(&self.state);
            state.listen_calls += 1;
            let id = state.next_listener;
            state.next_listener += 1;
            state
                .listeners
                .insert(id, (collection.to_string(), callback.clone()));
            let snapshot = state.collections.get(collection).cloned().unwrap_or_default();
            (id, Ok(snapshot))
        };
        debug!(collection, listener = id, "Listener registered");

        callback(initial);

        let state = self.state.clone();
        Registration::new(move || {
            lock(&state).listeners.remove(&id);
        })
    }

    async fn add(&self, collection: &str, record: NewProduct) -> ProviderResult<String> {
        let id = {
            let mut state = lock(&self.state);
            if let Some(err) = state.fail_add.take() {
                return Err(err);
            }
            let id = Uuid::new_v4().simple().to_string();
            let created_at = Self::next_timestamp(&mut state);
            state.writes.push(record.clone());
            state
                .collections
                .entry(collection.to_string())
                .or_default()
                .push(Product {
                    id: Some(id.clone()),
                    category: record.category,
                    name: record.name,
                    price: record.price,
                    created_at: Some(created_at),
                });
            id
        };
        self.notify(collection);
        Ok(id)
    }

    async fn get(&self, collection: &str) -> ProviderResult<Vec<Product>> {
        if let Some(err) = lock(&self.state).fail_get.take() {
            return Err(err);
        }
        Ok(self.documents(collection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn record(name: &str) -> NewProduct {
        NewProduct {
            category: "bebidas".into(),
            name: name.into(),
            price: "5".into(),
        }
    }

    #[tokio::test]
    async fn test_listen_delivers_initial_and_updates() {
        let store = MemoryStore::new();
        let seen = Arc::new(Mutex::new(Vec::<usize>::new()));
        let s = seen.clone();
        let registration = store.listen(
            "produto",
            Arc::new(move |event| s.lock().unwrap().push(event.unwrap().len())),
        );

        store.add("produto", record("a")).await.unwrap();
        store.add("produto", record("b")).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);

        registration.release();
        assert_eq!(store.active_listeners(), 0);
        store.add("produto", record("c")).await.unwrap();
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_timestamps_are_monotonic() {
        let store = MemoryStore::new();
        for i in 0..20 {
            store.add("produto", record(&i.to_string())).await.unwrap();
        }
        let docs = store.documents("produto");
        for pair in docs.windows(2) {
            assert!(pair[0].created_at < pair[1].created_at);
        }
    }

    #[tokio::test]
    async fn test_injected_failures_fire_once() {
        let store = MemoryStore::new();
        store.fail_next_get(ProviderError::unavailable("offline"));
        assert!(store.get("produto").await.is_err());
        assert!(store.get("produto").await.is_ok());
    }

    #[tokio::test]
    async fn test_identity_register_then_sign_in() {
        let identity = MemoryIdentity::new();
        let notified = Arc::new(AtomicUsize::new(0));
        let n = notified.clone();
        let _registration = identity.on_auth_state_changed(Arc::new(move |_| {
            n.fetch_add(1, Ordering::SeqCst);
        }));

        identity.register("ana@example.com", "secret1").await.unwrap();
        identity.sign_out().await.unwrap();
        let user = identity
            .sign_in_with_password("ana@example.com", "secret1")
            .await
            .unwrap();
        assert_eq!(user.email.as_deref(), Some("ana@example.com"));
        assert_eq!(notified.load(Ordering::SeqCst), 3);

        let err = identity
            .sign_in_with_password("ana@example.com", "nope")
            .await
            .unwrap_err();
        assert_eq!(err.code, "wrong-password");
        assert!(identity.register("x@example.com", "123").await.is_err());
    }
}
