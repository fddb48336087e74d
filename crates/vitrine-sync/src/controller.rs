//! # Sync Controller
//!
//! Owns the store connection and the single live subscription to the
//! product collection.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SyncController                                 │
//! │                                                                         │
//! │  connect(creds) ──► ConfigError::check ──✗──► status(error), no open   │
//! │        │                    │                                           │
//! │        │                    ✓                                           │
//! │        ▼                    ▼                                           │
//! │  store.open() ──► connection slot (replaces, drops old subscription)   │
//! │                                                                         │
//! │  subscribe() ──► take + release active ──► listen ──► active = new     │
//! │                                                                         │
//! │  snapshot ──► emit_products ──► emit_stats ──► emit_status             │
//! │  error    ──► emit_status(error)       (controller stays usable)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - At most one live subscription: the previous registration is always
//!   released before the new listener is installed.
//! - No retries. Every failure is surfaced as an error status and returned.

use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tracing::{debug, error, info, warn};

use vitrine_core::{
    project, ConnectionStatus, Credentials, FetchReport, Product, ProductDraft, Stats, User,
    PRODUCT_COLLECTION,
};

use crate::error::{ConfigError, ConnectError, ReadError, WriteError};
use crate::provider::{DocumentStore, Registration, SnapshotCallback, SnapshotEvent, StoreConnection};

// =============================================================================
// UI Boundary
// =============================================================================

/// Receives everything the UI renders.
pub trait CatalogEventEmitter: Send + Sync {
    /// Status line changed.
    fn emit_status(&self, status: &ConnectionStatus);

    /// Full product list (replaces the previous one).
    fn emit_products(&self, products: &[Product]);

    /// Aggregates for the current list.
    fn emit_stats(&self, stats: &Stats);

    /// Loading indicator on/off.
    fn emit_loading(&self, loading: bool);

    /// Signed-in user changed.
    fn emit_user(&self, user: Option<&User>);
}

/// No-op emitter for testing.
pub struct NoOpEmitter;

impl CatalogEventEmitter for NoOpEmitter {
    fn emit_status(&self, _status: &ConnectionStatus) {}
    fn emit_products(&self, _products: &[Product]) {}
    fn emit_stats(&self, _stats: &Stats) {}
    fn emit_loading(&self, _loading: bool) {}
    fn emit_user(&self, _user: Option<&User>) {}
}

// =============================================================================
// Controller
// =============================================================================

pub struct SyncController {
    store: Arc<dyn DocumentStore>,
    emitter: Arc<dyn CatalogEventEmitter>,
    connection: RwLock<Option<Arc<dyn StoreConnection>>>,
    active: Mutex<Option<Registration>>,
}

impl SyncController {
    pub fn new(store: Arc<dyn DocumentStore>, emitter: Arc<dyn CatalogEventEmitter>) -> Self {
        SyncController {
            store,
            emitter,
            connection: RwLock::new(None),
            active: Mutex::new(None),
        }
    }

    /// The emitter this controller reports to.
    pub fn emitter(&self) -> Arc<dyn CatalogEventEmitter> {
        self.emitter.clone()
    }

    /// Opens the store. Placeholder credentials fail before any call.
    pub async fn connect(&self, credentials: &Credentials) -> Result<(), ConnectError> {
        if let Some(config_error) = ConfigError::check(credentials) {
            warn!(status = %credentials.status(), "Refusing to connect: {}", config_error);
            let err = ConnectError::InvalidConfig(config_error);
            self.emitter
                .emit_status(&ConnectionStatus::error(err.user_message()));
            return Err(err);
        }

        info!(project_id = %credentials.project_id, "Opening document store");
        match self.store.open(credentials).await {
            Ok(connection) => {
                // A subscription on the old connection must not outlive it.
                let stale = self.lock_active().take();
                if let Some(stale) = stale {
                    debug!("Releasing subscription from previous connection");
                    stale.release();
                }
                self.set_connection(Some(connection));
                self.emitter.emit_status(&ConnectionStatus::info(
                    "🔄 Connected to the store, loading products...",
                ));
                Ok(())
            }
            Err(err) => {
                error!(code = %err.code, "Failed to open store: {}", err.message);
                let err = ConnectError::Unreachable(err.message);
                self.emitter
                    .emit_status(&ConnectionStatus::error(err.user_message()));
                Err(err)
            }
        }
    }

    /// (Re)starts the live listener on the product collection.
    pub fn subscribe(&self) -> Result<(), ReadError> {
        let Some(connection) = self.connection() else {
            let err = ReadError::NotConnected;
            self.emitter
                .emit_status(&ConnectionStatus::error(err.user_message(PRODUCT_COLLECTION)));
            return Err(err);
        };

        let previous = self.lock_active().take();
        if let Some(previous) = previous {
            debug!("Releasing previous subscription");
            previous.release();
        }

        let registration = connection.listen(PRODUCT_COLLECTION, self.snapshot_callback());

        let stale = self.lock_active().replace(registration);
        if let Some(stale) = stale {
            warn!("Subscription installed concurrently, releasing the older one");
            stale.release();
        }

        info!(collection = PRODUCT_COLLECTION, "Subscribed to product collection");
        Ok(())
    }

    /// Releases the live subscription. Returns true if one existed.
    pub fn unsubscribe(&self) -> bool {
        let active = self.lock_active().take();
        match active {
            Some(registration) => {
                registration.release();
                debug!("Unsubscribed");
                true
            }
            None => false,
        }
    }

    pub fn has_live_subscription(&self) -> bool {
        self.lock_active().is_some()
    }

    pub fn is_connected(&self) -> bool {
        self.connection().is_some()
    }

    /// Writes a new product. The store assigns id and creation time.
    pub async fn add_product(&self, draft: &ProductDraft) -> Result<String, WriteError> {
        let Some(connection) = self.connection() else {
            let err = WriteError::NotConnected;
            self.emitter
                .emit_status(&ConnectionStatus::error(err.user_message()));
            return Err(err);
        };

        let record = draft.to_record();
        debug!(category = %record.category, name = %record.name, "Adding product");

        match connection.add(PRODUCT_COLLECTION, record).await {
            Ok(id) => {
                info!(id = %id, "Product added");
                self.emitter.emit_status(&ConnectionStatus::success(format!(
                    "✅ Product \"{}\" added successfully! ID: {}",
                    draft.name(),
                    id
                )));
                Ok(id)
            }
            Err(err) => {
                error!(code = %err.code, "Add failed: {}", err.message);
                let err = WriteError::from(err);
                self.emitter
                    .emit_status(&ConnectionStatus::error(err.user_message()));
                Err(err)
            }
        }
    }

    /// One-shot read used by the "test connection" action.
    pub async fn fetch_once(&self) -> Result<FetchReport, ReadError> {
        let Some(connection) = self.connection() else {
            let err = ReadError::NotConnected;
            self.emitter
                .emit_status(&ConnectionStatus::error(err.user_message(PRODUCT_COLLECTION)));
            return Err(err);
        };

        self.emitter
            .emit_status(&ConnectionStatus::info("🧪 Testing connection..."));

        match connection.get(PRODUCT_COLLECTION).await {
            Ok(items) => {
                let report = FetchReport::new(items);
                info!(size = report.size, "Test read succeeded");
                let status = if report.is_empty() {
                    ConnectionStatus::info(format!(
                        "⚠️ Connection OK, but the \"{}\" collection is empty",
                        PRODUCT_COLLECTION
                    ))
                } else {
                    ConnectionStatus::success(format!(
                        "✅ Test OK! {} document(s) found in \"{}\"",
                        report.size, PRODUCT_COLLECTION
                    ))
                };
                self.emitter.emit_status(&status);
                Ok(report)
            }
            Err(err) => {
                let err = ReadError::from(err);
                error!(error = %err, "Test read failed");
                self.emitter
                    .emit_status(&ConnectionStatus::error(err.user_message(PRODUCT_COLLECTION)));
                Err(err)
            }
        }
    }

    fn snapshot_callback(&self) -> SnapshotCallback {
        let emitter = self.emitter.clone();
        Arc::new(move |event: SnapshotEvent| match event {
            Ok(products) => {
                debug!(size = products.len(), "Snapshot received");
                emitter.emit_products(&products);
                emitter.emit_stats(&project(&products));
                let status = if products.is_empty() {
                    ConnectionStatus::info(format!(
                        "⚠️ Connected, but no products in the \"{}\" collection",
                        PRODUCT_COLLECTION
                    ))
                } else {
                    ConnectionStatus::success(format!(
                        "✅ Connected! {} product(s) loaded",
                        products.len()
                    ))
                };
                emitter.emit_status(&status);
            }
            Err(err) => {
                let err = ReadError::from(err);
                warn!(error = %err, "Listener error");
                emitter.emit_status(&ConnectionStatus::error(format!(
                    "❌ Error listening for changes: {}",
                    err
                )));
            }
        })
    }

    fn connection(&self) -> Option<Arc<dyn StoreConnection>> {
        match self.connection.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_connection(&self, connection: Option<Arc<dyn StoreConnection>>) {
        match self.connection.write() {
            Ok(mut guard) => *guard = connection,
            Err(poisoned) => *poisoned.into_inner() = connection,
        }
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<Registration>> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
