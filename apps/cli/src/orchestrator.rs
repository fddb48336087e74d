//! # UI Orchestrator
//!
//! Binds REPL commands to gateway and controller calls.
//!
//! ## Command Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  add    ──► ProductDraft::new (non-empty) ──► controller.add_product   │
//! │  reload ──► loading on ──► wait debounce ──► still latest? ──► subscribe│
//! │                                              │                          │
//! │                                              └── superseded: drop       │
//! │  test   ──► controller.fetch_once                                      │
//! │  login / register / logout ──► gateway (session::bind resubscribes)   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every failure ends up as a status line; nothing here returns an error.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use vitrine_core::validation::validate_login;
use vitrine_core::{ConnectionStatus, Credentials, ProductDraft, PRODUCT_COLLECTION};
use vitrine_sync::{
    session, AppConfig, AuthGateway, CatalogEventEmitter, DocumentStore, IdentityProvider,
    SyncController,
};

use crate::command::{Command, HELP};

/// What the REPL should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Orchestrator {
    gateway: AuthGateway,
    controller: Arc<SyncController>,
    emitter: Arc<dyn CatalogEventEmitter>,
    reload_debounce: Duration,
    reload_generation: Arc<AtomicU64>,
}

impl Orchestrator {
    /// Connects, wires the session and loads once.
    ///
    /// Connection failures are already rendered by the controller; the
    /// orchestrator is returned either way so the user can keep working.
    pub async fn boot(
        config: &AppConfig,
        credentials: Credentials,
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
        emitter: Arc<dyn CatalogEventEmitter>,
    ) -> Self {
        let gateway = AuthGateway::new(identity);
        let controller = Arc::new(SyncController::new(store, emitter.clone()));
        session::bind(&gateway, controller.clone());

        emitter.emit_loading(true);
        if controller.connect(&credentials).await.is_ok() {
            // Initial load; a later sign-in replaces this subscription.
            if let Err(e) = controller.subscribe() {
                warn!(error = %e, "Initial subscribe failed");
            }
        }
        emitter.emit_loading(false);

        let orchestrator = Orchestrator {
            gateway,
            controller,
            emitter,
            reload_debounce: Duration::from_millis(config.ui.reload_debounce_ms),
            reload_generation: Arc::new(AtomicU64::new(0)),
        };

        if orchestrator.needs_configuration() {
            orchestrator.emitter.emit_status(&configuration_checklist());
        }
        orchestrator
    }

    /// True when boot did not reach a connected store.
    pub fn needs_configuration(&self) -> bool {
        !self.controller.is_connected()
    }

    pub fn controller(&self) -> &Arc<SyncController> {
        &self.controller
    }

    pub fn gateway(&self) -> &AuthGateway {
        &self.gateway
    }

    pub async fn handle(&self, command: Command) -> Flow {
        debug!(command = command.name(), "Handling command");
        match command {
            Command::Add {
                category,
                name,
                price,
            } => {
                self.submit(&category, &name, &price).await;
            }
            Command::Reload => {
                self.reload();
            }
            Command::Test => {
                // The controller renders the outcome as a status line.
                match self.controller.fetch_once().await {
                    Ok(report) => debug!(size = report.size, "Connection test passed"),
                    Err(e) => warn!(error = %e, "Connection test failed"),
                }
            }
            Command::LoginAnonymous => {
                if let Err(e) = self.gateway.sign_in_anonymously().await {
                    self.emitter
                        .emit_status(&ConnectionStatus::error(e.user_message()));
                }
            }
            Command::Login { email, password } => self.login(&email, &password, false).await,
            Command::Register { email, password } => self.login(&email, &password, true).await,
            Command::Logout => {
                if let Err(e) = self.gateway.sign_out().await {
                    self.emitter
                        .emit_status(&ConnectionStatus::error(e.user_message()));
                }
            }
            Command::WhoAmI => {
                self.emitter.emit_user(self.gateway.current_user().as_ref());
            }
            Command::Help => {
                self.emitter.emit_status(&ConnectionStatus::info(HELP));
            }
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    /// Validates the form fields and writes the product.
    ///
    /// Returns the new id on success.
    pub async fn submit(&self, category: &str, name: &str, price: &str) -> Option<String> {
        let draft = match ProductDraft::new(category, name, price) {
            Ok(draft) => draft,
            Err(e) => {
                debug!(error = %e, "Form rejected");
                self.emitter.emit_status(&ConnectionStatus::error(format!(
                    "⚠️ Fill in all fields ({})",
                    e
                )));
                return None;
            }
        };
        self.controller.add_product(&draft).await.ok()
    }

    /// Debounced re-subscribe. A newer reload supersedes a pending one.
    pub fn reload(&self) -> JoinHandle<()> {
        let generation = self.reload_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.emitter.emit_loading(true);

        let latest = self.reload_generation.clone();
        let controller = self.controller.clone();
        let emitter = self.emitter.clone();
        let delay = self.reload_debounce;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if latest.load(Ordering::SeqCst) != generation {
                debug!(generation, "Reload superseded");
                return;
            }
            info!(collection = PRODUCT_COLLECTION, "Reloading products");
            if let Err(e) = controller.subscribe() {
                warn!(error = %e, "Reload failed");
            }
            emitter.emit_loading(false);
        })
    }

    async fn login(&self, email: &str, password: &str, register: bool) {
        let email = match validate_login(email, password) {
            Ok(email) => email,
            Err(e) => {
                self.emitter
                    .emit_status(&ConnectionStatus::error(format!("⚠️ {}", e)));
                return;
            }
        };

        let result = if register {
            self.gateway.register(&email, password).await
        } else {
            self.gateway.sign_in_with_password(&email, password).await
        };
        if let Err(e) = result {
            self.emitter
                .emit_status(&ConnectionStatus::error(e.user_message()));
        }
    }
}

/// Shown when boot ends without a connection.
pub fn configuration_checklist() -> ConnectionStatus {
    ConnectionStatus::error(format!(
        "⚠️ Configuration required:\n\
         \x20  1. Check the credential settings (FIREBASE_* variables or config.toml)\n\
         \x20  2. Make sure the store's security rules allow reads and writes\n\
         \x20  3. Check that the \"{}\" collection exists",
        PRODUCT_COLLECTION
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use vitrine_core::{CredentialSource, Product, Stats, StatusKind, User};
    use vitrine_sync::memory::{MemoryIdentity, MemoryStore};
    use vitrine_sync::NoOpEmitter;

    #[derive(Default)]
    struct Statuses {
        seen: Mutex<Vec<ConnectionStatus>>,
        loading: Mutex<Vec<bool>>,
    }

    impl Statuses {
        fn last(&self) -> ConnectionStatus {
            self.seen.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl CatalogEventEmitter for Statuses {
        fn emit_status(&self, status: &ConnectionStatus) {
            self.seen.lock().unwrap().push(status.clone());
        }
        fn emit_products(&self, _products: &[Product]) {}
        fn emit_stats(&self, _stats: &Stats) {}
        fn emit_loading(&self, loading: bool) {
            self.loading.lock().unwrap().push(loading);
        }
        fn emit_user(&self, _user: Option<&User>) {}
    }

    fn configured() -> AppConfig {
        let mut config = AppConfig::default();
        config.credentials = CredentialSource {
            api_key: Some("AIzaTest".into()),
            auth_domain: Some("demo.firebaseapp.com".into()),
            project_id: Some("demo".into()),
            storage_bucket: Some("demo.appspot.com".into()),
            messaging_sender_id: Some("42".into()),
            app_id: Some("1:42:web:abc".into()),
        };
        config
    }

    async fn boot(config: &AppConfig) -> (MemoryIdentity, MemoryStore, Arc<Statuses>, Orchestrator) {
        let identity = MemoryIdentity::new();
        let store = MemoryStore::new();
        let statuses = Arc::new(Statuses::default());
        let orchestrator = Orchestrator::boot(
            config,
            config.resolve_credentials(),
            Arc::new(identity.clone()),
            Arc::new(store.clone()),
            statuses.clone(),
        )
        .await;
        (identity, store, statuses, orchestrator)
    }

    #[tokio::test]
    async fn test_boot_connects_and_loads() {
        let (_identity, store, _statuses, orchestrator) = boot(&configured()).await;
        assert!(!orchestrator.needs_configuration());
        assert_eq!(store.active_listeners(), 1);
    }

    #[tokio::test]
    async fn test_boot_without_credentials_shows_checklist() {
        let (_identity, store, statuses, orchestrator) = boot(&AppConfig::default()).await;
        assert!(orchestrator.needs_configuration());
        assert_eq!(store.open_calls(), 0);
        let last = statuses.last();
        assert_eq!(last.kind, StatusKind::Error);
        assert!(last.text.contains("Configuration required"));
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_fields() {
        let (_identity, store, statuses, orchestrator) = boot(&configured()).await;
        assert!(orchestrator.submit("Bebidas", "  ", "5").await.is_none());
        assert!(store.writes().is_empty());
        assert!(statuses.last().text.contains("name"));
    }

    #[tokio::test]
    async fn test_submit_writes_lowercase_category() {
        let (_identity, store, _statuses, orchestrator) = boot(&configured()).await;
        let id = orchestrator.submit("Bebidas", "Suco", "7,50").await;
        assert!(id.is_some());
        assert_eq!(store.writes()[0].category, "bebidas");
    }

    #[tokio::test]
    async fn test_login_resubscribes_once() {
        let (_identity, store, _statuses, orchestrator) = boot(&configured()).await;
        let before = store.listen_calls();

        orchestrator.handle(Command::LoginAnonymous).await;
        assert_eq!(store.listen_calls(), before + 1);
        assert_eq!(store.active_listeners(), 1);
        assert!(orchestrator.gateway().current_user().is_some());
    }

    #[tokio::test]
    async fn test_failed_login_becomes_status() {
        let (_identity, _store, statuses, orchestrator) = boot(&configured()).await;
        orchestrator
            .handle(Command::Login {
                email: "nobody@example.com".into(),
                password: "secret1".into(),
            })
            .await;
        assert!(statuses.last().is_error());
        assert!(orchestrator.gateway().current_user().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_is_debounced() {
        let (_identity, store, statuses, orchestrator) = boot(&configured()).await;
        let before = store.listen_calls();

        let first = orchestrator.reload();
        tokio::time::advance(Duration::from_millis(200)).await;
        let second = orchestrator.reload();

        first.await.unwrap();
        second.await.unwrap();

        assert_eq!(store.listen_calls(), before + 1);
        assert_eq!(store.active_listeners(), 1);
        assert_eq!(statuses.loading.lock().unwrap().last(), Some(&false));
    }

    #[tokio::test]
    async fn test_connection_test_reports_outcome() {
        let (_identity, store, statuses, orchestrator) = boot(&configured()).await;
        store.seed(PRODUCT_COLLECTION, vec![Product::new("bebidas", "Suco", "7")]);

        assert_eq!(orchestrator.handle(Command::Test).await, Flow::Continue);
        assert_eq!(statuses.last().kind, StatusKind::Success);

        store.fail_next_get(vitrine_sync::ProviderError::permission_denied("rules"));
        assert_eq!(orchestrator.handle(Command::Test).await, Flow::Continue);
        assert_eq!(statuses.last().kind, StatusKind::Error);
    }

    #[tokio::test]
    async fn test_quit_stops_loop() {
        let (_identity, _store, _statuses, orchestrator) = boot(&configured()).await;
        assert_eq!(orchestrator.handle(Command::Quit).await, Flow::Quit);
        assert_eq!(orchestrator.handle(Command::Help).await, Flow::Continue);
    }

    #[tokio::test]
    async fn test_noop_emitter_boot() {
        let config = configured();
        let orchestrator = Orchestrator::boot(
            &config,
            config.resolve_credentials(),
            Arc::new(MemoryIdentity::new()),
            Arc::new(MemoryStore::new()),
            Arc::new(NoOpEmitter),
        )
        .await;
        assert!(orchestrator.controller().has_live_subscription());
    }
}
