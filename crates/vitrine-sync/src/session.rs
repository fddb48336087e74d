//! Auth-gated subscription wiring.
//!
//! Every signed-in notification (local sign-in, restored session) leads to
//! exactly one `subscribe`, which replaces any live subscription. Signed-out
//! notifications only update the UI user state.

use std::sync::Arc;
use tracing::{debug, info, warn};

use vitrine_core::User;

use crate::auth::AuthGateway;
use crate::controller::SyncController;

/// Registers the gateway observer that drives the controller.
///
/// Replaces any observer previously installed on `gateway`.
pub fn bind(gateway: &AuthGateway, controller: Arc<SyncController>) {
    let emitter = controller.emitter();
    gateway.set_observer(Arc::new(move |user: Option<&User>| {
        emitter.emit_user(user);

        match user {
            Some(user) => {
                info!(uid = %user.uid, "Auth available, subscribing to catalog");
                // subscribe() already turned the failure into a status event.
                if let Err(e) = controller.subscribe() {
                    warn!(error = %e, "Subscribe after sign-in failed");
                }
            }
            None => debug!("Signed out, keeping the current subscription"),
        }
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::CatalogEventEmitter;
    use crate::memory::{MemoryIdentity, MemoryStore};
    use std::sync::Mutex;
    use vitrine_core::credentials::{resolve, CredentialSource};
    use vitrine_core::{ConnectionStatus, Product, Stats};

    #[derive(Default)]
    struct UserRecorder {
        users: Mutex<Vec<Option<String>>>,
    }

    impl CatalogEventEmitter for UserRecorder {
        fn emit_status(&self, _status: &ConnectionStatus) {}
        fn emit_products(&self, _products: &[Product]) {}
        fn emit_stats(&self, _stats: &Stats) {}
        fn emit_loading(&self, _loading: bool) {}
        fn emit_user(&self, user: Option<&User>) {
            self.users.lock().unwrap().push(user.map(User::label));
        }
    }

    struct Harness {
        identity: MemoryIdentity,
        store: MemoryStore,
        recorder: Arc<UserRecorder>,
        gateway: AuthGateway,
        controller: Arc<SyncController>,
    }

    async fn harness() -> Harness {
        let identity = MemoryIdentity::new();
        let store = MemoryStore::new();
        let recorder = Arc::new(UserRecorder::default());
        let gateway = AuthGateway::new(Arc::new(identity.clone()));
        let controller = Arc::new(SyncController::new(
            Arc::new(store.clone()),
            recorder.clone(),
        ));

        let credentials = resolve(&CredentialSource {
            api_key: Some("key".into()),
            auth_domain: Some("demo.firebaseapp.com".into()),
            project_id: Some("demo".into()),
            storage_bucket: Some("demo.appspot.com".into()),
            messaging_sender_id: Some("1".into()),
            app_id: Some("1:1:web:1".into()),
        });
        controller.connect(&credentials).await.unwrap();
        bind(&gateway, controller.clone());

        Harness {
            identity,
            store,
            recorder,
            gateway,
            controller,
        }
    }

    #[tokio::test]
    async fn test_restored_session_subscribes_once() {
        let h = harness().await;

        h.identity.restore_session(User::anonymous("restored-uid"));

        assert_eq!(h.gateway.current_user().unwrap().uid, "restored-uid");
        assert_eq!(h.store.listen_calls(), 1);
        assert_eq!(h.store.active_listeners(), 1);
    }

    #[tokio::test]
    async fn test_repeated_sign_in_keeps_one_listener() {
        let h = harness().await;

        h.gateway.sign_in_anonymously().await.unwrap();
        h.identity.restore_session(User::with_email("u2", "b@example.com"));

        assert_eq!(h.store.listen_calls(), 2);
        assert_eq!(h.store.active_listeners(), 1);
    }

    #[tokio::test]
    async fn test_sign_out_only_updates_user() {
        let h = harness().await;
        h.identity.restore_session(User::with_email("u1", "a@example.com"));
        h.gateway.sign_out().await.unwrap();

        assert!(h.controller.has_live_subscription());
        assert_eq!(h.store.listen_calls(), 1);
        assert_eq!(
            *h.recorder.users.lock().unwrap(),
            vec![Some("a@example.com".to_string()), None]
        );
    }
}
