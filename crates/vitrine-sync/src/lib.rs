//! # vitrine-sync: Session Lifecycle & Product Sync for Vitrine
//!
//! This crate owns every asynchronous call into the identity provider and
//! the document store, and turns their results into UI events.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Layer Architecture                          │
//! │                                                                         │
//! │  AppConfig::resolve_credentials()  (defaults → TOML → env)             │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  ┌────────────────┐   observer   ┌──────────────────────────────────┐  │
//! │  │  AuthGateway   │─────────────►│  session::bind                   │  │
//! │  │                │              │  signed in ──► controller        │  │
//! │  │ one user,      │              │                .subscribe()      │  │
//! │  │ one observer   │              │  always    ──► emit_user         │  │
//! │  └───────┬────────┘              └────────────────┬─────────────────┘  │
//! │          │                                        ▼                     │
//! │          │                       ┌──────────────────────────────────┐  │
//! │          │                       │  SyncController                  │  │
//! │          │                       │  connect / subscribe / add /     │  │
//! │          │                       │  fetch_once; ONE live listener   │  │
//! │          │                       └────────────────┬─────────────────┘  │
//! │          ▼                                        ▼                     │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │   provider traits: IdentityProvider, DocumentStore,             │   │
//! │  │                    StoreConnection, Registration                 │   │
//! │  └──────────────┬───────────────────────────────┬──────────────────┘   │
//! │                 ▼                               ▼                       │
//! │          memory (in-process)             rest (reqwest)                 │
//! │                                                                         │
//! │  UI EVENTS (CatalogEventEmitter):                                      │
//! │  • status {kind, text}   • products (full list)   • stats              │
//! │  • loading on/off        • user                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`provider`] - Capability traits and the `Registration` handle
//! - [`auth`] - `AuthGateway` with single-observer notifications
//! - [`controller`] - `SyncController` and the `CatalogEventEmitter` trait
//! - [`session`] - Auth-gated subscription wiring
//! - [`config`] - Application configuration (TOML + environment)
//! - [`error`] - Error taxonomy with user-facing messages
//! - [`memory`] - In-process providers (demo backend, test mocks)
//! - [`rest`] - REST adapter for the managed services
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vitrine_sync::{session, AppConfig, AuthGateway, NoOpEmitter, SyncController};
//! use vitrine_sync::memory::{MemoryIdentity, MemoryStore};
//!
//! let config = AppConfig::load(None)?;
//! let credentials = config.resolve_credentials();
//!
//! let gateway = AuthGateway::new(Arc::new(MemoryIdentity::new()));
//! let controller = Arc::new(SyncController::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(NoOpEmitter),
//! ));
//!
//! controller.connect(&credentials).await?;
//! session::bind(&gateway, controller.clone());
//! gateway.sign_in_anonymously().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod auth;
pub mod config;
pub mod controller;
pub mod error;
pub mod memory;
pub mod provider;
pub mod rest;
pub mod session;

// =============================================================================
// Re-exports
// =============================================================================

pub use auth::{AuthGateway, AuthObserver, AuthState};
pub use config::{AppConfig, BackendKind, BackendSettings, UiSettings};
pub use controller::{CatalogEventEmitter, NoOpEmitter, SyncController};
pub use error::{
    AuthError, ConfigError, ConnectError, ReadError, SyncError, SyncResult, WriteError,
};
pub use provider::{
    DocumentStore, IdentityProvider, ProviderError, Registration, StoreConnection,
};
