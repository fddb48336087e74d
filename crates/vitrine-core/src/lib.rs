//! # vitrine-core: Pure Catalog Logic for Vitrine
//!
//! This crate is the **heart** of Vitrine. It contains the catalog rules as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Vitrine Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Terminal UI (apps/cli)                       │   │
//! │  │     add ──► reload ──► test ──► login / register / logout       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          vitrine-sync (auth gateway, sync controller)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ vitrine-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │  ┌─────────────┐ ┌───────────┐ ┌────────────┐ ┌────────────┐   │   │
//! │  │  │ credentials │ │   types   │ │ projection │ │ validation │   │   │
//! │  │  │  sentinels  │ │  Product  │ │   Stats    │ │   drafts   │   │   │
//! │  │  │  status     │ │   User    │ │   cards    │ │   login    │   │   │
//! │  │  └─────────────┘ └───────────┘ └────────────┘ └────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • PURE FUNCTIONS                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`credentials`] - Credential resolution and placeholder classification
//! - [`types`] - Domain types (Product, User, ConnectionStatus, ...)
//! - [`money`] - Integer-cent prices parsed from user strings
//! - [`projection`] - Stats and display cards for a product list
//! - [`error`] - Domain error types
//! - [`validation`] - Form input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use vitrine_core::projection::project;
//! use vitrine_core::types::Product;
//!
//! let products = vec![
//!     Product::new("bebidas", "Suco", "10"),
//!     Product::new("bebidas", "Agua", "20"),
//!     Product::new("doces", "Bolo", "abc"),
//! ];
//!
//! let stats = project(&products);
//! assert_eq!(stats.count, 3);
//! assert_eq!(stats.distinct_category_count, 2);
//! assert_eq!(stats.average_price, 15); // "abc" is ignored, not counted as 0
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod credentials;
pub mod error;
pub mod money;
pub mod projection;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use credentials::{CredentialField, CredentialSource, CredentialStatus, Credentials};
pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use projection::{project, ProductCard, Stats};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Name of the document-store collection holding the catalog.
///
/// The catalog lives in exactly one collection; the name is fixed so that
/// every deployment reads and writes the same resource.
pub const PRODUCT_COLLECTION: &str = "produto";
