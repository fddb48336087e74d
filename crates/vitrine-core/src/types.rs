//! # Domain Types
//!
//! Core domain types used throughout Vitrine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Domain Types                                  │
//! │                                                                         │
//! │  User ──────────── owned by the Auth Gateway, read as snapshots         │
//! │                                                                         │
//! │  ProductDraft ──► NewProduct ──► (store) ──► Product                   │
//! │   (validated)      (lowercase     assigns      (immutable once          │
//! │                     category)     id + time     fetched)                │
//! │                                                                         │
//! │  ConnectionStatus { kind, text } ─── transient, drives the UI only     │
//! │                                                                         │
//! │  FetchReport { size, items } ─────── one-shot "test connection" read   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// User
// =============================================================================

/// A signed-in identity.
///
/// Created on successful sign-in, replaced on every auth-state change and
/// gone (`None`) after sign-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Opaque identifier assigned by the identity provider.
    pub uid: String,

    /// Email, absent for anonymous sessions.
    pub email: Option<String>,

    /// Display name, if the provider knows one.
    pub display_name: Option<String>,

    /// Photo reference, if any.
    pub photo_url: Option<String>,
}

impl User {
    /// Creates an anonymous user (no email, no display name).
    pub fn anonymous(uid: impl Into<String>) -> Self {
        User {
            uid: uid.into(),
            email: None,
            display_name: None,
            photo_url: None,
        }
    }

    /// Creates a user identified by email.
    pub fn with_email(uid: impl Into<String>, email: impl Into<String>) -> Self {
        User {
            uid: uid.into(),
            email: Some(email.into()),
            display_name: None,
            photo_url: None,
        }
    }

    /// Returns true if this session has no email attached.
    pub fn is_anonymous(&self) -> bool {
        self.email.is_none()
    }

    /// Human-readable label: display name, then email, then a short uid.
    pub fn label(&self) -> String {
        if let Some(name) = self.display_name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        if let Some(email) = self.email.as_deref().filter(|e| !e.is_empty()) {
            return email.to_string();
        }
        let short: String = self.uid.chars().take(8).collect();
        format!("User {}", short)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog entry as delivered by the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Store-assigned identifier; absent before the first write.
    pub id: Option<String>,

    /// Category, lowercased on write (older documents may differ).
    pub category: String,

    /// Display name.
    pub name: String,

    /// Price as typed by the user (decimal-as-string).
    pub price: String,

    /// Server-assigned creation time.
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Creates a product without id or timestamp (test and fixture helper).
    pub fn new(category: &str, name: &str, price: &str) -> Self {
        Product {
            id: None,
            category: category.to_string(),
            name: name.to_string(),
            price: price.to_string(),
            created_at: None,
        }
    }

    /// Builder-style id assignment.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Validated form input for a new product.
///
/// Constructed through [`ProductDraft::new`](crate::validation), which trims
/// every field and rejects empty ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub(crate) category: String,
    pub(crate) name: String,
    pub(crate) price: String,
}

impl ProductDraft {
    /// Category as entered (case preserved).
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Product name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Price string.
    pub fn price(&self) -> &str {
        &self.price
    }

    /// Builds the record written to the store.
    ///
    /// The category is normalized to lowercase here and nowhere else, so
    /// every write path goes through the same normalization.
    pub fn to_record(&self) -> NewProduct {
        NewProduct {
            category: self.category.to_lowercase(),
            name: self.name.clone(),
            price: self.price.clone(),
        }
    }
}

/// The record sent to the store's add operation.
///
/// Carries no id and no timestamp: both are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub category: String,
    pub name: String,
    pub price: String,
}

// =============================================================================
// Connection Status
// =============================================================================

/// Severity of a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusKind::Info => write!(f, "info"),
            StatusKind::Success => write!(f, "success"),
            StatusKind::Error => write!(f, "error"),
        }
    }
}

/// A status line for the UI. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub kind: StatusKind,
    pub text: String,
}

impl ConnectionStatus {
    /// Informational status (including partial successes).
    pub fn info(text: impl Into<String>) -> Self {
        ConnectionStatus {
            kind: StatusKind::Info,
            text: text.into(),
        }
    }

    /// Success status.
    pub fn success(text: impl Into<String>) -> Self {
        ConnectionStatus {
            kind: StatusKind::Success,
            text: text.into(),
        }
    }

    /// Error status.
    pub fn error(text: impl Into<String>) -> Self {
        ConnectionStatus {
            kind: StatusKind::Error,
            text: text.into(),
        }
    }

    /// Returns true for error statuses.
    pub fn is_error(&self) -> bool {
        self.kind == StatusKind::Error
    }
}

// =============================================================================
// Fetch Report
// =============================================================================

/// Result of a one-shot collection read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchReport {
    /// Number of documents read.
    pub size: usize,

    /// The documents, in store order.
    pub items: Vec<Product>,
}

impl FetchReport {
    /// Wraps a product list.
    pub fn new(items: Vec<Product>) -> Self {
        FetchReport {
            size: items.len(),
            items,
        }
    }

    /// Returns true if the collection was empty.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}
