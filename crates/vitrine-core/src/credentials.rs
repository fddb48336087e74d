//! # Credentials
//!
//! Resolution and classification of the six web-client credential fields.
//!
//! ## Placeholder Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Credential Status Derivation                        │
//! │                                                                         │
//! │  Injected value ──► absent/empty? ──► "never configured" sentinel      │
//! │                                                                         │
//! │  Per field:                                                            │
//! │    equals a PENDING sentinel       ──► FieldState::Pending             │
//! │    equals an UNCONFIGURED sentinel ──► FieldState::Unconfigured        │
//! │    anything else                   ──► FieldState::Resolved            │
//! │                                                                         │
//! │  Whole set (pending wins, it has the more specific remediation):       │
//! │    any Pending       ──► CredentialStatus::Pending                     │
//! │    any Unconfigured  ──► CredentialStatus::Invalid                     │
//! │    otherwise         ──► CredentialStatus::Complete                    │
//! │                                                                         │
//! │  PENDING: the deployment only has service-account secrets; the web     │
//! │  SDK keys still need to be added.                                      │
//! │  INVALID: nothing was configured at all.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The status is always derived from the field values and never stored.

use serde::{Deserialize, Serialize};

// =============================================================================
// Sentinels
// =============================================================================

/// "Never configured" placeholders, one per field (in [`CredentialField::ALL`] order).
///
/// These literals are what the deployment pipeline writes when a secret is
/// missing, so they must match byte for byte.
pub const UNCONFIGURED_SENTINELS: [&str; 6] = [
    "CONFIGURE_SUA_API_KEY",
    "seu-projeto.firebaseapp.com",
    "seu-projeto-id",
    "seu-projeto.firebasestorage.app",
    "123456789",
    "CONFIGURE_SEU_APP_ID",
];

/// "Pending" placeholders written for service-account-only deployments.
pub const PENDING_SENTINELS: [(CredentialField, &str); 3] = [
    (CredentialField::ApiKey, "WEB_API_KEY_PENDENTE"),
    (CredentialField::MessagingSenderId, "SENDER_ID_PENDENTE"),
    (CredentialField::AppId, "APP_ID_PENDENTE"),
];

// =============================================================================
// Fields
// =============================================================================

/// One of the six credential fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialField {
    ApiKey,
    AuthDomain,
    ProjectId,
    StorageBucket,
    MessagingSenderId,
    AppId,
}

impl CredentialField {
    /// All fields, in declaration order.
    pub const ALL: [CredentialField; 6] = [
        CredentialField::ApiKey,
        CredentialField::AuthDomain,
        CredentialField::ProjectId,
        CredentialField::StorageBucket,
        CredentialField::MessagingSenderId,
        CredentialField::AppId,
    ];

    fn index(self) -> usize {
        match self {
            CredentialField::ApiKey => 0,
            CredentialField::AuthDomain => 1,
            CredentialField::ProjectId => 2,
            CredentialField::StorageBucket => 3,
            CredentialField::MessagingSenderId => 4,
            CredentialField::AppId => 5,
        }
    }

    /// The "never configured" sentinel for this field.
    pub fn unconfigured_sentinel(self) -> &'static str {
        UNCONFIGURED_SENTINELS[self.index()]
    }

    /// Name of the environment variable / deployment secret for this field.
    pub fn env_var(self) -> &'static str {
        match self {
            CredentialField::ApiKey => "FIREBASE_API_KEY",
            CredentialField::AuthDomain => "FIREBASE_AUTH_DOMAIN",
            CredentialField::ProjectId => "FIREBASE_PROJECT_ID",
            CredentialField::StorageBucket => "FIREBASE_STORAGE_BUCKET",
            CredentialField::MessagingSenderId => "FIREBASE_MESSAGING_SENDER_ID",
            CredentialField::AppId => "FIREBASE_APP_ID",
        }
    }
}

impl std::fmt::Display for CredentialField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CredentialField::ApiKey => "api_key",
            CredentialField::AuthDomain => "auth_domain",
            CredentialField::ProjectId => "project_id",
            CredentialField::StorageBucket => "storage_bucket",
            CredentialField::MessagingSenderId => "messaging_sender_id",
            CredentialField::AppId => "app_id",
        };
        write!(f, "{}", name)
    }
}

/// Classification of a single resolved field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldState {
    Resolved,
    Pending,
    Unconfigured,
}

/// Classification of the whole credential set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    /// Every field holds a real value.
    Complete,
    /// Only service-account secrets exist; web SDK keys are still missing.
    Pending,
    /// At least one field was never configured.
    Invalid,
}

impl std::fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialStatus::Complete => write!(f, "complete"),
            CredentialStatus::Pending => write!(f, "pending"),
            CredentialStatus::Invalid => write!(f, "invalid"),
        }
    }
}

// =============================================================================
// Source & Resolved Credentials
// =============================================================================

/// Raw, possibly missing values as injected by configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messaging_sender_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
}

impl CredentialSource {
    /// Mutable access to a field's slot.
    pub fn slot_mut(&mut self, field: CredentialField) -> &mut Option<String> {
        match field {
            CredentialField::ApiKey => &mut self.api_key,
            CredentialField::AuthDomain => &mut self.auth_domain,
            CredentialField::ProjectId => &mut self.project_id,
            CredentialField::StorageBucket => &mut self.storage_bucket,
            CredentialField::MessagingSenderId => &mut self.messaging_sender_id,
            CredentialField::AppId => &mut self.app_id,
        }
    }

    fn slot(&self, field: CredentialField) -> Option<&str> {
        let value = match field {
            CredentialField::ApiKey => &self.api_key,
            CredentialField::AuthDomain => &self.auth_domain,
            CredentialField::ProjectId => &self.project_id,
            CredentialField::StorageBucket => &self.storage_bucket,
            CredentialField::MessagingSenderId => &self.messaging_sender_id,
            CredentialField::AppId => &self.app_id,
        };
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

/// Resolved credentials: every field holds either a value or a sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
}

/// Resolves raw values into [`Credentials`].
///
/// Never fails: each absent or blank field becomes its "never configured"
/// sentinel. Deterministic.
///
/// ## Example
/// ```rust
/// use vitrine_core::credentials::{resolve, CredentialSource, CredentialStatus};
///
/// let creds = resolve(&CredentialSource::default());
/// assert_eq!(creds.api_key, "CONFIGURE_SUA_API_KEY");
/// assert_eq!(creds.status(), CredentialStatus::Invalid);
/// ```
pub fn resolve(source: &CredentialSource) -> Credentials {
    let pick = |field: CredentialField| {
        source
            .slot(field)
            .unwrap_or_else(|| field.unconfigured_sentinel())
            .to_string()
    };

    Credentials {
        api_key: pick(CredentialField::ApiKey),
        auth_domain: pick(CredentialField::AuthDomain),
        project_id: pick(CredentialField::ProjectId),
        storage_bucket: pick(CredentialField::StorageBucket),
        messaging_sender_id: pick(CredentialField::MessagingSenderId),
        app_id: pick(CredentialField::AppId),
    }
}

impl Credentials {
    /// Returns the value of a field.
    pub fn get(&self, field: CredentialField) -> &str {
        match field {
            CredentialField::ApiKey => &self.api_key,
            CredentialField::AuthDomain => &self.auth_domain,
            CredentialField::ProjectId => &self.project_id,
            CredentialField::StorageBucket => &self.storage_bucket,
            CredentialField::MessagingSenderId => &self.messaging_sender_id,
            CredentialField::AppId => &self.app_id,
        }
    }

    /// Classifies a single field.
    pub fn field_state(&self, field: CredentialField) -> FieldState {
        let value = self.get(field);
        if PENDING_SENTINELS
            .iter()
            .any(|(f, sentinel)| *f == field && *sentinel == value)
        {
            FieldState::Pending
        } else if value == field.unconfigured_sentinel() {
            FieldState::Unconfigured
        } else {
            FieldState::Resolved
        }
    }

    /// Classifies the whole set.
    pub fn status(&self) -> CredentialStatus {
        let states: Vec<FieldState> = CredentialField::ALL
            .iter()
            .map(|f| self.field_state(*f))
            .collect();

        if states.contains(&FieldState::Pending) {
            CredentialStatus::Pending
        } else if states.contains(&FieldState::Unconfigured) {
            CredentialStatus::Invalid
        } else {
            CredentialStatus::Complete
        }
    }

    /// Fields that still hold a sentinel, in declaration order.
    pub fn unresolved_fields(&self) -> Vec<CredentialField> {
        CredentialField::ALL
            .iter()
            .copied()
            .filter(|f| self.field_state(*f) != FieldState::Resolved)
            .collect()
    }

    /// Returns true only for a complete set.
    pub fn is_complete(&self) -> bool {
        self.status() == CredentialStatus::Complete
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
