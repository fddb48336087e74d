//! # Sync Error Types
//!
//! Error types for the gateway, controller and configuration.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  ConfigError    │  │   AuthError     │  │     ConnectError        │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Unconfigured   │  │  code + reason  │  │  InvalidConfig          │ │
//! │  │  Pending        │  │  (opaque)       │  │  Unreachable            │ │
//! │  │  (local only)   │  │                 │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────────────────────────────────┐  │
//! │  │   WriteError    │  │                ReadError                    │  │
//! │  │                 │  │                                             │  │
//! │  │  NotConnected   │  │  NotConnected  PermissionDenied             │  │
//! │  │  Rejected       │  │  Unavailable   Failed (everything else)     │  │
//! │  └─────────────────┘  └─────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  Every variant has a user_message() that becomes an error status.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use vitrine_core::credentials::{CredentialField, CredentialStatus, Credentials};

use crate::provider::{ProviderError, PERMISSION_DENIED, UNAVAILABLE};

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

fn field_list(fields: &[CredentialField]) -> String {
    fields
        .iter()
        .map(|f| f.env_var())
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Config Error
// =============================================================================

/// Credentials still hold placeholders. Detected locally, never sent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Fields were never configured.
    #[error("Credentials not configured: {}", field_list(.fields))]
    Unconfigured { fields: Vec<CredentialField> },

    /// Only service-account secrets exist; web SDK fields are pending.
    #[error("Web credentials pending: {}", field_list(.fields))]
    Pending { fields: Vec<CredentialField> },
}

impl ConfigError {
    /// Returns the error for non-complete credentials, `None` if complete.
    pub fn check(credentials: &Credentials) -> Option<ConfigError> {
        let fields = credentials.unresolved_fields();
        match credentials.status() {
            CredentialStatus::Complete => None,
            CredentialStatus::Pending => Some(ConfigError::Pending { fields }),
            CredentialStatus::Invalid => Some(ConfigError::Unconfigured { fields }),
        }
    }

    /// Remediation message for the status line.
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::Unconfigured { fields } => format!(
                "Invalid configuration: {} still hold placeholders. Configure the deployment secrets and redeploy.",
                field_list(fields)
            ),
            ConfigError::Pending { fields } => format!(
                "Only service-account credentials are configured. Add the web SDK secrets for full functionality: {}.",
                field_list(fields)
            ),
        }
    }
}

// =============================================================================
// Auth Error
// =============================================================================

/// The identity provider rejected a request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Authentication failed: {reason}")]
pub struct AuthError {
    /// Provider code (opaque).
    pub code: String,

    /// Provider message (opaque).
    pub reason: String,
}

impl From<ProviderError> for AuthError {
    fn from(err: ProviderError) -> Self {
        AuthError {
            code: err.code,
            reason: err.message,
        }
    }
}

impl AuthError {
    /// Status-line message.
    pub fn user_message(&self) -> String {
        format!("❌ {}", self)
    }
}

// =============================================================================
// Connect Error
// =============================================================================

/// Opening the store failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectError {
    /// Credentials are placeholders; no network call was made.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// The store could not be opened.
    #[error("Store unreachable: {0}")]
    Unreachable(String),
}

impl ConnectError {
    /// Status-line message.
    pub fn user_message(&self) -> String {
        match self {
            ConnectError::InvalidConfig(err) => format!("❌ Connection error: {}", err.user_message()),
            ConnectError::Unreachable(msg) => format!("❌ Connection error: {}", msg),
        }
    }
}

// =============================================================================
// Write Error
// =============================================================================

/// Adding a product failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WriteError {
    /// `add_product` before a successful `connect`.
    #[error("Store not connected")]
    NotConnected,

    /// The store rejected the write.
    #[error("Write rejected: {message} ({code})")]
    Rejected { code: String, message: String },
}

impl From<ProviderError> for WriteError {
    fn from(err: ProviderError) -> Self {
        WriteError::Rejected {
            code: err.code,
            message: err.message,
        }
    }
}

impl WriteError {
    /// Status-line message.
    pub fn user_message(&self) -> String {
        match self {
            WriteError::NotConnected => "❌ Error adding product: store not connected".to_string(),
            WriteError::Rejected { message, .. } => {
                format!("❌ Error adding product: {}", message)
            }
        }
    }
}

// =============================================================================
// Read Error
// =============================================================================

/// Subscribing or fetching failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReadError {
    /// Read before a successful `connect`.
    #[error("Store not connected")]
    NotConnected,

    /// Security rules refused the read.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Any other failure.
    #[error("Read failed: {0}")]
    Failed(String),
}

impl From<ProviderError> for ReadError {
    fn from(err: ProviderError) -> Self {
        match err.code.as_str() {
            PERMISSION_DENIED => ReadError::PermissionDenied(err.message),
            UNAVAILABLE => ReadError::Unavailable(err.message),
            _ => ReadError::Failed(err.message),
        }
    }
}

impl ReadError {
    /// Status-line message with cause-specific remediation.
    pub fn user_message(&self, collection: &str) -> String {
        match self {
            ReadError::NotConnected => "❌ Store not connected".to_string(),
            ReadError::PermissionDenied(_) => format!(
                "❌ Access denied! Check the security rules for the \"{}\" collection.",
                collection
            ),
            ReadError::Unavailable(_) => {
                "❌ Store unavailable. Check your internet connection.".to_string()
            }
            ReadError::Failed(msg) => format!("❌ Test failed: {}", msg),
        }
    }
}

// =============================================================================
// Umbrella Error
// =============================================================================

/// Any failure surfaced by this crate.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Read(#[from] ReadError),

    /// Configuration file values are inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl SyncError {
    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::Connect(ConnectError::InvalidConfig(_))
                | SyncError::InvalidConfig(_)
                | SyncError::ConfigLoadFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::credentials::{resolve, CredentialSource};

    #[test]
    fn test_read_error_classification() {
        assert!(matches!(
            ReadError::from(ProviderError::permission_denied("no")),
            ReadError::PermissionDenied(_)
        ));
        assert!(matches!(
            ReadError::from(ProviderError::unavailable("offline")),
            ReadError::Unavailable(_)
        ));
        assert!(matches!(
            ReadError::from(ProviderError::new("deadline-exceeded", "slow")),
            ReadError::Failed(_)
        ));
    }

    #[test]
    fn test_config_error_distinguishes_pending() {
        let creds = resolve(&CredentialSource::default());
        let err = ConfigError::check(&creds).unwrap();
        assert!(matches!(err, ConfigError::Unconfigured { .. }));
        assert!(err.user_message().contains("FIREBASE_API_KEY"));

        let mut source = CredentialSource::default();
        source.app_id = Some("APP_ID_PENDENTE".into());
        let pending = ConfigError::check(&resolve(&source)).unwrap();
        assert!(matches!(pending, ConfigError::Pending { .. }));
        assert_ne!(err.user_message(), pending.user_message());
    }

    #[test]
    fn test_config_category() {
        let err: SyncError = ConnectError::InvalidConfig(ConfigError::Pending { fields: vec![] }).into();
        assert!(err.is_config_error());
        let err: SyncError = ReadError::NotConnected.into();
        assert!(!err.is_config_error());
    }

    #[test]
    fn test_error_display() {
        let err = AuthError::from(ProviderError::new("INVALID_PASSWORD", "wrong password"));
        assert_eq!(err.to_string(), "Authentication failed: wrong password");
        assert_eq!(err.code, "INVALID_PASSWORD");
    }
}
