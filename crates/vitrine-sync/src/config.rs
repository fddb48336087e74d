//! # Application Configuration
//!
//! Configuration management for the catalog front-end, including the
//! Credential Loader.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     FIREBASE_API_KEY=...   (the deployment secrets, one per field)     │
//! │     VITRINE_BACKEND=rest                                               │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/vitrine/config.toml (Linux)                              │
//! │     ~/Library/Application Support/com.vitrine.catalog/config.toml      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     memory backend, 500 ms reload debounce                             │
//! │                                                                         │
//! │  Credentials missing from every source resolve to placeholder         │
//! │  sentinels; loading never fails because of them.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [credentials]
//! api_key = "AIza..."
//! auth_domain = "loja.firebaseapp.com"
//! project_id = "loja"
//! storage_bucket = "loja.appspot.com"
//! messaging_sender_id = "987654321"
//! app_id = "1:987654321:web:abc"
//!
//! [backend]
//! kind = "rest"            # memory | rest
//! poll_interval_secs = 5   # rest listener polling
//! # auth_emulator_host = "127.0.0.1:9099"
//! # firestore_emulator_host = "127.0.0.1:8080"
//!
//! [ui]
//! reload_debounce_ms = 500
//! debug_mode = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use vitrine_core::credentials::{
    resolve, CredentialField, CredentialSource, CredentialStatus, Credentials,
};

use crate::error::{SyncError, SyncResult};

/// Presence of this variable means the deployment has service-account
/// secrets (server side) even if the web SDK fields are missing.
pub const SERVICE_ACCOUNT_ENV: &str = "FIREBASE_SERVICE_ACCOUNT";

// =============================================================================
// Backend Kind
// =============================================================================

/// Which provider implementation backs the gateway and controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// In-process providers (demo and offline development).
    #[default]
    Memory,

    /// The managed services' REST endpoints.
    Rest,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Memory => write!(f, "memory"),
            BackendKind::Rest => write!(f, "rest"),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "mem" | "demo" => Ok(BackendKind::Memory),
            "rest" | "firebase" | "remote" => Ok(BackendKind::Rest),
            other => Err(SyncError::InvalidConfig(format!(
                "Unknown backend: '{}'. Valid options: memory, rest",
                other
            ))),
        }
    }
}

// =============================================================================
// Backend Settings
// =============================================================================

/// Provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Provider implementation.
    #[serde(default)]
    pub kind: BackendKind,

    /// Interval between REST listener polls (seconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// `host:port` of a local auth emulator (REST backend only).
    #[serde(default)]
    pub auth_emulator_host: Option<String>,

    /// `host:port` of a local document store emulator (REST backend only).
    #[serde(default)]
    pub firestore_emulator_host: Option<String>,
}

fn default_poll_interval() -> u64 {
    5
}

impl Default for BackendSettings {
    fn default() -> Self {
        BackendSettings {
            kind: BackendKind::default(),
            poll_interval_secs: default_poll_interval(),
            auth_emulator_host: None,
            firestore_emulator_host: None,
        }
    }
}

// =============================================================================
// UI Settings
// =============================================================================

/// Front-end behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiSettings {
    /// Delay before a manual reload re-subscribes (milliseconds).
    /// A newer reload inside the window supersedes the pending one.
    #[serde(default = "default_reload_debounce")]
    pub reload_debounce_ms: u64,

    /// Print every delivered snapshot in full.
    #[serde(default)]
    pub debug_mode: bool,
}

fn default_reload_debounce() -> u64 {
    500
}

impl Default for UiSettings {
    fn default() -> Self {
        UiSettings {
            reload_debounce_ms: default_reload_debounce(),
            debug_mode: false,
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Raw credential values (resolved later, never validated here).
    #[serde(default)]
    pub credentials: CredentialSource,

    /// Provider settings.
    #[serde(default)]
    pub backend: BackendSettings,

    /// Front-end settings.
    #[serde(default)]
    pub ui: UiSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (config.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Validates non-credential settings.
    ///
    /// Credentials are deliberately not checked: placeholder credentials
    /// are a valid (degraded) state reported at connect time.
    pub fn validate(&self) -> SyncResult<()> {
        if self.backend.poll_interval_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "poll_interval_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Applies environment overrides through `lookup`.
    ///
    /// Taking the lookup as a function keeps tests away from process-global
    /// environment state.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for field in CredentialField::ALL {
            if let Some(value) = lookup(field.env_var()) {
                debug!(field = %field, "Overriding credential from environment");
                *self.credentials.slot_mut(field) = Some(value);
            }
        }

        if let Some(kind) = lookup("VITRINE_BACKEND") {
            match kind.parse() {
                Ok(parsed) => self.backend.kind = parsed,
                Err(e) => warn!(backend = %kind, error = %e, "Ignoring backend from environment"),
            }
        }

        if let Some(ms) = lookup("VITRINE_RELOAD_DEBOUNCE_MS") {
            if let Ok(ms) = ms.parse::<u64>() {
                self.ui.reload_debounce_ms = ms;
            }
        }

        if let Some(secs) = lookup("VITRINE_POLL_INTERVAL_SECS") {
            if let Ok(secs) = secs.parse::<u64>() {
                self.backend.poll_interval_secs = secs;
            }
        }

        if let Some(host) = lookup("FIREBASE_AUTH_EMULATOR_HOST").filter(|h| !h.trim().is_empty()) {
            self.backend.auth_emulator_host = Some(host);
        }

        if let Some(host) = lookup("FIRESTORE_EMULATOR_HOST").filter(|h| !h.trim().is_empty()) {
            self.backend.firestore_emulator_host = Some(host);
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "vitrine", "catalog")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    // =========================================================================
    // Credential Loader
    // =========================================================================

    /// Resolves the configured credentials, substituting sentinels.
    ///
    /// Reports the classification once through the log; never fails.
    pub fn resolve_credentials(&self) -> Credentials {
        let service_account = std::env::var_os(SERVICE_ACCOUNT_ENV).is_some();
        let credentials = resolve(&self.credentials);
        report_credentials(&credentials, service_account);
        credentials
    }
}

/// Logs startup diagnostics for a credential set.
pub fn report_credentials(credentials: &Credentials, service_account: bool) {
    let missing: Vec<&str> = credentials
        .unresolved_fields()
        .iter()
        .map(|f| f.env_var())
        .collect();

    match credentials.status() {
        CredentialStatus::Complete => {
            info!(project_id = %credentials.project_id, "Credentials complete");
        }
        CredentialStatus::Pending => {
            warn!(?missing, "Using temporary service-account configuration");
            if service_account {
                warn!(
                    ?missing,
                    "Service account configured, but web SDK secrets are incomplete"
                );
            }
        }
        CredentialStatus::Invalid => {
            warn!(?missing, "Credentials look like placeholders; configure the deployment secrets");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_backend_parsing() {
        assert_eq!("memory".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert_eq!("REST".parse::<BackendKind>().unwrap(), BackendKind::Rest);
        assert!("grpc".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.backend.kind, BackendKind::Memory);
        assert_eq!(config.ui.reload_debounce_ms, 500);
        assert!(config.validate().is_ok());
        assert_eq!(
            resolve(&config.credentials).status(),
            CredentialStatus::Invalid
        );
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("FIREBASE_API_KEY", "AIzaKey"),
            ("FIREBASE_PROJECT_ID", "loja"),
            ("VITRINE_BACKEND", "rest"),
            ("VITRINE_RELOAD_DEBOUNCE_MS", "250"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.credentials.api_key.as_deref(), Some("AIzaKey"));
        assert_eq!(config.credentials.project_id.as_deref(), Some("loja"));
        assert_eq!(config.credentials.app_id, None);
        assert_eq!(config.backend.kind, BackendKind::Rest);
        assert_eq!(config.ui.reload_debounce_ms, 250);
    }

    #[test]
    fn test_emulator_hosts_from_env() {
        let env: HashMap<&str, &str> = [
            ("FIREBASE_AUTH_EMULATOR_HOST", "127.0.0.1:9099"),
            ("FIRESTORE_EMULATOR_HOST", ""),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.backend.auth_emulator_host.as_deref(), Some("127.0.0.1:9099"));
        assert_eq!(config.backend.firestore_emulator_host, None);
    }

    #[test]
    fn test_unknown_backend_env_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(|k| (k == "VITRINE_BACKEND").then(|| "grpc".to_string()));
        assert_eq!(config.backend.kind, BackendKind::Memory);
    }

    #[test]
    fn test_toml_roundtrip_sections() {
        let toml_str = r#"
            [credentials]
            api_key = "AIzaKey"

            [backend]
            kind = "rest"
            poll_interval_secs = 2
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.credentials.api_key.as_deref(), Some("AIzaKey"));
        assert_eq!(config.backend.kind, BackendKind::Rest);
        assert_eq!(config.backend.poll_interval_secs, 2);
        assert_eq!(config.ui.reload_debounce_ms, 500);

        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(rendered.contains("[backend]"));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let mut config = AppConfig::default();
        config.backend.poll_interval_secs = 0;
        assert!(config.validate().is_err());
    }
}
