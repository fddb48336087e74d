//! Fatal CLI errors. Everything else is rendered as a status line.

use thiserror::Error;
use vitrine_sync::SyncError;

#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded or is inconsistent.
    #[error(transparent)]
    Config(#[from] SyncError),

    /// Reading commands from stdin failed.
    #[error("Failed to read input: {0}")]
    Input(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Config(e) if e.is_config_error() => 78,
            CliError::Config(_) => 1,
            CliError::Input(_) => 74,
        }
    }
}
